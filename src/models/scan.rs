// 逐行扫描结果：成功条目 + 失败明细

use crate::error::AuditError;

/// 单行失败记录
#[derive(Debug)]
pub struct LineFailure {
    /// 来源（文件路径或日志来源描述）
    pub origin: String,
    /// 行号（从 1 开始）
    pub line_number: usize,
    pub error: AuditError,
}

/// 扫描报告
/// 单行失败不会中断批处理，由调用方决定记录或忽略
#[derive(Debug)]
pub struct ScanReport<T> {
    pub items: Vec<T>,
    pub failures: Vec<LineFailure>,
}

impl<T> Default for ScanReport<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> ScanReport<T> {
    /// 记录一行失败
    pub fn fail(&mut self, origin: impl Into<String>, line_number: usize, error: AuditError) {
        self.failures.push(LineFailure {
            origin: origin.into(),
            line_number,
            error,
        });
    }

    /// 以 debug 级别输出所有失败明细
    pub fn log_failures(&self, component: &str) {
        for failure in &self.failures {
            tracing::debug!(
                "[{}] skipped {}:{}: {}",
                component,
                failure.origin,
                failure.line_number,
                failure.error
            );
        }
    }
}
