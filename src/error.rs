// 清单与日志关联错误类型定义

use thiserror::Error;

use crate::ssh::SshError;

/// 关联流程错误类型
#[derive(Debug, Error)]
pub enum AuditError {
    /// 公钥行无法解析
    #[error("Key parse error: {0}")]
    Parse(String),

    /// 日志行格式错误（字段缺失或形状不符）
    #[error("Malformed log line: {0}")]
    MalformedLogLine(String),

    /// 可识别的日志行，但认证方式不受支持
    #[error("Unsupported log type: {0}")]
    UnsupportedLogType(String),

    /// 缓存文件缺失或损坏
    #[error("Cache error: {0}")]
    Cache(String),

    /// 尝试保存空清单
    #[error("Empty inventory (no keys found in {0})")]
    EmptyInventory(String),

    /// 日志来源不可用（本地文件或远程命令）
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SshError> for AuditError {
    fn from(e: SshError) -> Self {
        AuditError::SourceUnavailable(e.to_string())
    }
}
