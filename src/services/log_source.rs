// 日志来源适配
// 本地文件直接逐行读取；远程通过 SSH 执行 grep 并拆分标准输出

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::AuditError;
use crate::ssh::{CommandOutput, SshError};

/// 可执行单条 shell 命令的远程通道
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// 执行命令并返回完整输出
    async fn run(&self, command: &str) -> Result<CommandOutput, SshError>;

    /// 用于日志的描述（如 user@host:port）
    fn describe(&self) -> String;
}

/// 读取包含 `filter` 的日志行
/// `transport` 为 None 时读取本地文件；`command_timeout` 只约束远程命令
pub async fn fetch_lines(
    log_path: &str,
    filter: &str,
    transport: Option<&dyn CommandExecutor>,
    command_timeout: Duration,
) -> Result<Vec<String>, AuditError> {
    match transport {
        Some(executor) => {
            fetch_remote_lines(log_path, filter, executor, command_timeout).await
        }
        None => read_local_lines(log_path, filter),
    }
}

/// 读取本地日志文件
pub fn read_local_lines(log_path: &str, filter: &str) -> Result<Vec<String>, AuditError> {
    let file = File::open(log_path)
        .map_err(|e| AuditError::SourceUnavailable(format!("{}: {}", log_path, e)))?;

    let mut lines = Vec::new();
    for line in BufReader::new(file).split(b'\n') {
        let bytes =
            line.map_err(|e| AuditError::SourceUnavailable(format!("{}: {}", log_path, e)))?;
        let text = String::from_utf8_lossy(&bytes);
        let text = text.trim_end_matches('\r');
        if text.contains(filter) {
            lines.push(text.to_string());
        }
    }

    debug!("[Source] {} matching lines in {}", lines.len(), log_path);
    Ok(lines)
}

/// 在远程主机上执行 grep 读取日志
async fn fetch_remote_lines(
    log_path: &str,
    filter: &str,
    executor: &dyn CommandExecutor,
    command_timeout: Duration,
) -> Result<Vec<String>, AuditError> {
    let command = grep_command(log_path, filter);
    info!("[Source] Running `{}` on {}", command, executor.describe());

    let output = run_with_timeout(executor, &command, command_timeout).await?;
    match output.exit_code {
        // grep 没有匹配时返回 1
        0 | 1 => {}
        code => {
            return Err(AuditError::SourceUnavailable(format!(
                "remote command exited with {}: {}",
                code,
                output.stderr_string().trim()
            )))
        }
    }

    let lines: Vec<String> = output
        .stdout_string()
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| l.contains(filter))
        .map(str::to_string)
        .collect();

    debug!(
        "[Source] {} matching lines from {}:{}",
        lines.len(),
        executor.describe(),
        log_path
    );
    Ok(lines)
}

/// 带超时执行远程命令
async fn run_with_timeout(
    executor: &dyn CommandExecutor,
    command: &str,
    limit: Duration,
) -> Result<CommandOutput, SshError> {
    timeout(limit, executor.run(command))
        .await
        .map_err(|_| SshError::Timeout(limit.as_secs()))?
}

/// 构建远程过滤命令
pub fn grep_command(log_path: &str, filter: &str) -> String {
    format!("grep -- {} {}", shell_quote(filter), shell_quote(log_path))
}

/// POSIX 单引号转义
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
