// SSH 会话管理
// 连接成功后的会话对象，按需打开执行通道

use async_trait::async_trait;
use russh::client::Handle;
use russh::{ChannelMsg, Disconnect};
use tracing::debug;

use crate::services::log_source::CommandExecutor;

use super::error::SshError;
use super::handler::SshClientHandler;

/// SSH 会话（连接成功后）
pub struct SshSession {
    handle: Handle<SshClientHandler>,
    /// user@host:port
    target: String,
}

impl SshSession {
    /// 创建新的会话
    pub fn new(handle: Handle<SshClientHandler>, target: String) -> Self {
        Self { handle, target }
    }

    /// 在新的会话通道中执行命令并收集输出
    pub async fn exec(&self, command: &str) -> Result<CommandOutput, SshError> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| SshError::Channel(e.to_string()))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| SshError::Channel(e.to_string()))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code = None;

        // exit-status 可能在 EOF 之后到达，读到通道关闭为止
        while let Some(channel_msg) = channel.wait().await {
            match channel_msg {
                ChannelMsg::Data { data } => {
                    stdout.extend_from_slice(&data);
                }
                ChannelMsg::ExtendedData { data, ext } => {
                    if ext == 1 {
                        // stderr
                        stderr.extend_from_slice(&data);
                    }
                }
                ChannelMsg::ExitStatus { exit_status } => {
                    exit_code = Some(exit_status);
                }
                ChannelMsg::Close => break,
                _ => {}
            }
        }

        let exit_code = exit_code
            .ok_or_else(|| SshError::Channel("Command exited without status".to_string()))?;

        debug!(
            "[SSH] `{}` on {} exited with {} ({} bytes)",
            command,
            self.target,
            exit_code,
            stdout.len()
        );

        Ok(CommandOutput {
            stdout,
            stderr,
            exit_code,
        })
    }

    /// 关闭会话
    pub async fn close(&self) -> Result<(), SshError> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CommandExecutor for SshSession {
    async fn run(&self, command: &str) -> Result<CommandOutput, SshError> {
        self.exec(command).await
    }

    fn describe(&self) -> String {
        self.target.clone()
    }
}

/// 命令输出
#[derive(Debug)]
pub struct CommandOutput {
    /// 标准输出
    pub stdout: Vec<u8>,
    /// 标准错误
    pub stderr: Vec<u8>,
    /// 退出码
    pub exit_code: u32,
}

impl CommandOutput {
    /// 获取标准输出字符串
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// 获取标准错误字符串
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}
