// SSH 连接配置

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_SSH_PORT, DEFAULT_SSH_USER};

use super::error::SshError;

/// SSH 连接配置
#[derive(Clone, Debug)]
pub struct SshConfig {
    /// 目标主机
    pub host: String,
    /// 端口
    pub port: u16,
    /// 用户名
    pub username: String,
    /// 认证方式
    pub auth: AuthMethod,
    /// 连接超时（秒）
    pub connect_timeout: u64,
    /// 远程命令超时（秒）
    pub command_timeout: u64,
    /// 期望的服务器公钥 SHA256 指纹（为空时接受任意公钥）
    pub host_fingerprint: Option<String>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_SSH_PORT,
            username: DEFAULT_SSH_USER.to_string(),
            auth: AuthMethod::Agent,
            connect_timeout: 30,
            command_timeout: DEFAULT_COMMAND_TIMEOUT_SECS,
            host_fingerprint: None,
        }
    }
}

/// 认证方式
#[derive(Clone, Debug, PartialEq)]
pub enum AuthMethod {
    /// 使用 SSH_AUTH_SOCK 指向的 ssh-agent 中的密钥
    Agent,
    /// 公钥认证
    PublicKey {
        /// 私钥文件路径
        key_path: PathBuf,
        /// 私钥密码（如果有）
        passphrase: Option<String>,
    },
}

impl SshConfig {
    /// 解析连接字符串
    ///
    /// 支持 `user@host:port`、`host:port`、`host`，以及 `[v6addr]:port`。
    /// 用户名缺省为 root，端口缺省为 22。
    pub fn from_conn_str(conn: &str) -> Result<Self, SshError> {
        let conn = conn.trim();
        let mut config = Self::default();

        let host_part = match conn.split_once('@') {
            Some((user, rest)) => {
                if user.is_empty() {
                    return Err(SshError::Config(format!("Empty user in '{}'", conn)));
                }
                config.username = user.to_string();
                rest
            }
            None => conn,
        };

        let (host, port) = if let Some(bracketed) = host_part.strip_prefix('[') {
            let (host, rest) = bracketed
                .split_once(']')
                .ok_or_else(|| SshError::Config(format!("Unclosed '[' in '{}'", conn)))?;
            match rest.strip_prefix(':') {
                Some(port) => (host, Some(port)),
                None if rest.is_empty() => (host, None),
                None => return Err(SshError::Config(format!("Invalid address '{}'", conn))),
            }
        } else if host_part.matches(':').count() == 1 {
            let (host, port) = host_part.split_once(':').unwrap_or((host_part, ""));
            (host, Some(port))
        } else {
            // 不带方括号的 IPv6 地址不解析端口
            (host_part, None)
        };

        if host.is_empty() {
            return Err(SshError::Config(format!("Empty host in '{}'", conn)));
        }
        config.host = host.to_string();

        if let Some(port) = port {
            config.port = port
                .parse()
                .map_err(|_| SshError::Config(format!("Invalid port '{}' in '{}'", port, conn)))?;
        }

        Ok(config)
    }

    /// 用于日志显示的目标描述
    pub fn target(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }

    /// 构建 russh 配置
    pub fn to_russh_config(&self) -> russh::client::Config {
        let mut config = russh::client::Config::default();
        // russh 没有单独的命令超时，不活动超时取两者较大值
        config.inactivity_timeout = Some(Duration::from_secs(
            self.connect_timeout.max(self.command_timeout),
        ));
        config
    }
}
