// SSH 客户端核心实现

use std::net::ToSocketAddrs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use russh::client::{AuthResult, Handle};
use russh::keys::agent::client::AgentClient;
use russh::keys::ssh_key::HashAlg;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

use super::config::{AuthMethod, SshConfig};
use super::error::SshError;
use super::handler::SshClientHandler;
use super::session::SshSession;

/// SSH 客户端
/// 负责建立 SSH 连接并返回 SshSession
pub struct SshClient {
    /// 连接配置
    config: SshConfig,
}

impl SshClient {
    /// 创建新的 SSH 客户端
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    /// 执行连接
    /// 返回 SshSession 用于后续操作
    pub async fn connect(&self) -> Result<SshSession, SshError> {
        info!("[SSH] Connecting to {}...", self.config.target());

        // 解析地址
        let addr = (self.config.host.as_str(), self.config.port)
            .to_socket_addrs()
            .map_err(|e| SshError::Config(format!("Failed to resolve address: {}", e)))?
            .next()
            .ok_or_else(|| SshError::Config("No valid address found".to_string()))?;

        let connect_timeout = Duration::from_secs(self.config.connect_timeout);
        let tcp_stream = timeout(connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| SshError::Timeout(self.config.connect_timeout))?
            .map_err(SshError::Io)?;

        debug!("[SSH] TCP connection established to {}", addr);

        let russh_config = Arc::new(self.config.to_russh_config());
        let handler = SshClientHandler::new(
            self.config.host.clone(),
            self.config.host_fingerprint.clone(),
        );

        let mut handle = timeout(
            connect_timeout,
            russh::client::connect_stream(russh_config, tcp_stream, handler),
        )
        .await
        .map_err(|_| SshError::Timeout(self.config.connect_timeout))??;

        debug!(
            "[SSH] Handshake completed, authenticating as '{}'",
            self.config.username
        );

        self.authenticate(&mut handle).await?;

        info!("[SSH] Connected to {}", self.config.target());

        Ok(SshSession::new(handle, self.config.target()))
    }

    /// 执行认证
    async fn authenticate(&self, handle: &mut Handle<SshClientHandler>) -> Result<(), SshError> {
        match &self.config.auth {
            AuthMethod::Agent => self.authenticate_with_agent(handle).await,
            AuthMethod::PublicKey {
                key_path,
                passphrase,
            } => {
                debug!("[SSH] Using public key authentication: {:?}", key_path);

                let key = self
                    .load_private_key(key_path, passphrase.as_deref())
                    .await?;
                let hash_alg = key.algorithm().is_rsa().then_some(HashAlg::Sha512);
                let key_with_alg =
                    russh::keys::PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg);

                let auth_result = handle
                    .authenticate_publickey(&self.config.username, key_with_alg)
                    .await?;

                match auth_result {
                    AuthResult::Success => Ok(()),
                    AuthResult::Failure {
                        remaining_methods, ..
                    } => Err(SshError::Auth(format!(
                        "Public key authentication failed. Server suggests: {:?}",
                        remaining_methods
                    ))),
                }
            }
        }
    }

    /// 依次尝试 ssh-agent 提供的每个身份
    async fn authenticate_with_agent(
        &self,
        handle: &mut Handle<SshClientHandler>,
    ) -> Result<(), SshError> {
        let mut agent = AgentClient::connect_env()
            .await
            .map_err(|e| SshError::Auth(format!("Failed to connect to ssh-agent: {}", e)))?;

        let identities = agent.request_identities().await?;
        if identities.is_empty() {
            return Err(SshError::Auth("ssh-agent has no identities".to_string()));
        }
        debug!("[SSH] ssh-agent offers {} identities", identities.len());

        for key in identities {
            let hash_alg = key.algorithm().is_rsa().then_some(HashAlg::Sha512);
            let fingerprint = key.fingerprint(HashAlg::Sha256);

            let auth_result = handle
                .authenticate_publickey_with(&self.config.username, key, hash_alg, &mut agent)
                .await
                .map_err(|e| SshError::Auth(e.to_string()))?;

            if let AuthResult::Success = auth_result {
                debug!("[SSH] Authenticated with agent key {}", fingerprint);
                return Ok(());
            }
            debug!("[SSH] Agent key {} rejected", fingerprint);
        }

        Err(SshError::Auth(format!(
            "No ssh-agent identity accepted for '{}'",
            self.config.username
        )))
    }

    /// 加载私钥文件
    async fn load_private_key(
        &self,
        key_path: &Path,
        passphrase: Option<&str>,
    ) -> Result<russh::keys::PrivateKey, SshError> {
        // 读取密钥文件
        let key_data = tokio::fs::read(key_path)
            .await
            .map_err(|e| SshError::Key(format!("Failed to read key file: {}", e)))?;

        russh::keys::decode_secret_key(&String::from_utf8_lossy(&key_data), passphrase)
            .map_err(|e| SshError::Key(format!("Failed to decode key: {}", e)))
    }
}
