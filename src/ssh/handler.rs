// SSH 客户端 Handler 实现
// 实现 russh::client::Handler trait

use russh::keys::PublicKey;
use std::future::Future;
use tracing::{debug, warn};

use super::error::SshError;

/// SSH 客户端 Handler
/// 负责服务器公钥检查
pub struct SshClientHandler {
    /// 服务器主机名（用于日志）
    host: String,
    /// 期望的 SHA256 指纹
    expected_fingerprint: Option<String>,
}

impl SshClientHandler {
    /// 创建新的 Handler
    pub fn new(host: String, expected_fingerprint: Option<String>) -> Self {
        Self {
            host,
            expected_fingerprint,
        }
    }

    /// 校验服务器公钥指纹
    fn verify(&self, actual: &str) -> Result<bool, SshError> {
        match &self.expected_fingerprint {
            Some(expected) if expected == actual => {
                debug!("[SSH] Host key for {} verified", self.host);
                Ok(true)
            }
            Some(expected) => Err(SshError::HostKey {
                expected: expected.clone(),
                actual: actual.to_string(),
            }),
            None => {
                warn!(
                    "[SSH] Accepting unverified host key for {} ({}); pass --host-fingerprint to pin it",
                    self.host, actual
                );
                Ok(true)
            }
        }
    }
}

impl russh::client::Handler for SshClientHandler {
    type Error = SshError;

    /// 检查服务器公钥
    fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        let fingerprint = server_public_key
            .fingerprint(russh::keys::ssh_key::HashAlg::Sha256)
            .to_string();

        debug!(
            "[SSH] Server key type: {}, fingerprint: {}",
            server_public_key.algorithm(),
            fingerprint
        );

        let result = self.verify(&fingerprint);
        async { result }
    }
}
