// 命令处理流程
// inv / analyze / info 三个动作，均接收只读的 AppConfig

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::constants::ACCEPTED_FILTER;
use crate::models::{AppConfig, RemoteSettings};
use crate::services::correlator::correlate;
use crate::services::inventory::{describe_cache, Inventory};
use crate::services::log_parser::LogParser;
use crate::services::log_source::fetch_lines;
use crate::ssh::{AuthMethod, SshClient, SshConfig, SshError};

/// 输出公钥清单，`write` 时同时写入缓存
pub fn process_inventory(config: &AppConfig, write: bool) -> Result<Vec<String>> {
    let inventory = Inventory::resolve(&config.key_path, &config.inventory_path, true);

    if write {
        inventory.save().context("无法保存清单缓存")?;
    }

    let output = if config.as_json {
        inventory.as_json()
    } else {
        inventory.as_text()
    };
    Ok(vec![output])
}

/// 输出清单缓存状态
pub fn process_info(config: &AppConfig) -> Vec<String> {
    vec![describe_cache(&config.inventory_path)]
}

/// 分析认证日志，输出归属结果
pub async fn process_auth_log(config: &AppConfig) -> Result<Vec<String>> {
    let log_file = config
        .log_file
        .as_deref()
        .context("缺少认证日志路径 (-f)")?;

    let inventory = Inventory::resolve(
        &config.key_path,
        &config.inventory_path,
        config.analyze_uses_cache(),
    );
    if inventory.is_empty() {
        warn!(
            "[Analyze] Empty inventory (no keys found in {})",
            inventory.key_path().display()
        );
    } else {
        debug!(
            "[Analyze] Inventory holds {} keys (cache {})",
            inventory.len(),
            inventory.cache_path().display()
        );
    }

    let lines = match &config.remote {
        Some(remote) => {
            let ssh_config = build_ssh_config(remote, config)?;
            let session = SshClient::new(ssh_config)
                .connect()
                .await
                .context("无法连接远程服务器")?;

            let result = fetch_lines(
                log_file,
                ACCEPTED_FILTER,
                Some(&session),
                config.command_timeout,
            )
            .await;
            if let Err(e) = session.close().await {
                debug!("[Analyze] Failed to close session: {}", e);
            }
            result
        }
        None => fetch_lines(log_file, ACCEPTED_FILTER, None, config.command_timeout).await,
    }
    .with_context(|| format!("无法读取认证日志 {}", log_file))?;

    let parser = LogParser::new(config.strategy);
    let report = parser.parse_lines(log_file, &lines);
    report.log_failures("Analyze");
    info!(
        "[Analyze] {} accepted logins parsed ({:?} strategy), {} skipped",
        report.items.len(),
        parser.strategy(),
        report.failures.len()
    );

    Ok(correlate(&report.items, &inventory, config.correlation))
}

/// 从远程配置构建 SshConfig
fn build_ssh_config(remote: &RemoteSettings, config: &AppConfig) -> Result<SshConfig, SshError> {
    let mut ssh_config = SshConfig::from_conn_str(&remote.server)?;
    if let Some(key_path) = &remote.identity_file {
        ssh_config.auth = AuthMethod::PublicKey {
            key_path: key_path.clone(),
            passphrase: None,
        };
    }
    ssh_config.host_fingerprint = remote.host_fingerprint.clone();
    ssh_config.command_timeout = config.command_timeout.as_secs();
    Ok(ssh_config)
}
