// 运行配置
// 由命令行参数一次性构建，之后只读传递给各处理流程

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use crate::constants::{DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_KEY_PATH};

/// 日志行解析策略
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ParseStrategy {
    /// 命名捕获组正则（默认）
    #[default]
    Pattern,
    /// 按空白切分的定位字段
    Tokens,
}

/// 关联输出选项
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CorrelationOptions {
    /// 未匹配任何公钥的登录也按声明用户名输出
    pub report_unmatched: bool,
    /// 同一事件的重复归属行只输出一次
    pub dedup: bool,
}

/// 远程日志来源配置
#[derive(Clone, Debug, Default)]
pub struct RemoteSettings {
    /// 连接字符串 `[user@]host[:port]`
    pub server: String,
    /// 私钥文件（为空时使用 ssh-agent）
    pub identity_file: Option<PathBuf>,
    /// 期望的服务器公钥 SHA256 指纹
    pub host_fingerprint: Option<String>,
}

/// 应用配置
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// 公钥目录或文件
    pub key_path: PathBuf,
    /// 清单缓存文件
    pub inventory_path: PathBuf,
    /// JSON 输出
    pub as_json: bool,
    /// 认证日志路径
    pub log_file: Option<String>,
    /// 远程来源（为空时读取本地文件）
    pub remote: Option<RemoteSettings>,
    pub strategy: ParseStrategy,
    pub correlation: CorrelationOptions,
    /// 远程命令超时
    pub command_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            key_path: PathBuf::from(DEFAULT_KEY_PATH),
            inventory_path: crate::services::storage::default_inventory_path(),
            as_json: false,
            log_file: None,
            remote: None,
            strategy: ParseStrategy::default(),
            correlation: CorrelationOptions::default(),
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    /// 分析日志时是否允许使用缓存
    /// 只有默认公钥目录才复用缓存，显式指定的目录总是重新扫描
    pub fn analyze_uses_cache(&self) -> bool {
        self.key_path == PathBuf::from(DEFAULT_KEY_PATH)
    }
}
