// 默认路径与固定常量

/// 默认公钥目录
pub const DEFAULT_KEY_PATH: &str = "/tmp/keys";

/// 无法获取系统缓存目录时使用的清单缓存路径
pub const FALLBACK_INVENTORY_PATH: &str = "/tmp/sshwho.json";

/// 缓存目录下的应用子目录与文件名
pub const CACHE_DIR_NAME: &str = "sshwho";
pub const CACHE_FILE_NAME: &str = "inventory.json";

/// 环境变量
pub mod env {
    pub const KEY_PATH: &str = "SSHWHO_KEYPATH";
    pub const INVENTORY: &str = "SSHWHO_INVENTORY";
}

/// 公钥缺少注释时使用的身份标签
pub const UNKNOWN_IDENTITY: &str = "<unknown>";

/// 认证日志过滤子串
pub const ACCEPTED_FILTER: &str = "Accepted";

/// 远程命令默认超时（秒）
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

/// 远程连接默认值
pub const DEFAULT_SSH_USER: &str = "root";
pub const DEFAULT_SSH_PORT: u16 = 22;
