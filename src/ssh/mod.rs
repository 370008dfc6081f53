// SSH 连接模块
//
// 模块结构:
// - config: 连接配置 (SshConfig, AuthMethod)
// - error: 错误类型 (SshError)
// - handler: russh Handler 实现（服务器公钥检查）
// - client: SSH 客户端核心（连接与认证）
// - session: SSH 会话（远程命令执行）

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod session;

// 公开导出
pub use client::SshClient;
pub use config::{AuthMethod, SshConfig};
pub use error::SshError;
pub use session::CommandOutput;
