// 登录事件数据结构

use std::fmt;
use std::str::FromStr;

/// 支持的认证方式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthType {
    PublicKey,
    Password,
}

impl AuthType {
    /// 日志中的原始名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PublicKey => "publickey",
            Self::Password => "password",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "publickey" => Ok(Self::PublicKey),
            "password" => Ok(Self::Password),
            _ => Err(()),
        }
    }
}

/// 一次成功的 SSH 登录（由单行认证日志解析而来）
///
/// `Password` 事件的 `key_algorithm` 与 `fingerprint` 为空；
/// `PublicKey` 事件两者均非空。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginEvent {
    /// 原始时间戳（原样保留）
    pub timestamp: String,
    /// 记录日志的目标主机
    pub target_host: String,
    /// 日志中声明的用户名
    pub claimed_user: String,
    /// 来源地址
    pub source_address: String,
    /// 来源端口
    pub source_port: u16,
    /// 认证方式
    pub auth_type: AuthType,
    /// 公钥算法
    pub key_algorithm: String,
    /// 公钥指纹
    pub fingerprint: String,
}

impl LoginEvent {
    /// "using" 字段：公钥登录为指纹，其他为认证方式名称
    pub fn using_field(&self) -> &str {
        match self.auth_type {
            AuthType::PublicKey => &self.fingerprint,
            AuthType::Password => self.auth_type.as_str(),
        }
    }

    /// 格式化归属结果
    /// `identity` 为 None 时使用日志中声明的用户名
    pub fn format(&self, identity: Option<&str>) -> String {
        let user = identity
            .filter(|u| !u.is_empty())
            .unwrap_or(&self.claimed_user);
        format!(
            "[+] {} {} connected to {} from {} using {}",
            self.timestamp,
            user,
            self.target_host,
            self.source_address,
            self.using_field()
        )
    }
}
