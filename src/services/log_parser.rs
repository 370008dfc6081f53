// 认证日志解析
//
// 支持两种解析策略，结果相同：
// - Pattern: 命名捕获组正则（默认）
// - Tokens: 按空白切分后按固定字段位置匹配
//
// 调用方负责预先过滤出包含 "Accepted" 的行，解析器本身不做子串过滤。

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::AuditError;
use crate::models::{AuthType, LoginEvent, ParseStrategy, ScanReport};

/// syslog "Accepted ..." 行
/// 时间戳支持 `Jan  1 00:00:00` 与 ISO-8601 两种形式，按原文保留；
/// `<proto>: <algo> <fingerprint>` 尾部可选（密码登录没有公钥字段）
static ACCEPTED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:(?P<iso>\d{4}-\d{2}-\d{2}T\S+)|(?P<classic>[A-Za-z]{3}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2}(?:\.\d+)?))\s+(?P<host>\S+)\s+(?P<tag>\S+?):\s+Accepted\s+(?P<method>\S+)\s+for\s+(?P<user>\S+)\s+from\s+(?P<address>\S+)\s+port\s+(?P<port>\S+)(?:\s+(?P<proto>[^\s:]+))?(?::\s+(?P<algorithm>\S+)\s+(?P<fingerprint>\S+))?",
    )
    .expect("accepted-line pattern is valid")
});

/// 两种策略共用的原始字段
struct RawFields<'a> {
    timestamp: String,
    host: &'a str,
    method: &'a str,
    user: &'a str,
    address: &'a str,
    port: &'a str,
    algorithm: Option<&'a str>,
    fingerprint: Option<&'a str>,
}

/// 日志行解析器
#[derive(Clone, Copy, Debug, Default)]
pub struct LogParser {
    strategy: ParseStrategy,
}

impl LogParser {
    pub fn new(strategy: ParseStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> ParseStrategy {
        self.strategy
    }

    /// 解析单行日志
    pub fn parse(&self, line: &str) -> Result<LoginEvent, AuditError> {
        match self.strategy {
            ParseStrategy::Pattern => parse_pattern(line),
            ParseStrategy::Tokens => parse_tokens(line),
        }
    }

    /// 批量解析，单行失败记入报告后继续
    pub fn parse_lines<S: AsRef<str>>(
        &self,
        origin: &str,
        lines: &[S],
    ) -> ScanReport<LoginEvent> {
        let mut report = ScanReport::default();
        for (index, line) in lines.iter().enumerate() {
            match self.parse(line.as_ref()) {
                Ok(event) => report.items.push(event),
                Err(e) => report.fail(origin, index + 1, e),
            }
        }
        report
    }
}

fn parse_pattern(line: &str) -> Result<LoginEvent, AuditError> {
    let caps = ACCEPTED_RE
        .captures(line)
        .ok_or_else(|| AuditError::MalformedLogLine("no accepted-login fields".to_string()))?;

    let timestamp = caps
        .name("iso")
        .or_else(|| caps.name("classic"))
        .map_or("", |m| m.as_str())
        .to_string();

    assemble(RawFields {
        timestamp,
        host: group(&caps, "host"),
        method: group(&caps, "method"),
        user: group(&caps, "user"),
        address: group(&caps, "address"),
        port: group(&caps, "port"),
        algorithm: caps.name("algorithm").map(|m| m.as_str()),
        fingerprint: caps.name("fingerprint").map(|m| m.as_str()),
    })
}

fn group<'t>(caps: &Captures<'t>, name: &str) -> &'t str {
    caps.name(name).map_or("", |m| m.as_str())
}

fn parse_tokens(line: &str) -> Result<LoginEvent, AuditError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    // ISO 时间戳占一个字段，传统 syslog 时间戳占三个
    let (timestamp, rest) = match tokens.as_slice() {
        [iso, rest @ ..] if is_iso_timestamp(iso) => (iso.to_string(), rest),
        [month, _, time, rest @ ..] => (span(line, month, time).to_string(), rest),
        _ => {
            return Err(AuditError::MalformedLogLine(format!(
                "only {} fields",
                tokens.len()
            )))
        }
    };

    match rest {
        [host, tag, "Accepted", method, "for", user, "from", address, "port", port, tail @ ..]
            if tag.ends_with(':') =>
        {
            let (algorithm, fingerprint) = match tail {
                [proto, algorithm, fingerprint, ..] if proto.ends_with(':') => {
                    (Some(*algorithm), Some(*fingerprint))
                }
                _ => (None, None),
            };
            assemble(RawFields {
                timestamp,
                host,
                method,
                user,
                address,
                port,
                algorithm,
                fingerprint,
            })
        }
        _ => Err(AuditError::MalformedLogLine(format!(
            "unexpected field layout ({} fields)",
            tokens.len()
        ))),
    }
}

/// `first` 到 `last`（含）之间的原文，两者都必须是 `line` 的子切片
fn span<'a>(line: &'a str, first: &str, last: &str) -> &'a str {
    let base = line.as_ptr() as usize;
    let start = first.as_ptr() as usize - base;
    let end = last.as_ptr() as usize - base + last.len();
    &line[start..end]
}

fn is_iso_timestamp(token: &str) -> bool {
    let bytes = token.as_bytes();
    bytes.len() > 10
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[10] == b'T'
}

/// 校验认证方式与端口，组装事件
fn assemble(raw: RawFields<'_>) -> Result<LoginEvent, AuditError> {
    let auth_type: AuthType = raw
        .method
        .parse()
        .map_err(|_| AuditError::UnsupportedLogType(raw.method.to_string()))?;

    let source_port: u16 = raw
        .port
        .parse()
        .map_err(|_| AuditError::MalformedLogLine(format!("invalid port: {}", raw.port)))?;

    let (key_algorithm, fingerprint) = match auth_type {
        AuthType::PublicKey => match (raw.algorithm, raw.fingerprint) {
            (Some(algorithm), Some(fingerprint)) => {
                (algorithm.to_string(), fingerprint.to_string())
            }
            _ => {
                return Err(AuditError::MalformedLogLine(
                    "publickey login without key fields".to_string(),
                ))
            }
        },
        AuthType::Password => (String::new(), String::new()),
    };

    Ok(LoginEvent {
        timestamp: raw.timestamp,
        target_host: raw.host.to_string(),
        claimed_user: raw.user.to_string(),
        source_address: raw.address.to_string(),
        source_port,
        auth_type,
        key_algorithm,
        fingerprint,
    })
}
