// 公钥记录数据结构

use serde::{Deserialize, Serialize};

/// 清单中的单条公钥记录
/// JSON 字段名与缓存文件格式保持一致：{Username, Filename, MD5, SHA256}
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// 身份标签（公钥注释，缺省为 `<unknown>`）
    #[serde(rename = "Username")]
    pub identity: String,
    /// 公钥所在文件名（不含目录）
    #[serde(rename = "Filename")]
    pub filename: String,
    /// 旧式 MD5 指纹（冒号分隔的十六进制）
    #[serde(rename = "MD5")]
    pub fingerprint_md5: String,
    /// SHA256 指纹（`SHA256:` 前缀 + base64）
    #[serde(rename = "SHA256")]
    pub fingerprint_sha256: String,
}

impl KeyRecord {
    /// 指纹是否与记录中任一形式相同
    pub fn matches_fingerprint(&self, fingerprint: &str) -> bool {
        !fingerprint.is_empty()
            && (self.fingerprint_md5 == fingerprint || self.fingerprint_sha256 == fingerprint)
    }

    /// 文本清单中的一行
    pub fn as_text_line(&self) -> String {
        format!(
            "{}: {} {} {}",
            self.filename, self.identity, self.fingerprint_md5, self.fingerprint_sha256
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> KeyRecord {
        KeyRecord {
            identity: "alice@laptop".to_string(),
            filename: "alice.pub".to_string(),
            fingerprint_md5: "d9:2f:31:67:7f:15:f1:84:d4:89:15:90:9f:29:22:6b".to_string(),
            fingerprint_sha256: "SHA256:DUpt7uZW3immBcXzkfRjJdlU2dRvJz1uRIliYN3xeCE".to_string(),
        }
    }

    #[test]
    fn test_matches_either_fingerprint() {
        let r = record();
        assert!(r.matches_fingerprint("SHA256:DUpt7uZW3immBcXzkfRjJdlU2dRvJz1uRIliYN3xeCE"));
        assert!(r.matches_fingerprint("d9:2f:31:67:7f:15:f1:84:d4:89:15:90:9f:29:22:6b"));
        assert!(!r.matches_fingerprint("SHA256:other"));
        assert!(!r.matches_fingerprint(""));
    }

    #[test]
    fn test_json_field_names() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["Username"], "alice@laptop");
        assert_eq!(json["Filename"], "alice.pub");
        assert!(json.get("MD5").is_some());
        assert!(json.get("SHA256").is_some());
    }

    #[test]
    fn test_text_line() {
        assert_eq!(
            record().as_text_line(),
            "alice.pub: alice@laptop d9:2f:31:67:7f:15:f1:84:d4:89:15:90:9f:29:22:6b SHA256:DUpt7uZW3immBcXzkfRjJdlU2dRvJz1uRIliYN3xeCE"
        );
    }
}
