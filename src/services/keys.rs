// 公钥解析与指纹计算
// 输入为 authorized_keys 格式的一行：[选项] 算法 base64 [注释]

use std::path::Path;
use std::str::FromStr;

use ssh_key::{Algorithm, HashAlg, PublicKey};

use crate::constants::UNKNOWN_IDENTITY;
use crate::error::AuditError;
use crate::models::KeyRecord;

/// 一把公钥的两种指纹
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fingerprints {
    /// `aa:bb:...` 形式
    pub md5: String,
    /// `SHA256:...` 形式
    pub sha256: String,
}

/// 计算公钥指纹
/// 两种指纹都基于公钥的 wire 格式 blob
pub fn derive_fingerprints(key: &PublicKey) -> Result<Fingerprints, AuditError> {
    let blob = key
        .to_bytes()
        .map_err(|e| AuditError::Parse(format!("Failed to encode key blob: {}", e)))?;

    Ok(Fingerprints {
        md5: md5_fingerprint(&blob),
        sha256: key.fingerprint(HashAlg::Sha256).to_string(),
    })
}

/// 旧式 MD5 指纹：十六进制字节以冒号分隔
fn md5_fingerprint(blob: &[u8]) -> String {
    md5::compute(blob)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// 证书公钥的算法后缀
const CERT_SUFFIX: &str = "-cert-v01@openssh.com";

/// authorized_keys 一行拆出的字段
struct KeyFields<'a> {
    algorithm: &'a str,
    blob: &'a str,
    comment: &'a str,
}

/// 解析一行 authorized_keys 文本
///
/// 字段之间可以是空格或制表符；选项前缀只用于定位公钥，不做校验。
pub fn parse_public_key(line: &str) -> Result<PublicKey, AuditError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(AuditError::Parse("empty line".to_string()));
    }

    let fields = split_key_fields(line);
    if fields.algorithm.ends_with(CERT_SUFFIX) {
        return Err(AuditError::Parse(format!(
            "certificate keys are not supported: {}",
            fields.algorithm
        )));
    }

    let normalized = [fields.algorithm, fields.blob, fields.comment]
        .into_iter()
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let key = PublicKey::from_str(&normalized).map_err(|e| AuditError::Parse(e.to_string()))?;

    let algorithm = key.algorithm();
    if matches!(algorithm, Algorithm::Other(_)) {
        return Err(AuditError::Parse(format!(
            "unknown key algorithm: {}",
            algorithm.as_str()
        )));
    }

    Ok(key)
}

/// 拆分 `[选项] 算法 blob [注释]`，注释保持原样
fn split_key_fields(line: &str) -> KeyFields<'_> {
    let (first, rest) = split_field(line);
    let key_part = if is_key_type(first) { line } else { rest };
    let (algorithm, rest) = split_field(key_part);
    let (blob, comment) = split_field(rest);
    KeyFields {
        algorithm,
        blob,
        comment,
    }
}

fn is_key_type(token: &str) -> bool {
    ["ssh-", "ecdsa-sha2-", "sk-"]
        .iter()
        .any(|prefix| token.starts_with(prefix))
}

/// 取第一个字段，双引号内的空白不作为分隔
fn split_field(s: &str) -> (&str, &str) {
    let mut quoted = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => quoted = !quoted,
            ' ' | '\t' if !quoted => {
                return (&s[..i], s[i..].trim_start_matches([' ', '\t']));
            }
            _ => {}
        }
    }
    (s, "")
}

/// 由一行公钥文本构建清单记录
/// `source` 为公钥所在文件，只保留文件名部分
pub fn build_key_record(source: &Path, line: &str) -> Result<KeyRecord, AuditError> {
    let key = parse_public_key(line)?;
    let fingerprints = derive_fingerprints(&key)?;

    let comment = key.comment().trim();
    let identity = if comment.is_empty() {
        UNKNOWN_IDENTITY.to_string()
    } else {
        comment.to_string()
    };

    let filename = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string_lossy().into_owned());

    Ok(KeyRecord {
        identity,
        filename,
        fingerprint_md5: fingerprints.md5,
        fingerprint_sha256: fingerprints.sha256,
    })
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_fingerprints_match_ssh_keygen() {
        let record = build_key_record(Path::new("/keys/alice.pub"), ALICE_ED25519).unwrap();
        assert_eq!(record.fingerprint_md5, ALICE_MD5);
        assert_eq!(record.fingerprint_sha256, ALICE_SHA256);
        assert_eq!(record.identity, "alice@laptop");
        assert_eq!(record.filename, "alice.pub");

        let record = build_key_record(Path::new("bob.pub"), BOB_RSA).unwrap();
        assert_eq!(record.fingerprint_md5, BOB_MD5);
        assert_eq!(record.fingerprint_sha256, BOB_SHA256);
        assert_eq!(record.identity, "bob");
    }

    #[test]
    fn test_derivation_is_deterministic() {
        for line in [ALICE_ED25519, BOB_RSA, ANON_ECDSA] {
            let key = parse_public_key(line).unwrap();
            assert_eq!(
                derive_fingerprints(&key).unwrap(),
                derive_fingerprints(&key).unwrap()
            );
        }
    }

    #[test]
    fn test_missing_comment_is_unknown() {
        let record = build_key_record(Path::new("anon.pub"), ANON_ECDSA).unwrap();
        assert_eq!(record.identity, UNKNOWN_IDENTITY);
        assert_eq!(record.fingerprint_md5, ANON_MD5);
        assert_eq!(record.fingerprint_sha256, ANON_SHA256);
    }

    #[test]
    fn test_authorized_keys_options_are_accepted() {
        let line = format!("from=\"10.0.0.0/8\",no-pty {}", ALICE_ED25519);
        let record = build_key_record(Path::new("authorized_keys"), &line).unwrap();
        assert_eq!(record.fingerprint_sha256, ALICE_SHA256);
    }

    #[test]
    fn test_tab_and_repeated_separators() {
        let tabbed = ALICE_ED25519.replacen(' ', "\t", 2);
        let record = build_key_record(Path::new("alice.pub"), &tabbed).unwrap();
        assert_eq!(record.fingerprint_sha256, ALICE_SHA256);
        assert_eq!(record.identity, "alice@laptop");

        let padded = format!("no-pty\t \t{}", BOB_RSA.replacen(' ', "  ", 1));
        let record = build_key_record(Path::new("authorized_keys"), &padded).unwrap();
        assert_eq!(record.fingerprint_sha256, BOB_SHA256);
        assert_eq!(record.identity, "bob");
    }

    #[test]
    fn test_quoted_options_may_contain_whitespace() {
        let line = format!(
            "command=\"echo \\\"hi there\\\"\",no-pty {}",
            ALICE_ED25519
        );
        let record = build_key_record(Path::new("authorized_keys"), &line).unwrap();
        assert_eq!(record.fingerprint_sha256, ALICE_SHA256);
        assert_eq!(record.identity, "alice@laptop");
    }

    #[test]
    fn test_certificates_are_rejected() {
        let line = "ssh-ed25519-cert-v01@openssh.com AAAAIHNzaC1lZDI1NTE5LWNlcnQtdjAxQG9wZW5zc2guY29t alice";
        assert!(matches!(
            parse_public_key(line),
            Err(AuditError::Parse(ref m)) if m.contains("certificate")
        ));
    }

    #[test]
    fn test_invalid_lines_are_parse_errors() {
        for line in [
            "",
            "   ",
            "# comment",
            "ssh-ed25519 not-base64!!! alice",
            "ssh-ed25519",
        ] {
            assert!(
                matches!(parse_public_key(line), Err(AuditError::Parse(_))),
                "line should be rejected: {:?}",
                line
            );
        }
    }
}
