// 本地数据持久化服务
// 清单缓存为 KeyRecord 的 JSON 数组

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{CACHE_DIR_NAME, CACHE_FILE_NAME, FALLBACK_INVENTORY_PATH};
use crate::models::KeyRecord;

/// 获取默认清单缓存路径
/// Linux: ~/.cache/sshwho/inventory.json
/// macOS: ~/Library/Caches/sshwho/inventory.json
/// 无法获取系统缓存目录时回退到 /tmp/sshwho.json
pub fn default_inventory_path() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join(CACHE_DIR_NAME).join(CACHE_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(FALLBACK_INVENTORY_PATH))
}

/// 加载清单缓存
pub fn load_inventory(path: &Path) -> Result<Vec<KeyRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("无法读取清单缓存文件 {}", path.display()))?;
    let records: Vec<KeyRecord> = serde_json::from_str(&content)
        .with_context(|| format!("无法解析清单缓存文件 {}", path.display()))?;
    Ok(records)
}

/// 保存清单缓存（覆盖写入）
pub fn save_inventory(path: &Path, records: &[KeyRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).context("无法创建缓存目录")?;
        }
    }
    let content = serde_json::to_string_pretty(records).context("无法序列化清单")?;
    fs::write(path, content)
        .with_context(|| format!("无法写入清单缓存文件 {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(identity: &str) -> KeyRecord {
        KeyRecord {
            identity: identity.to_string(),
            filename: format!("{}.pub", identity),
            fingerprint_md5: format!("md5-{}", identity),
            fingerprint_sha256: format!("SHA256:{}", identity),
        }
    }

    #[test]
    fn test_save_and_load_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("inventory.json");
        let records = vec![record("zed"), record("alice"), record("mike")];

        save_inventory(&path, &records).unwrap();
        assert_eq!(load_inventory(&path).unwrap(), records);
    }

    #[test]
    fn test_load_reads_legacy_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sshwho.json");
        fs::write(
            &path,
            r#"[{"Username":"alice","Filename":"keys","MD5":"aa:bb","SHA256":"SHA256:xyz"}]"#,
        )
        .unwrap();

        let records = load_inventory(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identity, "alice");
        assert_eq!(records[0].fingerprint_sha256, "SHA256:xyz");
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_inventory(&dir.path().join("missing.json")).is_err());

        let path = dir.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();
        assert!(load_inventory(&path).is_err());
    }
}
