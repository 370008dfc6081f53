// 公钥清单
// 从公钥目录扫描构建，或从 JSON 缓存加载；构建完成后只读

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::AuditError;
use crate::models::{KeyRecord, ScanReport};
use crate::services::keys::build_key_record;
use crate::services::storage;

/// 公钥清单
#[derive(Clone, Debug, Default)]
pub struct Inventory {
    records: Vec<KeyRecord>,
    key_path: PathBuf,
    cache_path: PathBuf,
}

impl Inventory {
    /// 公钥记录（按扫描顺序）
    pub fn records(&self) -> &[KeyRecord] {
        &self.records
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 递归扫描公钥目录（或单个文件）
    ///
    /// 每个普通文件逐行解析，无法解析的行与无法打开的文件记入失败列表，
    /// 不会中断扫描。只有根路径不可访问时返回错误。
    /// 目录项按文件名排序访问。符号链接跟随到目标，
    /// 同一目录只访问一次，重复进入（含链接环）记为失败。
    pub fn scan(key_path: &Path) -> Result<ScanReport<KeyRecord>, AuditError> {
        let root = absolute(key_path);
        let metadata = fs::metadata(&root)?;

        let mut report = ScanReport::default();
        if metadata.is_dir() {
            // 根目录必须可读
            let entries = sorted_entries(&root)?;
            let mut visited = HashSet::from([canonical(&root)]);
            for entry in entries {
                visit(&entry, &mut visited, &mut report);
            }
        } else if metadata.is_file() {
            scan_file(&root, &mut report);
        } else {
            warn!(
                "[Inventory] {} is neither a file nor a directory",
                root.display()
            );
        }
        Ok(report)
    }

    /// 从公钥目录构建清单
    pub fn build_from_scratch(key_path: &Path, cache_path: &Path) -> Result<Self, AuditError> {
        let report = Self::scan(key_path)?;
        report.log_failures("Inventory");
        info!(
            "[Inventory] Scanned {}: {} keys, {} skipped",
            key_path.display(),
            report.items.len(),
            report.failures.len()
        );

        Ok(Self {
            records: report.items,
            key_path: absolute(key_path),
            cache_path: absolute(cache_path),
        })
    }

    /// 从 JSON 缓存加载清单
    pub fn load_from_cache(cache_path: &Path) -> Result<Self, AuditError> {
        let records = storage::load_inventory(cache_path)
            .map_err(|e| AuditError::Cache(format!("{:#}", e)))?;
        debug!(
            "[Inventory] Loaded {} keys from cache {}",
            records.len(),
            cache_path.display()
        );

        Ok(Self {
            records,
            key_path: PathBuf::new(),
            cache_path: absolute(cache_path),
        })
    }

    /// 获取清单：优先使用有效缓存，否则重新扫描
    ///
    /// 缓存存在且可解析时直接使用（不比较公钥目录的修改时间）。
    /// 扫描失败时返回空清单而不是错误。
    pub fn resolve(key_path: &Path, cache_path: &Path, use_cache: bool) -> Self {
        if use_cache && cache_path.exists() {
            match Self::load_from_cache(cache_path) {
                Ok(mut inventory) => {
                    inventory.key_path = absolute(key_path);
                    return inventory;
                }
                Err(e) => warn!("[Inventory] Ignoring cache, rebuilding: {}", e),
            }
        }

        match Self::build_from_scratch(key_path, cache_path) {
            Ok(inventory) => inventory,
            Err(e) => {
                warn!(
                    "[Inventory] Failed to scan {}: {}",
                    key_path.display(),
                    e
                );
                Self {
                    records: Vec::new(),
                    key_path: absolute(key_path),
                    cache_path: absolute(cache_path),
                }
            }
        }
    }

    /// 写入缓存文件
    /// 空清单拒绝写入，避免覆盖之前的有效缓存
    pub fn save(&self) -> Result<(), AuditError> {
        if self.records.is_empty() {
            return Err(AuditError::EmptyInventory(
                self.key_path.display().to_string(),
            ));
        }
        storage::save_inventory(&self.cache_path, &self.records)
            .map_err(|e| AuditError::Cache(format!("{:#}", e)))?;
        info!(
            "[Inventory] Saved {} keys to {}",
            self.records.len(),
            self.cache_path.display()
        );
        Ok(())
    }

    /// 文本输出，每条记录一行
    pub fn as_text(&self) -> String {
        if self.records.is_empty() {
            return format!(
                "Empty inventory (no keys found in {})",
                self.key_path.display()
            );
        }
        self.records
            .iter()
            .map(KeyRecord::as_text_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// JSON 数组输出
    pub fn as_json(&self) -> String {
        serde_json::to_string(&self.records).unwrap_or_else(|_| "[]".to_string())
    }
}

/// 描述缓存文件路径及是否存在
pub fn describe_cache(cache_path: &Path) -> String {
    let path = absolute(cache_path);
    let status = if path.exists() { "Found" } else { "Not Found" };
    format!("Inventory: {}\nStatus:    {}", path.display(), status)
}

/// 转换为绝对路径（失败时保留原路径）
fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn sorted_entries(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

fn visit(path: &Path, visited: &mut HashSet<PathBuf>, report: &mut ScanReport<KeyRecord>) {
    let origin = path.display().to_string();
    // 悬空链接在这里失败
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            report.fail(origin, 0, e.into());
            return;
        }
    };

    if metadata.is_dir() {
        if !visited.insert(canonical(path)) {
            let skipped = io::Error::other("directory already visited, skipped");
            report.fail(origin, 0, skipped.into());
            return;
        }
        match sorted_entries(path) {
            Ok(entries) => {
                for entry in entries {
                    visit(&entry, visited, report);
                }
            }
            Err(e) => report.fail(origin, 0, e.into()),
        }
    } else if metadata.is_file() {
        scan_file(path, report);
    } else {
        debug!("[Inventory] Skipping special file {}", origin);
    }
}

/// 逐行解析单个公钥文件
fn scan_file(path: &Path, report: &mut ScanReport<KeyRecord>) {
    let origin = path.display().to_string();
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            report.fail(origin, 0, e.into());
            return;
        }
    };

    let reader = BufReader::new(file);
    for (index, line) in reader.split(b'\n').enumerate() {
        let line_number = index + 1;
        let bytes = match line {
            Ok(bytes) => bytes,
            Err(e) => {
                report.fail(origin, line_number, e.into());
                return;
            }
        };
        let text = String::from_utf8_lossy(&bytes);
        match build_key_record(path, &text) {
            Ok(record) => report.items.push(record),
            Err(e) => report.fail(origin.clone(), line_number, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::keys::fixtures::*;

    fn write_keys(dir: &Path) {
        fs::create_dir_all(dir.join("team").join("ops")).unwrap();
        fs::write(
            dir.join("team").join("authorized_keys"),
            format!("{}\nnot a key at all\n\n{}\n", ALICE_ED25519, BOB_RSA),
        )
        .unwrap();
        fs::write(dir.join("team").join("ops").join("anon.pub"), ANON_ECDSA).unwrap();
        fs::write(dir.join("README"), "keys live in team/").unwrap();
    }

    #[test]
    fn test_scan_collects_and_skips() {
        let dir = tempfile::tempdir().unwrap();
        write_keys(dir.path());

        let report = Inventory::scan(dir.path()).unwrap();
        let identities: Vec<_> = report.items.iter().map(|r| r.identity.as_str()).collect();
        assert_eq!(identities, vec!["alice@laptop", "bob", "<unknown>"]);
        assert_eq!(report.items[0].filename, "authorized_keys");
        assert_eq!(report.items[2].filename, "anon.pub");

        // README 一行 + authorized_keys 中的垃圾行与空行
        assert_eq!(report.failures.len(), 3);
        assert!(report
            .failures
            .iter()
            .all(|f| matches!(f.error, AuditError::Parse(_))));
    }

    #[test]
    fn test_scan_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alice.pub");
        fs::write(&path, ALICE_ED25519).unwrap();

        let report = Inventory::scan(&path).unwrap();
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].fingerprint_sha256, ALICE_SHA256);
    }

    #[test]
    fn test_scan_missing_root_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Inventory::scan(&dir.path().join("nope"));
        assert!(matches!(result, Err(AuditError::Io(_))));
    }

    #[test]
    fn test_unreadable_entries_are_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let alice = dir.path().join("alice.pub");
        fs::write(&alice, ALICE_ED25519).unwrap();

        let mut report = ScanReport::default();
        let mut visited = HashSet::new();
        visit(&dir.path().join("gone"), &mut visited, &mut report);
        scan_file(&dir.path().join("gone.pub"), &mut report);
        visit(&alice, &mut visited, &mut report);

        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].identity, "alice@laptop");
        assert_eq!(report.failures.len(), 2);
        assert!(report
            .failures
            .iter()
            .all(|f| f.line_number == 0 && matches!(f.error, AuditError::Io(_))));
        assert!(report.failures[0].origin.ends_with("gone"));
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_follows_symlinked_root() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let keys = dir.path().join("keys");
        fs::create_dir_all(&keys).unwrap();
        fs::write(keys.join("alice.pub"), ALICE_ED25519).unwrap();
        symlink(&keys, dir.path().join("keys-link")).unwrap();
        symlink(keys.join("alice.pub"), dir.path().join("alice-link.pub")).unwrap();

        for root in ["keys-link", "alice-link.pub"] {
            let report = Inventory::scan(&dir.path().join(root)).unwrap();
            assert_eq!(report.items.len(), 1, "{}", root);
            assert_eq!(report.items[0].fingerprint_sha256, ALICE_SHA256);
            assert!(report.failures.is_empty());
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_follows_nested_symlinks_once() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let keys = dir.path().join("keys");
        let shared = dir.path().join("shared");
        fs::create_dir_all(&keys).unwrap();
        fs::create_dir_all(&shared).unwrap();
        fs::write(keys.join("alice.pub"), ALICE_ED25519).unwrap();
        fs::write(shared.join("bob.pub"), BOB_RSA).unwrap();

        symlink(shared.join("bob.pub"), keys.join("bob.pub")).unwrap();
        symlink(&keys, keys.join("cycle")).unwrap();
        symlink(dir.path().join("missing.pub"), keys.join("dangling.pub")).unwrap();
        symlink(&shared, keys.join("shared")).unwrap();

        // alice.pub, bob.pub, cycle, dangling.pub, shared
        let report = Inventory::scan(&keys).unwrap();
        let identities: Vec<_> = report.items.iter().map(|r| r.identity.as_str()).collect();
        assert_eq!(identities, vec!["alice@laptop", "bob", "bob"]);

        let failed: Vec<_> = report
            .failures
            .iter()
            .map(|f| Path::new(&f.origin).file_name().unwrap().to_os_string())
            .collect();
        assert_eq!(failed, vec!["cycle", "dangling.pub"]);
        assert!(report
            .failures
            .iter()
            .all(|f| f.line_number == 0 && matches!(f.error, AuditError::Io(_))));
    }

    #[test]
    fn test_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        write_keys(&dir.path().join("keys"));
        let cache = dir.path().join("cache.json");

        let built = Inventory::build_from_scratch(&dir.path().join("keys"), &cache).unwrap();
        built.save().unwrap();

        let loaded = Inventory::load_from_cache(&cache).unwrap();
        assert_eq!(loaded.records(), built.records());
    }

    #[test]
    fn test_save_empty_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let keys = dir.path().join("keys");
        fs::create_dir_all(&keys).unwrap();
        let cache = dir.path().join("cache.json");
        fs::write(&cache, "previous").unwrap();

        let empty = Inventory::build_from_scratch(&keys, &cache).unwrap();
        assert!(empty.is_empty());
        assert!(matches!(empty.save(), Err(AuditError::EmptyInventory(_))));
        assert_eq!(fs::read_to_string(&cache).unwrap(), "previous");
    }

    #[test]
    fn test_resolve_prefers_cache() {
        let dir = tempfile::tempdir().unwrap();
        let keys = dir.path().join("keys");
        write_keys(&keys);
        let cache = dir.path().join("cache.json");
        fs::write(
            &cache,
            r#"[{"Username":"cached","Filename":"f","MD5":"m","SHA256":"SHA256:s"}]"#,
        )
        .unwrap();

        // 公钥目录比缓存更新也不影响
        fs::write(keys.join("new.pub"), BOB_RSA).unwrap();

        let inventory = Inventory::resolve(&keys, &cache, true);
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.records()[0].identity, "cached");

        let rebuilt = Inventory::resolve(&keys, &cache, false);
        assert_eq!(rebuilt.len(), 4);
    }

    #[test]
    fn test_resolve_falls_back_on_broken_cache_and_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let keys = dir.path().join("keys");
        write_keys(&keys);
        let cache = dir.path().join("cache.json");
        fs::write(&cache, "[{").unwrap();

        assert!(matches!(
            Inventory::load_from_cache(&cache),
            Err(AuditError::Cache(_))
        ));
        assert_eq!(Inventory::resolve(&keys, &cache, true).len(), 3);

        let missing = Inventory::resolve(&dir.path().join("none"), &cache, false);
        assert!(missing.is_empty());
    }

    #[test]
    fn test_presentation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alice.pub");
        fs::write(&path, ALICE_ED25519).unwrap();
        let inventory = Inventory::build_from_scratch(&path, &dir.path().join("c.json")).unwrap();

        assert_eq!(
            inventory.as_text(),
            format!("alice.pub: alice@laptop {} {}", ALICE_MD5, ALICE_SHA256)
        );
        let json: serde_json::Value = serde_json::from_str(&inventory.as_json()).unwrap();
        assert_eq!(json[0]["Username"], "alice@laptop");

        let empty = Inventory::default();
        assert!(empty.as_text().starts_with("Empty inventory (no keys found in"));
        assert_eq!(empty.as_json(), "[]");
        assert!(describe_cache(inventory.cache_path()).ends_with("Status:    Not Found"));
    }
}
