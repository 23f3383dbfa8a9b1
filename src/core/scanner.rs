use crate::core::snapshot::{FileRecord, Snapshot};
use crate::error::SyncError;
use crate::storage::{relative_path, Storage};
use anyhow::Result;
use tracing::{debug, info};

/// 文件扫描器
///
/// 遍历一棵目录树并生成快照，目录只遍历不记录。
#[derive(Debug, Default)]
pub struct FileScanner;

impl FileScanner {
    pub fn new() -> Self {
        Self
    }

    /// 扫描 root 下的所有普通文件
    ///
    /// 任何条目出错都会让整个扫描失败，不会返回部分快照。
    pub async fn scan(&self, storage: &dyn Storage, root: &str) -> Result<Snapshot> {
        info!("开始扫描存储: {}, root: {}", storage.name(), root);

        let entries = storage
            .walk(root)
            .await
            .map_err(|e| SyncError::Snapshot {
                root: root.to_string(),
                reason: format!("{:#}", e),
            })?;

        let mut records = Vec::with_capacity(entries.len());
        let mut dir_count = 0;
        let mut skipped = 0;

        for entry in entries {
            if entry.is_dir {
                dir_count += 1;
                continue;
            }

            if !entry.is_file {
                debug!("跳过非普通文件: {}", entry.path);
                skipped += 1;
                continue;
            }

            records.push(FileRecord {
                path: relative_path(root, &entry.path)?,
                size: entry.size,
                modified: entry.modified,
            });
        }

        let snapshot = Snapshot::from_records(records);

        info!(
            "扫描完成: {} 个文件, {} 个目录, {} 个被跳过",
            snapshot.len(),
            dir_count,
            skipped
        );

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorage;
    use crate::storage::{normalize_path, LocalStorage};
    use chrono::DateTime;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_scan_local_nested_tree() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("sub/dir")).unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();
        fs::write(dir.path().join("root.txt"), "root").unwrap();
        fs::write(dir.path().join("sub/nested.txt"), "nested").unwrap();
        fs::write(dir.path().join("sub/dir/deep.txt"), "deep").unwrap();

        let root = normalize_path(dir.path().to_str().unwrap());
        let snapshot = FileScanner::new()
            .scan(&LocalStorage::new(), &root)
            .await
            .unwrap();

        let paths: Vec<_> = snapshot.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["root.txt", "sub/dir/deep.txt", "sub/nested.txt"]);
        assert_eq!(snapshot.get("sub/nested.txt").unwrap().size, 6);
    }

    #[tokio::test]
    async fn test_scan_root_with_trailing_separator() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let root = format!("{}/", normalize_path(dir.path().to_str().unwrap()));
        let snapshot = FileScanner::new()
            .scan(&LocalStorage::new(), &root)
            .await
            .unwrap();

        assert!(snapshot.get("a.txt").is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_scan_skips_symlinks() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("real.txt"), "real").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real.txt"), dir.path().join("link.txt"))
            .unwrap();

        let root = normalize_path(dir.path().to_str().unwrap());
        let snapshot = FileScanner::new()
            .scan(&LocalStorage::new(), &root)
            .await
            .unwrap();

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get("link.txt").is_none());
    }

    #[tokio::test]
    async fn test_scan_memory_storage() {
        let remote = MemoryStorage::new();
        let at = DateTime::from_timestamp(1_000, 0).unwrap();
        remote.put("/srv/data/a.txt", b"0123456789", at);
        remote.put("/srv/data/x/y/z.bin", b"zz", at);
        remote.put("/srv/other.txt", b"outside", at);

        let snapshot = FileScanner::new().scan(&remote, "/srv/data").await.unwrap();

        assert_eq!(snapshot.len(), 2);
        let record = snapshot.get("a.txt").unwrap();
        assert_eq!(record.size, 10);
        assert_eq!(record.modified, at);
        assert!(snapshot.get("x/y/z.bin").is_some());
    }

    #[tokio::test]
    async fn test_scan_fails_fast_on_entry_error() {
        let remote = MemoryStorage::new();
        let at = DateTime::from_timestamp(1_000, 0).unwrap();
        remote.put("/srv/a.txt", b"a", at);
        remote.put("/srv/b.txt", b"b", at);
        remote.break_walk_at("/srv/b.txt");

        let err = FileScanner::new().scan(&remote, "/srv").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::Snapshot { .. })
        ));
    }

    #[tokio::test]
    async fn test_scan_missing_root_fails() {
        let dir = TempDir::new().unwrap();
        let root = format!("{}/missing", normalize_path(dir.path().to_str().unwrap()));

        assert!(FileScanner::new()
            .scan(&LocalStorage::new(), &root)
            .await
            .is_err());
    }
}
