//! 快照：某一时刻目录树中所有普通文件的元数据

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// 单个普通文件的记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// 相对根目录的路径（使用 /）
    pub path: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

impl FileRecord {
    /// 截断到整秒的修改时间
    pub fn modified_secs(&self) -> i64 {
        self.modified.timestamp()
    }
}

/// 相对路径 -> 文件记录，构建后不再修改
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    files: BTreeMap<String, FileRecord>,
}

impl Snapshot {
    pub fn from_records(records: impl IntoIterator<Item = FileRecord>) -> Self {
        let files = records
            .into_iter()
            .map(|r| (r.path.clone(), r))
            .collect();
        Self { files }
    }

    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.files.get(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// 按路径排序遍历
    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.values()
    }

    pub fn total_size(&self) -> u64 {
        self.files.values().map(|r| r.size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modified_secs_truncates() {
        let record = FileRecord {
            path: "a.txt".to_string(),
            size: 1,
            modified: DateTime::from_timestamp(100, 999_999_999).unwrap(),
        };
        assert_eq!(record.modified_secs(), 100);
    }

    #[test]
    fn test_iter_is_sorted_by_path() {
        let at = DateTime::from_timestamp(0, 0).unwrap();
        let snapshot = Snapshot::from_records(["b/x", "a", "b/a"].map(|p| FileRecord {
            path: p.to_string(),
            size: 2,
            modified: at,
        }));

        let paths: Vec<_> = snapshot.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "b/a", "b/x"]);
        assert_eq!(snapshot.total_size(), 6);
    }
}
