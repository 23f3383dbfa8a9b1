use crate::core::snapshot::{FileRecord, Snapshot};
use tracing::debug;

/// 文件比较结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRelation {
    /// 目标中不存在
    Missing,
    /// 大小不同
    Different,
    /// 目标的修改时间（整秒）早于源
    SourceNewer,
    /// 大小相同且整秒时间相同
    Equal,
    /// 大小相同但目标更新，不覆盖
    TargetNewer,
}

impl FileRelation {
    pub fn needs_sync(self) -> bool {
        matches!(
            self,
            FileRelation::Missing | FileRelation::Different | FileRelation::SourceNewer
        )
    }
}

/// 文件比较器
///
/// 只看源快照中的路径，目标独有的文件永远不会被处理。
/// 比较基于大小和整秒修改时间，不比较内容。
#[derive(Debug, Default)]
pub struct FileComparator;

impl FileComparator {
    pub fn new() -> Self {
        Self
    }

    /// 比较源文件和目标文件
    pub fn compare_files(&self, source: &FileRecord, target: Option<&FileRecord>) -> FileRelation {
        let Some(target) = target else {
            return FileRelation::Missing;
        };

        if target.size != source.size {
            debug!(
                "文件大小不同: {} (src={}, dst={})",
                source.path, source.size, target.size
            );
            return FileRelation::Different;
        }

        let (src_time, dst_time) = (source.modified_secs(), target.modified_secs());
        if dst_time < src_time {
            debug!(
                "目标文件较旧: {} (src_time={}, dst_time={})",
                source.path, src_time, dst_time
            );
            FileRelation::SourceNewer
        } else if dst_time > src_time {
            FileRelation::TargetNewer
        } else {
            FileRelation::Equal
        }
    }

    /// 选出需要传输的相对路径，按路径排序
    pub fn select_for_sync(&self, source: &Snapshot, target: &Snapshot) -> Vec<String> {
        source
            .iter()
            .filter(|record| {
                self.compare_files(record, target.get(&record.path))
                    .needs_sync()
            })
            .map(|record| record.path.clone())
            .collect()
    }

    /// 统计待传输的文件
    pub fn summarize(source: &Snapshot, selected: &[String]) -> ActionSummary {
        let copy_bytes = selected
            .iter()
            .filter_map(|path| source.get(path))
            .map(|record| record.size)
            .sum();

        ActionSummary {
            copy_count: selected.len(),
            copy_bytes,
            skip_count: source.len().saturating_sub(selected.len()),
        }
    }
}

/// 动作统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionSummary {
    pub copy_count: usize,
    pub copy_bytes: u64,
    pub skip_count: usize,
}
