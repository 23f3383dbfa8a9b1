use serde::Serialize;
use std::fmt;

/// 同步方向
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SyncDirection {
    /// 本地 -> 远程
    ToRemote,
    /// 远程 -> 本地
    ToLocal,
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncDirection::ToRemote => write!(f, "local -> remote"),
            SyncDirection::ToLocal => write!(f, "remote -> local"),
        }
    }
}

/// 同步状态
///
/// `Scanning -> Comparing -> Syncing(i) -> ... -> Completed`，
/// 任何状态出错都进入 `Failed`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Scanning,
    Comparing,
    Syncing { index: usize, total: usize },
    Completed,
    Failed,
}

/// 同步过程中发出的通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    StatusChanged(SyncStatus),
    /// 文件已完整传输（内容校验通过）
    Transferred { path: String, size: u64 },
}

/// 同步报告
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub direction: SyncDirection,
    pub files_scanned: usize,
    pub files_to_sync: usize,
    /// 按传输顺序排列的相对路径
    pub transferred: Vec<String>,
    pub bytes_transferred: u64,
    /// 非致命问题数量（时间戳设置失败、关闭流失败）
    pub warnings: usize,
    pub duration_ms: u64,
}
