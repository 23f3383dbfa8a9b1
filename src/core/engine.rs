use crate::core::comparator::FileComparator;
use crate::core::scanner::FileScanner;
use crate::core::transfer::{transfer_file, Endpoint};
use crate::error::SyncError;
use crate::models::{SyncDirection, SyncEvent, SyncReport, SyncStatus};
use crate::storage::Storage;
use anyhow::Result;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// 同步引擎
///
/// 单向、顺序执行：扫描两端 -> 比较 -> 逐个传输。
/// 遇到第一个致命错误立即停止，已传输的文件保留。
pub struct SyncEngine {
    direction: SyncDirection,
    scanner: FileScanner,
    comparator: FileComparator,
}

impl SyncEngine {
    pub fn new(direction: SyncDirection) -> Self {
        Self {
            direction,
            scanner: FileScanner::new(),
            comparator: FileComparator::new(),
        }
    }

    /// 运行一次同步
    pub async fn run(
        &self,
        source: Endpoint<'_>,
        target: Endpoint<'_>,
        progress_tx: Option<mpsc::Sender<SyncEvent>>,
    ) -> Result<SyncReport> {
        info!(
            "开始同步 ({}): {}:{} -> {}:{}",
            self.direction,
            source.storage.name(),
            source.root,
            target.storage.name(),
            target.root
        );

        match self.execute(source, target, &progress_tx).await {
            Ok(report) => {
                self.send_progress(&progress_tx, SyncEvent::StatusChanged(SyncStatus::Completed))
                    .await;
                info!(
                    "同步完成: 扫描 {}, 传输 {}/{}, {} 字节, {} 个警告, 耗时 {}ms",
                    report.files_scanned,
                    report.transferred.len(),
                    report.files_to_sync,
                    report.bytes_transferred,
                    report.warnings,
                    report.duration_ms
                );
                if let Ok(json) = serde_json::to_string(&report) {
                    debug!("同步报告: {}", json);
                }
                Ok(report)
            }
            Err(e) => {
                // 错误由调用方统一报告
                self.send_progress(&progress_tx, SyncEvent::StatusChanged(SyncStatus::Failed))
                    .await;
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        source: Endpoint<'_>,
        target: Endpoint<'_>,
        progress_tx: &Option<mpsc::Sender<SyncEvent>>,
    ) -> Result<SyncReport> {
        let start = Instant::now();

        // 目标根目录必须先存在，否则无法扫描
        target
            .storage
            .create_dir_all(target.root)
            .await
            .map_err(|e| SyncError::Transfer {
                path: target.root.to_string(),
                reason: format!("无法创建目标根目录: {:#}", e),
            })?;

        self.send_progress(progress_tx, SyncEvent::StatusChanged(SyncStatus::Scanning))
            .await;
        let source_snapshot = self.scanner.scan(source.storage, source.root).await?;
        let target_snapshot = self.scanner.scan(target.storage, target.root).await?;
        if source_snapshot.is_empty() {
            warn!("源目录中没有文件: {}", source.root);
        }

        self.send_progress(progress_tx, SyncEvent::StatusChanged(SyncStatus::Comparing))
            .await;
        let selected = self
            .comparator
            .select_for_sync(&source_snapshot, &target_snapshot);
        let summary = FileComparator::summarize(&source_snapshot, &selected);
        info!(
            "比较完成: 需要传输 {} 个文件 ({} 字节), 跳过 {}",
            summary.copy_count, summary.copy_bytes, summary.skip_count
        );

        let total = selected.len();
        let mut transferred = Vec::with_capacity(total);
        let mut bytes_transferred = 0u64;
        let mut warnings = 0usize;

        for (index, path) in selected.iter().enumerate() {
            // 选中的路径一定来自源快照
            let Some(record) = source_snapshot.get(path) else {
                continue;
            };

            self.send_progress(
                progress_tx,
                SyncEvent::StatusChanged(SyncStatus::Syncing { index, total }),
            )
            .await;

            let outcome = transfer_file(path, record, source, target).await?;
            bytes_transferred += outcome.bytes;
            warnings += outcome.warnings;
            debug!("[{}/{}] 已传输: {}", index + 1, total, path);

            self.send_progress(
                progress_tx,
                SyncEvent::Transferred {
                    path: path.clone(),
                    size: outcome.bytes,
                },
            )
            .await;
            transferred.push(path.clone());
        }

        Ok(SyncReport {
            direction: self.direction,
            files_scanned: source_snapshot.len(),
            files_to_sync: total,
            transferred,
            bytes_transferred,
            warnings,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// 发送进度更新
    async fn send_progress(&self, tx: &Option<mpsc::Sender<SyncEvent>>, event: SyncEvent) {
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }
}

/// 本地 -> 远程
pub async fn sync_to_remote(
    local: &dyn Storage,
    local_root: &str,
    remote: &dyn Storage,
    remote_root: &str,
    progress_tx: Option<mpsc::Sender<SyncEvent>>,
) -> Result<SyncReport> {
    SyncEngine::new(SyncDirection::ToRemote)
        .run(
            Endpoint::new(local, local_root),
            Endpoint::new(remote, remote_root),
            progress_tx,
        )
        .await
}

/// 远程 -> 本地
pub async fn sync_to_local(
    remote: &dyn Storage,
    remote_root: &str,
    local: &dyn Storage,
    local_root: &str,
    progress_tx: Option<mpsc::Sender<SyncEvent>>,
) -> Result<SyncReport> {
    SyncEngine::new(SyncDirection::ToLocal)
        .run(
            Endpoint::new(remote, remote_root),
            Endpoint::new(local, local_root),
            progress_tx,
        )
        .await
}
