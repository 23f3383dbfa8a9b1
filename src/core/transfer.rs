//! 单文件传输：建目录、流式复制、校验字节数、保留修改时间

use crate::core::snapshot::FileRecord;
use crate::error::SyncError;
use crate::storage::{join_path, parent_path, ReadHandle, Storage};
use anyhow::Result;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// 一端目录树：存储 + 根目录
#[derive(Clone, Copy)]
pub struct Endpoint<'a> {
    pub storage: &'a dyn Storage,
    pub root: &'a str,
}

impl<'a> Endpoint<'a> {
    pub fn new(storage: &'a dyn Storage, root: &'a str) -> Self {
        Self { storage, root }
    }

    pub fn full_path(&self, relative: &str) -> String {
        join_path(self.root, relative)
    }
}

/// 单个文件的传输结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferOutcome {
    pub bytes: u64,
    /// 非致命问题数量
    pub warnings: usize,
}

fn transfer_error(path: &str, e: anyhow::Error) -> anyhow::Error {
    SyncError::Transfer {
        path: path.to_string(),
        reason: format!("{:#}", e),
    }
    .into()
}

/// 把 relative 从 source 复制到 target
///
/// 目录创建、打开、复制失败以及字节数不一致都是致命错误；
/// 关闭源或目标句柄、设置时间失败只记录警告，文件仍视为已传输。
pub async fn transfer_file(
    relative: &str,
    record: &FileRecord,
    source: Endpoint<'_>,
    target: Endpoint<'_>,
) -> Result<TransferOutcome> {
    let source_path = source.full_path(relative);
    let target_path = target.full_path(relative);
    let mut outcome = TransferOutcome::default();

    debug!(
        "复制: {} -> {} ({}字节)",
        source_path, target_path, record.size
    );

    if let Some(parent) = parent_path(&target_path) {
        target
            .storage
            .create_dir_all(parent)
            .await
            .map_err(|e| transfer_error(relative, e))?;
    }

    let mut reader = source
        .storage
        .open_read(&source_path)
        .await
        .map_err(|e| transfer_error(relative, e))?;

    let mut writer = target
        .storage
        .open_write(&target_path)
        .await
        .map_err(|e| transfer_error(relative, e))?;

    let copied = tokio::io::copy(&mut reader, &mut writer)
        .await
        .map_err(|e| transfer_error(relative, e.into()))?;

    if copied != record.size {
        return Err(SyncError::Integrity {
            path: relative.to_string(),
            expected: record.size,
            actual: copied,
        }
        .into());
    }

    if let Err(e) = reader.close().await {
        warn!("关闭源文件失败: {}: {}", source_path, e);
        outcome.warnings += 1;
    }
    drop(reader);

    if let Err(e) = writer.shutdown().await {
        warn!("关闭目标文件失败: {}: {}", target_path, e);
        outcome.warnings += 1;
    }
    drop(writer);

    if let Err(e) = target
        .storage
        .set_times(&target_path, record.modified)
        .await
    {
        warn!("无法设置修改时间: {}: {:#}", target_path, e);
        outcome.warnings += 1;
    }

    outcome.bytes = copied;
    debug!("  写入完成: {}", target_path);

    Ok(outcome)
}
