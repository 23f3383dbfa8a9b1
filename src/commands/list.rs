use crate::config::ConnectionConfig;
use crate::error::SyncError;
use crate::storage::{normalize_path, FileInfo, SftpStorage, Storage};
use anyhow::Result;
use std::io::{self, Write};
use tracing::{info, warn};

/// 每行输出一个完整路径
pub fn write_entries<W: Write>(mut out: W, entries: &[FileInfo]) -> io::Result<()> {
    for entry in entries {
        writeln!(out, "{}", entry.path)?;
    }
    out.flush()
}

/// 列出远程目录下的所有路径（根目录在最前）
pub async fn list(connection: &ConnectionConfig, dir: &str) -> Result<()> {
    let remote = SftpStorage::connect(connection).await?;
    let root = normalize_path(dir);

    let result = remote.walk(&root).await.map_err(|e| {
        anyhow::Error::from(SyncError::Snapshot {
            root: root.clone(),
            reason: format!("{:#}", e),
        })
    });

    if let Err(e) = remote.close().await {
        warn!("关闭连接失败: {:#}", e);
    }

    let entries = result?;
    write_entries(io::stdout().lock(), &entries)?;
    info!("共 {} 个条目", entries.len());

    Ok(())
}
