use crate::config::ConnectionConfig;
use crate::models::{SyncEvent, SyncReport};
use crate::storage::{normalize_path, LocalStorage, SftpStorage};
use anyhow::Result;
use std::io::{self, Write};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

/// 按传输顺序每行输出一个相对路径，返回输出的行数
pub async fn print_transferred<W: Write>(
    mut rx: mpsc::Receiver<SyncEvent>,
    mut out: W,
) -> io::Result<usize> {
    let mut printed = 0;
    while let Some(event) = rx.recv().await {
        if let SyncEvent::Transferred { path, .. } = event {
            writeln!(out, "{}", path)?;
            out.flush()?;
            printed += 1;
        }
    }
    Ok(printed)
}

fn spawn_printer() -> (mpsc::Sender<SyncEvent>, JoinHandle<io::Result<usize>>) {
    let (tx, rx) = mpsc::channel::<SyncEvent>(100);
    let handle = tokio::spawn(print_transferred(rx, io::stdout()));
    (tx, handle)
}

async fn finish(
    remote: SftpStorage,
    printer: JoinHandle<io::Result<usize>>,
    result: Result<SyncReport>,
) -> Result<()> {
    match printer.await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => warn!("写入标准输出失败: {}", e),
        Err(e) => warn!("输出任务异常退出: {}", e),
    }
    if let Err(e) = remote.close().await {
        warn!("关闭连接失败: {:#}", e);
    }
    result.map(|_| ())
}

/// 远程 -> 本地
pub async fn sync_to_local(
    connection: &ConnectionConfig,
    remote_dir: &str,
    local_dir: &str,
) -> Result<()> {
    let remote = SftpStorage::connect(connection).await?;
    let local = LocalStorage::new();
    let (tx, printer) = spawn_printer();

    let result = crate::core::sync_to_local(
        &remote,
        &normalize_path(remote_dir),
        &local,
        &normalize_path(local_dir),
        Some(tx),
    )
    .await;

    finish(remote, printer, result).await
}

/// 本地 -> 远程
pub async fn sync_to_remote(
    connection: &ConnectionConfig,
    local_dir: &str,
    remote_dir: &str,
) -> Result<()> {
    let remote = SftpStorage::connect(connection).await?;
    let local = LocalStorage::new();
    let (tx, printer) = spawn_printer();

    let result = crate::core::sync_to_remote(
        &local,
        &normalize_path(local_dir),
        &remote,
        &normalize_path(remote_dir),
        Some(tx),
    )
    .await;

    finish(remote, printer, result).await
}
