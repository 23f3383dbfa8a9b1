use super::{normalize_path, BoxReader, BoxWriter, FileInfo, ReadHandle, Storage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use filetime::FileTime;
use std::io;
use tokio::fs;
use walkdir::WalkDir;

/// 本地文件系统
pub struct LocalStorage {
    name: String,
}

impl LocalStorage {
    pub fn new() -> Self {
        Self {
            name: "local".to_string(),
        }
    }
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn walk_blocking(root: &str) -> Result<Vec<FileInfo>> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.with_context(|| format!("遍历 {} 失败", root))?;
        let metadata = entry
            .metadata()
            .with_context(|| format!("读取元数据失败: {}", entry.path().display()))?;

        let path = entry
            .path()
            .to_str()
            .with_context(|| format!("路径不是有效的 UTF-8: {}", entry.path().display()))?;

        let modified = metadata
            .modified()
            .with_context(|| format!("读取修改时间失败: {}", path))?;

        entries.push(FileInfo {
            path: normalize_path(path),
            size: if metadata.is_dir() { 0 } else { metadata.len() },
            modified: DateTime::<Utc>::from(modified),
            is_dir: metadata.is_dir(),
            is_file: metadata.is_file(),
        });
    }

    Ok(entries)
}

#[async_trait]
impl ReadHandle for fs::File {
    // 只读句柄在 drop 时关闭，没有需要报告的错误
    async fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn walk(&self, root: &str) -> Result<Vec<FileInfo>> {
        let root = root.to_string();

        // 使用 spawn_blocking 避免阻塞 async runtime
        tokio::task::spawn_blocking(move || walk_blocking(&root)).await?
    }

    async fn open_read(&self, path: &str) -> Result<BoxReader> {
        let file = fs::File::open(path)
            .await
            .with_context(|| format!("无法打开本地文件: {}", path))?;
        Ok(Box::new(file))
    }

    async fn open_write(&self, path: &str) -> Result<BoxWriter> {
        let file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .await
            .with_context(|| format!("无法创建本地文件: {}", path))?;
        Ok(Box::new(file))
    }

    async fn create_dir_all(&self, path: &str) -> Result<()> {
        fs::create_dir_all(path)
            .await
            .with_context(|| format!("无法创建本地目录: {}", path))?;
        Ok(())
    }

    async fn set_times(&self, path: &str, modified: DateTime<Utc>) -> Result<()> {
        let path = path.to_string();
        let time = FileTime::from_unix_time(modified.timestamp(), modified.timestamp_subsec_nanos());

        tokio::task::spawn_blocking(move || filetime::set_file_times(&path, time, time))
            .await??;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
