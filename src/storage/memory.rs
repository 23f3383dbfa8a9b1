//! 内存存储，测试中充当远程端

use super::{parent_path, BoxReader, BoxWriter, FileInfo, ReadHandle, Storage};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

#[derive(Debug, Clone)]
pub struct MemFile {
    pub data: Vec<u8>,
    pub modified: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    files: BTreeMap<String, MemFile>,
    dirs: BTreeSet<String>,
    dirs_created: usize,
    /// 读取时只返回前 n 个字节
    short_reads: HashMap<String, usize>,
    /// 打开读取时失败
    broken_reads: HashSet<String>,
    /// 关闭读取句柄时失败
    broken_closes: HashSet<String>,
    /// 遍历到该路径时失败
    broken_walk: Option<String>,
    fail_set_times: bool,
}

/// 内存中的目录树
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入文件并补齐父目录
    pub fn put(&self, path: &str, data: &[u8], modified: DateTime<Utc>) {
        let mut inner = self.inner.lock().unwrap();
        let mut dir = parent_path(path);
        while let Some(d) = dir {
            inner.dirs.insert(d.to_string());
            dir = parent_path(d);
        }
        inner.files.insert(
            path.to_string(),
            MemFile {
                data: data.to_vec(),
                modified,
            },
        );
    }

    pub fn get(&self, path: &str) -> Option<MemFile> {
        self.inner.lock().unwrap().files.get(path).cloned()
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.inner.lock().unwrap().dirs.contains(path)
    }

    pub fn dirs_created(&self) -> usize {
        self.inner.lock().unwrap().dirs_created
    }

    pub fn short_read(&self, path: &str, len: usize) {
        self.inner
            .lock()
            .unwrap()
            .short_reads
            .insert(path.to_string(), len);
    }

    pub fn break_read(&self, path: &str) {
        self.inner
            .lock()
            .unwrap()
            .broken_reads
            .insert(path.to_string());
    }

    pub fn break_close(&self, path: &str) {
        self.inner
            .lock()
            .unwrap()
            .broken_closes
            .insert(path.to_string());
    }

    pub fn break_walk_at(&self, path: &str) {
        self.inner.lock().unwrap().broken_walk = Some(path.to_string());
    }

    pub fn fail_set_times(&self) {
        self.inner.lock().unwrap().fail_set_times = true;
    }
}

fn is_under(root: &str, path: &str) -> bool {
    let prefix = root.trim_end_matches('/');
    path.strip_prefix(prefix)
        .map(|rest| rest.starts_with('/'))
        .unwrap_or(false)
}

/// 打开时读出的内容快照
struct MemReader {
    data: io::Cursor<Vec<u8>>,
    fail_close: bool,
}

impl AsyncRead for MemReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.data).poll_read(cx, buf)
    }
}

#[async_trait]
impl ReadHandle for MemReader {
    async fn close(&mut self) -> io::Result<()> {
        if self.fail_close {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "关闭句柄失败"));
        }
        Ok(())
    }
}

/// 边写边提交到共享状态的写入器
struct MemWriter {
    path: String,
    inner: Arc<Mutex<Inner>>,
}

impl AsyncWrite for MemWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut inner = self.inner.lock().unwrap();
        match inner.files.get_mut(&self.path) {
            Some(file) => {
                file.data.extend_from_slice(buf);
                Poll::Ready(Ok(buf.len()))
            }
            None => Poll::Ready(Err(io::Error::new(io::ErrorKind::NotFound, "文件已不存在"))),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn walk(&self, root: &str) -> Result<Vec<FileInfo>> {
        let inner = self.inner.lock().unwrap();
        let root = root.trim_end_matches('/').to_string();
        if !inner.dirs.contains(&root) {
            return Err(anyhow!("目录不存在: {}", root));
        }

        let mut entries = vec![FileInfo {
            path: root.clone(),
            size: 0,
            modified: DateTime::<Utc>::UNIX_EPOCH,
            is_dir: true,
            is_file: false,
        }];

        for dir in inner.dirs.iter().filter(|d| is_under(&root, d)) {
            entries.push(FileInfo {
                path: dir.clone(),
                size: 0,
                modified: DateTime::<Utc>::UNIX_EPOCH,
                is_dir: true,
                is_file: false,
            });
        }

        for (path, file) in inner.files.iter().filter(|(p, _)| is_under(&root, p)) {
            if inner.broken_walk.as_deref() == Some(path.as_str()) {
                return Err(anyhow!("stat 失败: {}", path));
            }
            entries.push(FileInfo {
                path: path.clone(),
                size: file.data.len() as u64,
                modified: file.modified,
                is_dir: false,
                is_file: true,
            });
        }

        Ok(entries)
    }

    async fn open_read(&self, path: &str) -> Result<BoxReader> {
        let inner = self.inner.lock().unwrap();
        if inner.broken_reads.contains(path) {
            return Err(anyhow!("无法打开: {}", path));
        }
        let file = inner
            .files
            .get(path)
            .ok_or_else(|| anyhow!("文件不存在: {}", path))?;

        let mut data = file.data.clone();
        if let Some(len) = inner.short_reads.get(path) {
            data.truncate(*len);
        }
        Ok(Box::new(MemReader {
            data: io::Cursor::new(data),
            fail_close: inner.broken_closes.contains(path),
        }))
    }

    async fn open_write(&self, path: &str) -> Result<BoxWriter> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(parent) = parent_path(path) {
            if !inner.dirs.contains(parent) {
                return Err(anyhow!("父目录不存在: {}", parent));
            }
        }
        let modified = Utc::now();
        inner.files.insert(
            path.to_string(),
            MemFile {
                data: Vec::new(),
                modified,
            },
        );
        Ok(Box::new(MemWriter {
            path: path.to_string(),
            inner: self.inner.clone(),
        }))
    }

    async fn create_dir_all(&self, path: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let mut dir = Some(path.trim_end_matches('/'));
        while let Some(d) = dir.filter(|d| !d.is_empty()) {
            if inner.dirs.insert(d.to_string()) {
                inner.dirs_created += 1;
            }
            dir = parent_path(d);
        }
        Ok(())
    }

    async fn set_times(&self, path: &str, modified: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_set_times {
            return Err(anyhow!("不支持设置时间: {}", path));
        }
        let file = inner
            .files
            .get_mut(path)
            .ok_or_else(|| anyhow!("文件不存在: {}", path))?;
        file.modified = modified;
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
