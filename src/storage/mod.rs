pub mod local;
#[cfg(test)]
pub mod memory;
pub mod sftp;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::SyncError;

pub use local::LocalStorage;
pub use sftp::SftpStorage;

/// 打开的只读文件
#[async_trait]
pub trait ReadHandle: AsyncRead + Send + Unpin {
    /// 显式关闭句柄，远程句柄的关闭失败在这里报告
    async fn close(&mut self) -> io::Result<()>;
}

/// 读取流
pub type BoxReader = Box<dyn ReadHandle>;
/// 写入流
pub type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// 遍历得到的条目
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// 完整路径（统一使用 /）
    pub path: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub is_dir: bool,
    /// 是否为普通文件（符号链接等特殊条目为 false）
    pub is_file: bool,
}

/// 目录树访问接口
///
/// 本地文件系统和 SFTP 远程文件系统都实现此接口，
/// 扫描、比较和传输逻辑只依赖它，与方向无关。
/// 所有路径都是完整路径，由调用方负责拼接根目录。
#[async_trait]
pub trait Storage: Send + Sync {
    /// 递归遍历 root，根目录本身作为第一个条目返回
    ///
    /// 任意条目出错都会使整个遍历失败。
    async fn walk(&self, root: &str) -> Result<Vec<FileInfo>>;

    /// 以只读方式打开文件
    async fn open_read(&self, path: &str) -> Result<BoxReader>;

    /// 以只写方式打开文件：不存在则创建，存在则截断
    async fn open_write(&self, path: &str) -> Result<BoxWriter>;

    /// 递归创建目录，已存在时不做任何事
    async fn create_dir_all(&self, path: &str) -> Result<()>;

    /// 设置访问时间和修改时间
    async fn set_times(&self, path: &str, modified: DateTime<Utc>) -> Result<()>;

    /// 获取存储名称（用于日志）
    fn name(&self) -> &str;
}

/// 规范化路径分隔符（统一使用 /）
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// 拼接根目录和相对路径
pub fn join_path(root: &str, relative: &str) -> String {
    let root = normalize_path(root);
    let relative = relative.trim_start_matches('/');
    if relative.is_empty() {
        return root;
    }
    format!("{}/{}", root.trim_end_matches('/'), relative)
}

/// 从完整路径中去掉根目录前缀（根目录长度 + 一个分隔符）
pub fn relative_path(root: &str, full: &str) -> Result<String> {
    let root = normalize_path(root);
    let full = normalize_path(full);
    let prefix = root.trim_end_matches('/');

    full.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|rest| !rest.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            SyncError::InvalidPath {
                root: root.clone(),
                path: full.clone(),
            }
            .into()
        })
}

/// 父目录路径，没有父目录时返回 None
pub fn parent_path(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&trimmed[..idx]),
        None => None,
    }
}
