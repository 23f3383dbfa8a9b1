use super::{normalize_path, BoxReader, BoxWriter, FileInfo, ReadHandle, Storage};
use crate::config::ConnectionConfig;
use crate::error::SyncError;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use russh::client::{self, Handle};
use russh::keys::{load_secret_key, HashAlg, PrivateKeyWithHashAlg, PublicKey};
use russh::Disconnect;
use russh_sftp::client::fs::File;
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::{FileAttributes, OpenFlags};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// SSH 客户端回调
pub struct SshHandler;

impl client::Handler for SshHandler {
    type Error = anyhow::Error;

    // 不校验主机密钥，只记录指纹
    async fn check_server_key(&mut self, server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        debug!(
            "服务器主机密钥: {}",
            server_public_key.fingerprint(HashAlg::Sha256)
        );
        Ok(true)
    }
}

/// 通过 SFTP 访问的远程文件系统
pub struct SftpStorage {
    session: Handle<SshHandler>,
    sftp: SftpSession,
    name: String,
}

impl SftpStorage {
    /// 建立 SSH 连接并启动 sftp 子系统
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let user = config.user()?;
        let key_path = config.key()?;

        let auth_error = |reason: String| SyncError::Authentication {
            user: user.to_string(),
            reason,
        };
        let connection_error = |reason: String| SyncError::Connection {
            host: config.host.clone(),
            port: config.port,
            reason,
        };

        let key = load_secret_key(key_path, None)
            .map_err(|e| auth_error(format!("无法加载私钥 {}: {}", key_path.display(), e)))?;

        info!("连接 {}@{}:{}", user, config.host, config.port);

        let connect = client::connect(
            Arc::new(client::Config::default()),
            (config.host.as_str(), config.port),
            SshHandler,
        );
        let timeout = Duration::from_secs(config.connect_timeout_secs);

        let mut session = tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| connection_error(format!("{}秒内未完成握手", timeout.as_secs())))?
            .map_err(|e| connection_error(format!("{:#}", e)))?;

        let hash_alg = session
            .best_supported_rsa_hash()
            .await
            .map_err(|e| connection_error(format!("协商签名算法失败: {}", e)))?
            .flatten();
        let auth = session
            .authenticate_publickey(user, PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg))
            .await
            .map_err(|e| auth_error(e.to_string()))?;
        if !auth.success() {
            return Err(auth_error("服务器拒绝了该公钥".to_string()).into());
        }

        let channel = session
            .channel_open_session()
            .await
            .map_err(|e| connection_error(format!("无法打开会话通道: {}", e)))?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| connection_error(format!("无法请求 sftp 子系统: {}", e)))?;
        let sftp = SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| connection_error(format!("sftp 子系统初始化失败: {}", e)))?;

        debug!("SFTP 会话已建立");

        Ok(Self {
            session,
            sftp,
            name: format!("sftp://{}@{}:{}", user, config.host, config.port),
        })
    }

    /// 关闭 SFTP 会话并断开连接
    pub async fn close(self) -> Result<()> {
        self.sftp.close().await?;
        self.session
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }
}

fn to_file_info(path: String, attrs: &FileAttributes) -> FileInfo {
    let modified = attrs
        .mtime
        .and_then(|secs| DateTime::from_timestamp(i64::from(secs), 0))
        .unwrap_or_default();

    FileInfo {
        path,
        size: if attrs.is_dir() { 0 } else { attrs.size.unwrap_or(0) },
        modified,
        is_dir: attrs.is_dir(),
        is_file: attrs.is_regular(),
    }
}

fn child_path(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{}{}", dir, name)
    } else {
        format!("{}/{}", dir, name)
    }
}

/// 遍历和建目录用到的远程原语
#[async_trait]
trait RemoteOps: Send + Sync {
    async fn stat(&self, path: &str) -> Result<FileInfo>;

    /// 列出目录的直接子项（不含 `.` 和 `..`），顺序不保证
    async fn list(&self, dir: &str) -> Result<Vec<FileInfo>>;

    async fn mkdir(&self, path: &str) -> Result<()>;
}

#[async_trait]
impl RemoteOps for SftpSession {
    async fn stat(&self, path: &str) -> Result<FileInfo> {
        let attrs = self.metadata(path).await?;
        Ok(to_file_info(path.to_string(), &attrs))
    }

    async fn list(&self, dir: &str) -> Result<Vec<FileInfo>> {
        Ok(self
            .read_dir(dir)
            .await?
            .filter(|child| child.file_name() != "." && child.file_name() != "..")
            .map(|child| to_file_info(child_path(dir, &child.file_name()), &child.metadata()))
            .collect())
    }

    async fn mkdir(&self, path: &str) -> Result<()> {
        self.create_dir(path).await?;
        Ok(())
    }
}

/// 先序深度优先遍历，根目录在最前，同一目录内按名称排序
async fn walk_remote(ops: &dyn RemoteOps, root: &str) -> Result<Vec<FileInfo>> {
    let root_entry = ops
        .stat(root)
        .await
        .with_context(|| format!("无法读取远程目录: {}", root))?;

    let mut entries = Vec::new();
    let mut pending = vec![root_entry];

    while let Some(entry) = pending.pop() {
        if entry.is_dir {
            let mut children = ops
                .list(&entry.path)
                .await
                .with_context(|| format!("无法列出远程目录: {}", entry.path))?;
            children.sort_by(|a, b| b.path.cmp(&a.path));
            pending.extend(children);
        }
        entries.push(entry);
    }

    Ok(entries)
}

/// 逐级创建缺失的远程目录
async fn create_remote_dirs(ops: &dyn RemoteOps, path: &str) -> Result<()> {
    let path = normalize_path(path);
    let absolute = path.starts_with('/');
    let mut current = String::new();

    for part in path.split('/').filter(|p| !p.is_empty()) {
        current = match (current.is_empty(), absolute) {
            (true, true) => format!("/{}", part),
            (true, false) => part.to_string(),
            (false, _) => child_path(&current, part),
        };

        match ops.stat(&current).await {
            Ok(info) if info.is_dir => continue,
            Ok(_) => bail!("远程路径已存在且不是目录: {}", current),
            Err(_) => {}
        }

        match ops.mkdir(&current).await {
            Ok(()) => debug!("创建远程目录: {}", current),
            Err(e) => match ops.stat(&current).await {
                // 已被其他客户端创建
                Ok(info) if info.is_dir => debug!("远程目录已存在: {}", current),
                _ => return Err(e.context(format!("无法创建远程目录: {}", current))),
            },
        }
    }

    Ok(())
}

#[async_trait]
impl ReadHandle for File {
    // shutdown 会向服务器发送 close 请求
    async fn close(&mut self) -> io::Result<()> {
        self.shutdown().await
    }
}

#[async_trait]
impl Storage for SftpStorage {
    async fn walk(&self, root: &str) -> Result<Vec<FileInfo>> {
        walk_remote(&self.sftp, &normalize_path(root)).await
    }

    async fn open_read(&self, path: &str) -> Result<BoxReader> {
        let file = self
            .sftp
            .open(path)
            .await
            .with_context(|| format!("无法打开远程文件: {}", path))?;
        Ok(Box::new(file))
    }

    async fn open_write(&self, path: &str) -> Result<BoxWriter> {
        let file = self
            .sftp
            .open_with_flags(
                path,
                OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE,
            )
            .await
            .with_context(|| format!("无法创建远程文件: {}", path))?;
        Ok(Box::new(file))
    }

    async fn create_dir_all(&self, path: &str) -> Result<()> {
        create_remote_dirs(&self.sftp, path).await
    }

    async fn set_times(&self, path: &str, modified: DateTime<Utc>) -> Result<()> {
        let secs = u32::try_from(modified.timestamp())
            .with_context(|| format!("修改时间超出 SFTP 可表示范围: {}", modified))?;

        let attrs = FileAttributes {
            atime: Some(secs),
            mtime: Some(secs),
            ..FileAttributes::empty()
        };
        self.sftp
            .set_metadata(path, attrs)
            .await
            .with_context(|| format!("无法设置远程文件时间: {}", path))?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
