//! 应用配置模块

use crate::error::SyncError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 配置文件名
pub const CONFIG_FILE: &str = "config.json";

/// 远程连接配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    /// 目标主机
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// 登录用户
    #[serde(default)]
    pub user: Option<String>,
    /// 私钥文件路径
    #[serde(default)]
    pub key: Option<PathBuf>,
    /// 连接超时（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    22
}

fn default_connect_timeout() -> u64 {
    30
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: None,
            key: None,
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// 命令行中给出的连接参数，优先级高于配置文件
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub key: Option<PathBuf>,
}

impl ConnectionConfig {
    /// 从配置文件的 "connection" 段加载，文件不存在时使用默认值
    pub fn load(config_file: &Path) -> Result<Self> {
        if !config_file.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_file)
            .with_context(|| format!("无法读取配置文件: {}", config_file.display()))?;
        let config: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("配置文件格式错误: {}", config_file.display()))?;

        match config.get("connection") {
            Some(section) => serde_json::from_value(section.clone())
                .with_context(|| format!("connection 配置无效: {}", config_file.display())),
            None => Ok(Self::default()),
        }
    }

    /// 用命令行参数覆盖
    pub fn merge(mut self, overrides: ConnectionOverrides) -> Self {
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if overrides.user.is_some() {
            self.user = overrides.user;
        }
        if overrides.key.is_some() {
            self.key = overrides.key;
        }
        self
    }

    pub fn user(&self) -> Result<&str, SyncError> {
        self.user
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or(SyncError::MissingOption("user"))
    }

    pub fn key(&self) -> Result<&Path, SyncError> {
        self.key
            .as_deref()
            .filter(|k| !k.as_os_str().is_empty())
            .ok_or(SyncError::MissingOption("key"))
    }
}

/// 获取配置目录
///
/// 优先使用 SINKER_CONFIG_DIR 环境变量。
pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("SINKER_CONFIG_DIR") {
        return PathBuf::from(dir);
    }

    dirs::config_dir()
        .map(|p| p.join("sinker"))
        .unwrap_or_else(|| PathBuf::from(".sinker"))
}

pub mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        if cfg!(target_os = "windows") {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        } else if cfg!(target_os = "macos") {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library").join("Application Support"))
        } else {
            // Linux
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".config"))
                })
        }
    }
}
