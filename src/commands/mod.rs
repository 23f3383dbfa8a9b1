//! 命令行命令
//!
//! 命令表在入口处解析一次，然后由 [`dispatch`] 分发给对应的实现。

pub mod list;
pub mod sync;

use crate::config::{ConnectionConfig, ConnectionOverrides};
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "sinker")]
#[command(version)]
#[command(about = "One-way directory sync between a local tree and an SFTP server")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// 所有命令共用的连接参数
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Target machine
    #[arg(long, global = true, env = "SINKER_HOST")]
    pub host: Option<String>,

    /// SSH port
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Login identity
    #[arg(short, long, global = true, env = "SINKER_USER")]
    pub user: Option<String>,

    /// Private key file
    #[arg(short, long, global = true, env = "SINKER_KEY")]
    pub key: Option<PathBuf>,

    /// Config file (defaults to config.json in the config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    pub fn overrides(&self) -> ConnectionOverrides {
        ConnectionOverrides {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            key: self.key.clone(),
        }
    }
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Commands {
    /// Print every path under a remote directory
    #[command(alias = "l")]
    List {
        /// Remote directory
        dir: String,
    },

    /// Copy new and changed files from the remote directory to a local one
    SyncToLocal {
        /// Remote source directory
        remote_dir: String,

        /// Local target directory
        local_dir: String,
    },

    /// Copy new and changed files from a local directory to the remote one
    SyncToRemote {
        /// Local source directory
        local_dir: String,

        /// Remote target directory
        remote_dir: String,
    },
}

/// 执行一个命令
pub async fn dispatch(command: Commands, connection: &ConnectionConfig) -> Result<()> {
    match command {
        Commands::List { dir } => list::list(connection, &dir).await,
        Commands::SyncToLocal {
            remote_dir,
            local_dir,
        } => sync::sync_to_local(connection, &remote_dir, &local_dir).await,
        Commands::SyncToRemote {
            local_dir,
            remote_dir,
        } => sync::sync_to_remote(connection, &local_dir, &remote_dir).await,
    }
}
