//! 日志模块 - 提供文件日志和大小管理功能

use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

/// 日志文件名
pub const LOG_FILE: &str = "sinker.log";

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfig {
    /// 是否启用文件日志
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 最大日志文件大小（MB）
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u32,
    /// 日志级别: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_enabled() -> bool {
    true
}

fn default_max_size_mb() -> u32 {
    5 // 默认 5MB
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_size_mb: default_max_size_mb(),
            level: default_level(),
        }
    }
}

impl LogConfig {
    /// 从配置文件的 "log" 段加载，任何错误都回退到默认值
    ///
    /// 日志系统在配置错误时也必须能初始化，错误会在之后加载连接配置时报告。
    pub fn load(config_file: &Path) -> Self {
        fs::read_to_string(config_file)
            .ok()
            .and_then(|content| serde_json::from_str::<serde_json::Value>(&content).ok())
            .and_then(|config| config.get("log").cloned())
            .and_then(|log| serde_json::from_value::<LogConfig>(log).ok())
            .unwrap_or_default()
    }

    /// 将配置的日志级别转换为 tracing Level
    pub fn tracing_level(&self) -> tracing::Level {
        match self.level.to_lowercase().as_str() {
            "error" => tracing::Level::ERROR,
            "warn" => tracing::Level::WARN,
            "debug" => tracing::Level::DEBUG,
            "trace" => tracing::Level::TRACE,
            _ => tracing::Level::INFO,
        }
    }
}

/// 带大小限制的日志写入器
///
/// 超过上限时把当前文件改名为 `sinker.log.old` 并重新开始。
pub struct SizeRotatingWriter {
    file_path: PathBuf,
    max_size: u64,
    written: u64,
    writer: Option<BufWriter<File>>,
}

impl SizeRotatingWriter {
    pub fn new(log_dir: &Path, max_size_mb: u32) -> io::Result<Self> {
        Self::with_limit(log_dir, u64::from(max_size_mb) * 1024 * 1024)
    }

    fn with_limit(log_dir: &Path, max_size: u64) -> io::Result<Self> {
        fs::create_dir_all(log_dir)?;

        let file_path = log_dir.join(LOG_FILE);
        let (writer, written) = Self::open_file(&file_path, max_size)?;

        Ok(Self {
            file_path,
            max_size,
            written,
            writer: Some(writer),
        })
    }

    fn open_file(file_path: &Path, max_size: u64) -> io::Result<(BufWriter<File>, u64)> {
        // 检查现有文件大小，如果超过限制则轮转
        let existing = fs::metadata(file_path).map(|m| m.len()).unwrap_or(0);
        let existing = if existing > max_size {
            Self::rotate_log(file_path)?;
            0
        } else {
            existing
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;

        Ok((BufWriter::new(file), existing))
    }

    /// 轮转日志文件
    fn rotate_log(file_path: &Path) -> io::Result<()> {
        let backup_path = file_path.with_extension("log.old");

        if backup_path.exists() {
            fs::remove_file(&backup_path)?;
        }

        fs::rename(file_path, &backup_path)
    }

    fn rotate(&mut self) -> io::Result<()> {
        if let Some(mut w) = self.writer.take() {
            let _ = w.flush();
        }

        Self::rotate_log(&self.file_path)?;

        let (writer, written) = Self::open_file(&self.file_path, self.max_size)?;
        self.writer = Some(writer);
        self.written = written;
        Ok(())
    }
}

impl Write for SizeRotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_size {
            self.rotate()?;
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "Writer not available"))?;
        writer.write_all(buf)?;
        writer.flush()?;
        self.written += buf.len() as u64;

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

/// 日志目录
pub fn get_log_dir(config_dir: &Path) -> PathBuf {
    config_dir.join("logs")
}

/// 装配好的 subscriber
pub type BoxSubscriber = Box<dyn Subscriber + Send + Sync>;

fn env_filter(config: &LogConfig, verbose: bool) -> EnvFilter {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        config.tracing_level()
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["russh=warn", "russh_sftp=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// 控制台层，写 stderr（stdout 只留给命令结果）
fn console_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
}

/// 文件 + 控制台
///
/// 返回的 guard 必须存活到进程结束，否则缓冲中的日志会丢失。
pub fn file_subscriber(
    config: &LogConfig,
    log_dir: &Path,
    verbose: bool,
) -> io::Result<(BoxSubscriber, WorkerGuard)> {
    let file_writer = SizeRotatingWriter::new(log_dir, config.max_size_mb)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_writer);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter(config, verbose))
        .with(file_layer)
        .with(console_layer());

    Ok((Box::new(subscriber), guard))
}

/// 只输出到控制台
pub fn console_subscriber(config: &LogConfig, verbose: bool) -> BoxSubscriber {
    Box::new(
        tracing_subscriber::registry()
            .with(env_filter(config, verbose))
            .with(console_layer()),
    )
}

/// 初始化全局日志
pub fn init(config_file: &Path, log_dir: &Path, verbose: bool) -> Option<WorkerGuard> {
    let config = LogConfig::load(config_file);

    if !config.enabled {
        // 日志已禁用，只初始化一个空的 subscriber
        let _ = tracing::subscriber::set_global_default(tracing_subscriber::registry());
        return None;
    }

    match file_subscriber(&config, log_dir, verbose) {
        Ok((subscriber, guard)) => {
            let _ = tracing::subscriber::set_global_default(subscriber);
            Some(guard)
        }
        Err(e) => {
            // 文件日志创建失败，回退到控制台
            let _ = tracing::subscriber::set_global_default(console_subscriber(&config, verbose));
            tracing::warn!("无法创建日志文件 {}: {}", log_dir.display(), e);
            None
        }
    }
}
