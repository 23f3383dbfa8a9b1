pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod models;
pub mod storage;

pub use config::ConnectionConfig;
pub use crate::core::{sync_to_local, sync_to_remote, SyncEngine};
pub use error::SyncError;
pub use models::{SyncDirection, SyncEvent, SyncReport, SyncStatus};
