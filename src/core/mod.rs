pub mod comparator;
pub mod engine;
pub mod scanner;
pub mod snapshot;
pub mod transfer;

pub use comparator::{ActionSummary, FileComparator, FileRelation};
pub use engine::{sync_to_local, sync_to_remote, SyncEngine};
pub use scanner::FileScanner;
pub use snapshot::{FileRecord, Snapshot};
pub use transfer::{transfer_file, Endpoint, TransferOutcome};
