// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod repository;
pub mod utils;

pub use config::{BackendConfig, Config, DiffMode, RegistryConfig, ScanSettings, SyncConfig};
pub use error::{Result, TrackError};
pub use models::{
    ChangeSet, CycleStage, MarkerHit, RecordReport, RegistryRecord, RunSummary, ScanReport,
    SyncOutcome,
};
pub use pipeline::{FullScan, ProgressTracker, SyncOrchestrator};
pub use registry::{RegistryLock, RegistryStore};
pub use repository::{
    CancelToken, ChangeSetResolver, DiffEntry, Git2Backend, MarkerScanner, VcsBackend,
};
pub use utils::{OperationTimer, Validator};
