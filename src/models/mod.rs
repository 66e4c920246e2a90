// file: src/models/mod.rs
// description: data models module exports
// reference: internal module structure

pub mod record;
pub mod report;
pub mod scan;

pub use record::{RecordLine, RegistryRecord};
pub use report::{CycleStage, RecordReport, RunSummary, SyncOutcome};
pub use scan::{ChangeSet, MarkerHit, ScanFailure, ScanReport};
