// file: src/pipeline/mod.rs
// description: pipeline module exports and public api
// reference: sync orchestration

mod orchestrator;
mod progress;

pub use orchestrator::{FullScan, SyncOrchestrator};
pub use progress::ProgressTracker;
