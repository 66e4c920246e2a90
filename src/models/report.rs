// file: src/models/report.rs
// description: per-record sync outcomes and run summaries
// reference: internal data structures

use crate::models::scan::{ChangeSet, ScanReport};
use serde::Serialize;

/// Cycle stage at which a record was reported instead of committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleStage {
    Resolve,
    Diff,
    Commit,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SyncOutcome {
    /// Head already processed; nothing scanned, nothing written.
    Skipped { head: String },
    Committed {
        from: String,
        head: String,
        changes: ChangeSet,
        scan: ScanReport,
    },
    Reported { stage: CycleStage, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordReport {
    pub uri: String,
    #[serde(flatten)]
    pub outcome: SyncOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub started_at: String,
    pub duration_ms: u64,
    pub records: Vec<RecordReport>,
}

impl RunSummary {
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, SyncOutcome::Skipped { .. }))
    }

    pub fn committed(&self) -> usize {
        self.count(|o| matches!(o, SyncOutcome::Committed { .. }))
    }

    pub fn reported(&self) -> usize {
        self.count(|o| matches!(o, SyncOutcome::Reported { .. }))
    }

    pub fn total_hits(&self) -> usize {
        self.records
            .iter()
            .map(|r| match &r.outcome {
                SyncOutcome::Committed { scan, .. } => scan.hits.len(),
                _ => 0,
            })
            .sum()
    }

    pub fn outcome_for(&self, uri: &str) -> Option<&SyncOutcome> {
        self.records
            .iter()
            .find(|r| r.uri == uri)
            .map(|r| &r.outcome)
    }

    fn count(&self, predicate: impl Fn(&SyncOutcome) -> bool) -> usize {
        self.records.iter().filter(|r| predicate(&r.outcome)).count()
    }
}
