// file: src/models/scan.rs
// description: change sets and marker scan results
// reference: internal data structures

use serde::Serialize;
use std::collections::BTreeSet;

/// Paths touched between two revisions, relative to the repository root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub changed: BTreeSet<String>,
    pub removed: BTreeSet<String>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }
}

/// A file containing a marker. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct MarkerHit {
    pub path: String,
    pub marker: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanFailure {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub files_scanned: usize,
    pub hits: Vec<MarkerHit>,
    pub failures: Vec<ScanFailure>,
}

impl ScanReport {
    pub fn paths(&self) -> BTreeSet<&str> {
        self.hits.iter().map(|hit| hit.path.as_str()).collect()
    }

    pub fn marker_for(&self, path: &str) -> Option<&str> {
        self.hits
            .iter()
            .find(|hit| hit.path == path)
            .map(|hit| hit.marker.as_str())
    }

    pub(crate) fn finish(mut self) -> Self {
        self.hits.sort();
        self.failures.sort_by(|a, b| a.path.cmp(&b.path));
        self
    }
}
