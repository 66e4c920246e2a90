// file: src/pipeline/orchestrator.rs
// description: drives registration, one-shot scans and the per-record sync cycle
// reference: orchestrates registry, backend, change resolution and scanning

use crate::config::{Config, DiffMode};
use crate::error::{Result, TrackError};
use crate::models::{
    CycleStage, RecordReport, RegistryRecord, RunSummary, ScanReport, SyncOutcome,
};
use crate::pipeline::progress::ProgressTracker;
use crate::registry::RegistryStore;
use crate::repository::{CancelToken, ChangeSetResolver, MarkerScanner, VcsBackend};
use crate::utils::{OperationTimer, Validator};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};

type CycleResult<T> = std::result::Result<T, (CycleStage, TrackError)>;

/// Result of scanning a whole working tree outside the sync cycle.
#[derive(Debug, Clone, Serialize)]
pub struct FullScan {
    pub uri: String,
    pub head: String,
    #[serde(flatten)]
    pub report: ScanReport,
}

pub struct SyncOrchestrator<'a, B: VcsBackend> {
    backend: &'a B,
    store: RegistryStore,
    scanner: MarkerScanner,
    archive_dir: PathBuf,
    diff_mode: DiffMode,
    cancel: CancelToken,
    show_progress: bool,
}

impl<'a, B: VcsBackend> SyncOrchestrator<'a, B> {
    pub fn new(backend: &'a B, config: &Config) -> Self {
        Self {
            backend,
            store: RegistryStore::new(config.registry.path.clone()),
            scanner: MarkerScanner::new(config.scan.clone()),
            archive_dir: config.registry.archive_dir.clone(),
            diff_mode: config.sync.diff_mode,
            cancel: CancelToken::new(),
            show_progress: false,
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    /// Registers a repository, adopting its root revision as the first
    /// processed revision.
    ///
    /// The duplicate check runs before the backend is contacted, so
    /// re-registering a known URI never touches the network.
    pub fn register(&self, uri: &str) -> Result<RegistryRecord> {
        Validator::validate_uri(uri)?;
        let _lock = self.store.lock()?;

        if self.store.load()?.iter().any(|r| r.uri() == uri) {
            return Err(TrackError::Duplicate(uri.to_string()));
        }

        let root = self.backend.resolve_root_revision(uri)?;
        Validator::validate_revision(&root)?;

        let record = RegistryRecord::new(uri, root);
        self.store.append(record.clone())?;
        info!("Registered {} at {}", uri, short(record.base_revision().unwrap_or_default()));
        Ok(record)
    }

    /// Materializes the default-branch tip and scans the whole tree.
    /// The registry is neither read nor written.
    pub fn scan_repository(&self, uri: &str) -> Result<FullScan> {
        Validator::validate_uri(uri)?;

        let root = self.backend.resolve_root_revision(uri)?;
        let destination = self.working_copy_path(uri, &root);
        let repo = self.backend.materialize(uri, &destination, None)?;
        let head = self.backend.resolve_head(&repo)?;

        let report = self.scanner.scan_repository_full(&destination)?;
        Ok(FullScan {
            uri: uri.to_string(),
            head,
            report,
        })
    }

    /// Runs one sync cycle for every registered record, in registry order.
    ///
    /// A failing record is reported and the run moves on; only failures
    /// to lock or read the registry abort the run.
    pub fn run(&self) -> Result<RunSummary> {
        let timer = OperationTimer::new("sync");
        let started_at = chrono::Utc::now().to_rfc3339();

        let _lock = self.store.lock()?;
        let records = self.store.load()?;
        info!("Syncing {} tracked repositories", records.len());

        let progress = ProgressTracker::new(records.len(), self.show_progress);
        let mut reports = Vec::with_capacity(records.len());

        for record in &records {
            progress.start_record(record.uri());

            let outcome = if self.cancel.is_cancelled() {
                SyncOutcome::Reported {
                    stage: CycleStage::Cancelled,
                    error: "run cancelled before this record".to_string(),
                }
            } else {
                self.sync_record(record)
            };

            progress.finish_record(&outcome);
            reports.push(RecordReport {
                uri: record.uri().to_string(),
                outcome,
            });
        }

        progress.finish();
        timer.warn_if_slow(Duration::from_secs(600), "full registry sync");
        let elapsed = timer.finish_with_count(reports.len());

        Ok(RunSummary {
            started_at,
            duration_ms: elapsed.as_millis() as u64,
            records: reports,
        })
    }

    /// One cycle for one record. Errors become a `Reported` outcome.
    pub fn sync_record(&self, record: &RegistryRecord) -> SyncOutcome {
        match self.cycle(record) {
            Ok(outcome) => {
                match &outcome {
                    SyncOutcome::Skipped { head } => {
                        info!("Skip {}: already at {}", record.uri(), short(head));
                    }
                    SyncOutcome::Committed {
                        from,
                        head,
                        changes,
                        scan,
                    } => {
                        info!(
                            "Synced {}: {}..{}, {} changed, {} removed, {} with markers",
                            record.uri(),
                            short(from),
                            short(head),
                            changes.changed.len(),
                            changes.removed.len(),
                            scan.hits.len()
                        );
                        for failure in &scan.failures {
                            warn!("{}: could not scan {}: {}", record.uri(), failure.path, failure.reason);
                        }
                    }
                    SyncOutcome::Reported { .. } => {}
                }
                outcome
            }
            Err((stage, e)) => {
                error!("Sync of {} failed at {:?}: {}", record.uri(), stage, e);
                SyncOutcome::Reported {
                    stage,
                    error: e.to_string(),
                }
            }
        }
    }

    fn cycle(&self, record: &RegistryRecord) -> CycleResult<SyncOutcome> {
        let mut record = record.clone();

        // Resolve
        let adopted = record.root_revision().is_none();
        if adopted {
            let root = self
                .backend
                .resolve_root_revision(record.uri())
                .map_err(at(CycleStage::Resolve))?;
            record.adopt_root(&root).map_err(at(CycleStage::Resolve))?;
            debug!("Adopted root {} for {}", short(&root), record.uri());
        }

        let base = record
            .base_revision()
            .map(str::to_string)
            .ok_or_else(|| {
                (
                    CycleStage::Resolve,
                    TrackError::Validation(format!("{} has no base revision", record.uri())),
                )
            })?;
        let root = record.root_revision().unwrap_or(&base).to_string();

        let destination = self.working_copy_path(record.uri(), &root);
        let repo = self
            .backend
            .materialize(record.uri(), &destination, None)
            .map_err(at(CycleStage::Resolve))?;
        let head = self
            .backend
            .resolve_head(&repo)
            .map_err(at(CycleStage::Resolve))?;

        // Compare
        if head == base {
            // Persist a root adopted in this cycle.
            if adopted {
                let settled = record.advanced_to(&head).map_err(at(CycleStage::Commit))?;
                self.store.update(settled).map_err(at(CycleStage::Commit))?;
            }
            return Ok(SyncOutcome::Skipped { head });
        }

        // Diff
        let resolver = ChangeSetResolver::new(self.backend, self.scanner.settings());
        let changes = match self.diff_mode {
            DiffMode::Direct => resolver.compute_changes_between(&repo, &base, &head),
            DiffMode::History => resolver.compute_changes_since_ancestor(&repo, &base),
        }
        .map_err(at(CycleStage::Diff))?;

        // Scan
        let scan = self
            .scanner
            .scan_changed_files(&destination, &changes.changed);

        // Commit
        let advanced = record.advanced_to(&head).map_err(at(CycleStage::Commit))?;
        self.store.update(advanced).map_err(at(CycleStage::Commit))?;

        Ok(SyncOutcome::Committed {
            from: base,
            head,
            changes,
            scan,
        })
    }

    /// `archive_dir/<uri>-<root>`, both flattened to one path component.
    /// Forks share a root with their upstream, so the URI is part of the key.
    fn working_copy_path(&self, uri: &str, root: &str) -> PathBuf {
        let uri = path_component(uri);
        let uri = &uri[uri.len().saturating_sub(MAX_URI_COMPONENT)..];
        self.archive_dir
            .join(format!("{}-{}", uri, path_component(root)))
    }
}

const MAX_URI_COMPONENT: usize = 96;

fn path_component(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn at(stage: CycleStage) -> impl Fn(TrackError) -> (CycleStage, TrackError) {
    move |e| (stage, e)
}

fn short(revision: &str) -> &str {
    revision.get(..8).unwrap_or(revision)
}
