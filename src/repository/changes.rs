// file: src/repository/changes.rs
// description: classifies backend diffs into changed and removed path sets
// reference: https://docs.rs/git2

use crate::config::ScanSettings;
use crate::error::{Result, TrackError};
use crate::models::ChangeSet;
use crate::repository::backend::{ChangeKind, DiffEntry, VcsBackend};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, trace};

pub struct ChangeSetResolver<'a, B: VcsBackend> {
    backend: &'a B,
    settings: &'a ScanSettings,
}

impl<'a, B: VcsBackend> ChangeSetResolver<'a, B> {
    pub fn new(backend: &'a B, settings: &'a ScanSettings) -> Self {
        Self { backend, settings }
    }

    /// Changed and removed paths between two revisions.
    ///
    /// A rename contributes its destination to `changed`; its source is
    /// absorbed and appears in neither set.
    pub fn compute_changes_between(
        &self,
        repo: &B::Repo,
        from: &str,
        to: &str,
    ) -> Result<ChangeSet> {
        let mut changes = ChangeSet::new();
        if from == to {
            return Ok(changes);
        }

        for entry in self.backend.diff(repo, from, to)? {
            self.classify(&entry, &mut changes);
        }

        debug!(
            "Diff {}..{}: {} changed, {} removed",
            short(from),
            short(to),
            changes.changed.len(),
            changes.removed.len()
        );
        Ok(changes)
    }

    /// Accumulates per-commit diffs walking back from head to `since`.
    ///
    /// `since` itself is not diffed. The most recent change to a path
    /// decides its classification. Fails with `AmbiguousHistory` when a
    /// revision without a parent is reached before `since`.
    pub fn compute_changes_since_ancestor(&self, repo: &B::Repo, since: &str) -> Result<ChangeSet> {
        let head = self.backend.resolve_head(repo)?;
        let mut changes = ChangeSet::new();
        if head == since {
            return Ok(changes);
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut steps = 0usize;
        let mut last_visited = head.clone();

        for step in self.backend.walk_history(repo, &head)? {
            let step = step?;
            if step.revision == since {
                debug!(
                    "Walked {} revisions back to {}: {} changed, {} removed",
                    steps,
                    short(since),
                    changes.changed.len(),
                    changes.removed.len()
                );
                return Ok(changes);
            }

            let parent = step.parent.ok_or_else(|| TrackError::AmbiguousHistory {
                boundary: since.to_string(),
                revision: step.revision.clone(),
            })?;

            let mut step_changes = ChangeSet::new();
            let mut touched = Vec::new();
            for entry in self.backend.diff(repo, &parent, &step.revision)? {
                self.classify(&entry, &mut step_changes);
                touched.extend(entry.source);
                touched.extend(entry.destination);
            }

            for path in step_changes.changed {
                if !seen.contains(&path) {
                    changes.changed.insert(path);
                }
            }
            for path in step_changes.removed {
                if !seen.contains(&path) {
                    changes.removed.insert(path);
                }
            }
            seen.extend(touched);

            steps += 1;
            last_visited = step.revision;
        }

        Err(TrackError::AmbiguousHistory {
            boundary: since.to_string(),
            revision: last_visited,
        })
    }

    fn classify(&self, entry: &DiffEntry, changes: &mut ChangeSet) {
        let (kind, path) = match (entry.kind(), &entry.source, &entry.destination) {
            (Some(ChangeKind::Deleted), Some(source), _) => (ChangeKind::Deleted, source),
            (Some(kind), _, Some(destination)) => (kind, destination),
            _ => return,
        };

        if self.settings.is_ignored_extension(Path::new(path)) {
            trace!("ignored extension: {}", path);
            return;
        }

        trace!("{:?}: {:?} -> {:?}", kind, entry.source, entry.destination);
        match kind {
            ChangeKind::Deleted => {
                changes.removed.insert(path.clone());
            }
            ChangeKind::Added | ChangeKind::Modified | ChangeKind::Renamed => {
                changes.changed.insert(path.clone());
            }
        }
    }
}

fn short(revision: &str) -> &str {
    revision.get(..8).unwrap_or(revision)
}
