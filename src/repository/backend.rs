// file: src/repository/backend.rs
// description: version-control backend contract consumed by the sync engine
// reference: internal module structure

use crate::error::{Result, TrackError};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// One file-level entry of a tree diff.
///
/// No source means an addition, no destination a deletion, and two
/// different paths a rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub source: Option<String>,
    pub destination: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Renamed,
    Deleted,
}

impl DiffEntry {
    pub fn added(path: impl Into<String>) -> Self {
        Self {
            source: None,
            destination: Some(path.into()),
        }
    }

    pub fn modified(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            source: Some(path.clone()),
            destination: Some(path),
        }
    }

    pub fn renamed(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            source: Some(from.into()),
            destination: Some(to.into()),
        }
    }

    pub fn deleted(path: impl Into<String>) -> Self {
        Self {
            source: Some(path.into()),
            destination: None,
        }
    }

    pub fn kind(&self) -> Option<ChangeKind> {
        match (&self.source, &self.destination) {
            (Some(from), Some(to)) if from != to => Some(ChangeKind::Renamed),
            (Some(_), Some(_)) => Some(ChangeKind::Modified),
            (None, Some(_)) => Some(ChangeKind::Added),
            (Some(_), None) => Some(ChangeKind::Deleted),
            (None, None) => None,
        }
    }
}

/// A revision visited while walking history backward, with its first parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryStep {
    pub revision: String,
    pub parent: Option<String>,
}

pub type HistoryWalk<'a> = Box<dyn Iterator<Item = Result<HistoryStep>> + 'a>;

/// What the sync engine needs from a version-control system.
pub trait VcsBackend {
    /// Handle to a materialized working copy.
    type Repo;

    /// Clones `uri` into `destination` when absent, otherwise opens and
    /// updates it, then checks out `revision` or the tip of the default branch.
    fn materialize(&self, uri: &str, destination: &Path, revision: Option<&str>)
    -> Result<Self::Repo>;

    fn resolve_head(&self, repo: &Self::Repo) -> Result<String>;

    fn diff(&self, repo: &Self::Repo, from: &str, to: &str) -> Result<Vec<DiffEntry>>;

    /// Walks first-parent history starting at `from` (inclusive), newest first.
    fn walk_history<'a>(&'a self, repo: &'a Self::Repo, from: &str) -> Result<HistoryWalk<'a>>;

    /// Earliest commit on the default line of development of `uri`.
    fn resolve_root_revision(&self, uri: &str) -> Result<String>;
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Cancellation token plus an optional deadline for one backend call.
#[derive(Debug, Clone)]
pub struct Interrupt {
    token: CancelToken,
    deadline: Option<Instant>,
}

impl Interrupt {
    pub fn new(token: CancelToken, timeout: Option<Duration>) -> Self {
        Self {
            token,
            deadline: timeout.map(|t| Instant::now() + t),
        }
    }

    pub fn reason(&self) -> Option<&'static str> {
        if self.token.is_cancelled() {
            Some("cancelled")
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some("deadline exceeded")
        } else {
            None
        }
    }

    pub fn should_abort(&self) -> bool {
        self.reason().is_some()
    }

    pub fn check(&self, operation: &str) -> Result<()> {
        match self.reason() {
            Some(reason) => Err(TrackError::Interrupted(format!("{}: {}", operation, reason))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_entry_kinds() {
        assert_eq!(DiffEntry::added("a").kind(), Some(ChangeKind::Added));
        assert_eq!(DiffEntry::modified("a").kind(), Some(ChangeKind::Modified));
        assert_eq!(DiffEntry::renamed("a", "b").kind(), Some(ChangeKind::Renamed));
        assert_eq!(DiffEntry::renamed("a", "a").kind(), Some(ChangeKind::Modified));
        assert_eq!(DiffEntry::deleted("a").kind(), Some(ChangeKind::Deleted));
        let empty = DiffEntry {
            source: None,
            destination: None,
        };
        assert_eq!(empty.kind(), None);
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let interrupt = Interrupt::new(token.clone(), None);
        assert!(interrupt.check("fetch").is_ok());

        token.cancel();
        assert!(interrupt.should_abort());
        assert!(matches!(
            interrupt.check("fetch"),
            Err(TrackError::Interrupted(msg)) if msg == "fetch: cancelled"
        ));
    }

    #[test]
    fn test_deadline_expires() {
        let interrupt = Interrupt::new(CancelToken::new(), Some(Duration::ZERO));
        assert_eq!(interrupt.reason(), Some("deadline exceeded"));

        let generous = Interrupt::new(CancelToken::new(), Some(Duration::from_secs(3600)));
        assert_eq!(generous.reason(), None);
    }
}
