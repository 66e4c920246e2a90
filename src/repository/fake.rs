// file: src/repository/fake.rs
// description: in-memory backend used by unit tests
// reference: internal test support

use crate::error::{Result, TrackError};
use crate::repository::backend::{DiffEntry, HistoryStep, HistoryWalk, VcsBackend};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
struct FakeRepoState {
    head: Option<String>,
    root: Option<String>,
    history: Vec<(String, Option<String>)>,
    diffs: HashMap<(String, String), Vec<DiffEntry>>,
    files: Vec<(String, String)>,
    materialize_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FakeRepo {
    pub uri: String,
    pub workdir: PathBuf,
}

/// Scripted backend: heads, histories, diffs and working-tree files per URI.
#[derive(Debug, Default)]
pub struct FakeBackend {
    repos: RefCell<HashMap<String, FakeRepoState>>,
    diff_calls: Cell<usize>,
    materialize_calls: Cell<usize>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repo(&self, uri: &str) -> FakeRepo {
        FakeRepo {
            uri: uri.to_string(),
            workdir: PathBuf::new(),
        }
    }

    fn with_state(&self, uri: &str, f: impl FnOnce(&mut FakeRepoState)) {
        f(self.repos.borrow_mut().entry(uri.to_string()).or_default());
    }

    pub fn set_head(&self, uri: &str, head: &str) {
        self.with_state(uri, |s| s.head = Some(head.to_string()));
    }

    pub fn set_root(&self, uri: &str, root: &str) {
        self.with_state(uri, |s| s.root = Some(root.to_string()));
    }

    /// Newest first, each revision paired with its first parent.
    pub fn set_history(&self, uri: &str, steps: &[(&str, Option<&str>)]) {
        self.with_state(uri, |s| {
            s.history = steps
                .iter()
                .map(|(rev, parent)| (rev.to_string(), parent.map(str::to_string)))
                .collect();
        });
    }

    pub fn set_diff(&self, uri: &str, from: &str, to: &str, entries: Vec<DiffEntry>) {
        self.with_state(uri, |s| {
            s.diffs.insert((from.to_string(), to.to_string()), entries);
        });
    }

    /// Files written into the destination on every materialize.
    pub fn set_files(&self, uri: &str, files: &[(&str, &str)]) {
        self.with_state(uri, |s| {
            s.files = files
                .iter()
                .map(|(path, content)| (path.to_string(), content.to_string()))
                .collect();
        });
    }

    pub fn fail_materialize(&self, uri: &str, message: &str) {
        self.with_state(uri, |s| s.materialize_error = Some(message.to_string()));
    }

    pub fn diff_calls(&self) -> usize {
        self.diff_calls.get()
    }

    pub fn materialize_calls(&self) -> usize {
        self.materialize_calls.get()
    }
}

impl VcsBackend for FakeBackend {
    type Repo = FakeRepo;

    fn materialize(&self, uri: &str, destination: &Path, _revision: Option<&str>) -> Result<FakeRepo> {
        self.materialize_calls.set(self.materialize_calls.get() + 1);
        let repos = self.repos.borrow();
        let state = repos
            .get(uri)
            .ok_or_else(|| TrackError::Backend(format!("unknown repository {}", uri)))?;

        if let Some(message) = &state.materialize_error {
            return Err(TrackError::Backend(message.clone()));
        }

        fs::create_dir_all(destination)?;
        for (path, content) in &state.files {
            let target = destination.join(path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(target, content)?;
        }

        Ok(FakeRepo {
            uri: uri.to_string(),
            workdir: destination.to_path_buf(),
        })
    }

    fn resolve_head(&self, repo: &FakeRepo) -> Result<String> {
        let repos = self.repos.borrow();
        repos
            .get(&repo.uri)
            .and_then(|s| s.head.clone().or_else(|| s.history.first().map(|h| h.0.clone())))
            .ok_or_else(|| TrackError::Backend(format!("no head for {}", repo.uri)))
    }

    fn diff(&self, repo: &FakeRepo, from: &str, to: &str) -> Result<Vec<DiffEntry>> {
        self.diff_calls.set(self.diff_calls.get() + 1);
        let repos = self.repos.borrow();
        Ok(repos
            .get(&repo.uri)
            .and_then(|s| s.diffs.get(&(from.to_string(), to.to_string())).cloned())
            .unwrap_or_default())
    }

    fn walk_history<'a>(&'a self, repo: &'a FakeRepo, from: &str) -> Result<HistoryWalk<'a>> {
        let repos = self.repos.borrow();
        let history = repos
            .get(&repo.uri)
            .map(|s| s.history.clone())
            .unwrap_or_default();

        let start = history
            .iter()
            .position(|(rev, _)| rev == from)
            .ok_or_else(|| TrackError::Backend(format!("unknown revision {}", from)))?;

        let steps: Vec<Result<HistoryStep>> = history[start..]
            .iter()
            .map(|(revision, parent)| {
                Ok(HistoryStep {
                    revision: revision.clone(),
                    parent: parent.clone(),
                })
            })
            .collect();

        Ok(Box::new(steps.into_iter()))
    }

    fn resolve_root_revision(&self, uri: &str) -> Result<String> {
        self.repos
            .borrow()
            .get(uri)
            .and_then(|s| s.root.clone())
            .ok_or_else(|| TrackError::Backend(format!("cannot reach {}", uri)))
    }
}
