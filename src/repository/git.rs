// file: src/repository/git.rs
// description: version-control backend implemented with git2
// reference: https://docs.rs/git2

use crate::config::BackendConfig;
use crate::error::{Result, TrackError};
use crate::repository::backend::{
    CancelToken, DiffEntry, HistoryStep, HistoryWalk, Interrupt, VcsBackend,
};
use crate::utils::Validator;
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{Delta, DiffFindOptions, FetchOptions, FetchPrune, Oid, RemoteCallbacks, Repository};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct Git2Backend {
    config: BackendConfig,
    cancel: CancelToken,
}

/// A materialized working copy.
pub struct GitRepo {
    repo: Repository,
    workdir: PathBuf,
}

impl GitRepo {
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }
}

impl Git2Backend {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn interrupt(&self) -> Interrupt {
        Interrupt::new(
            self.cancel.clone(),
            Some(Duration::from_secs(self.config.timeout_secs)),
        )
    }

    fn fetch_options(interrupt: &Interrupt) -> FetchOptions<'_> {
        let mut callbacks = RemoteCallbacks::new();
        callbacks.transfer_progress(move |stats| {
            if stats.received_objects() == stats.total_objects() {
                debug!(
                    "Resolving deltas {}/{}",
                    stats.indexed_deltas(),
                    stats.total_deltas()
                );
            } else if stats.total_objects() > 0 {
                debug!(
                    "Received {}/{} objects",
                    stats.received_objects(),
                    stats.total_objects()
                );
            }
            !interrupt.should_abort()
        });
        callbacks.sideband_progress(move |_| !interrupt.should_abort());

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(callbacks);
        fetch_options
    }

    /// Maps a failed network call, preferring the interrupt reason when it tripped.
    fn network_error(interrupt: &Interrupt, context: &str, err: git2::Error) -> TrackError {
        match interrupt.reason() {
            Some(reason) => TrackError::Interrupted(format!("{}: {}", context, reason)),
            None => TrackError::Backend(format!("{}: {}", context, err)),
        }
    }

    fn clone_into(&self, uri: &str, destination: &Path) -> Result<Repository> {
        info!("Cloning {} into {}", uri, destination.display());
        let interrupt = self.interrupt();

        let mut builder = RepoBuilder::new();
        builder.fetch_options(Self::fetch_options(&interrupt));
        builder
            .clone(uri, destination)
            .map_err(|e| Self::network_error(&interrupt, "Clone failed", e))
    }

    /// Fetches into an existing working copy. An `origin` pointing anywhere
    /// but `uri` is re-pointed first and stale remote refs are pruned.
    fn fetch_existing(&self, uri: &str, destination: &Path) -> Result<Repository> {
        info!("Repository exists, fetching latest changes: {}", destination.display());
        let repo = Repository::open(destination)
            .map_err(|e| TrackError::Backend(format!("Failed to open repo: {}", e)))?;

        {
            let current = repo
                .find_remote("origin")
                .map_err(|e| TrackError::Backend(format!("Failed to find remote: {}", e)))?
                .url()
                .map(str::to_string);
            if current.as_deref() != Some(uri) {
                warn!(
                    "Working copy {} tracked {}, re-pointing origin to {}",
                    destination.display(),
                    current.as_deref().unwrap_or("<non-utf8 url>"),
                    uri
                );
                repo.remote_set_url("origin", uri)?;
            }

            let mut remote = repo.find_remote("origin")?;
            let interrupt = self.interrupt();
            let mut fetch_options = Self::fetch_options(&interrupt);
            fetch_options.prune(FetchPrune::On);
            remote
                .fetch(&[] as &[&str], Some(&mut fetch_options), None)
                .map_err(|e| Self::network_error(&interrupt, "Fetch failed", e))?;
        }

        Ok(repo)
    }

    /// Tip of the first default branch that resolves, remote-tracking refs first.
    fn default_branch_tip(&self, repo: &Repository, uri: &str) -> Result<Oid> {
        let mut candidates = vec!["refs/remotes/origin/HEAD".to_string()];
        for branch in &self.config.default_branches {
            candidates.push(format!("refs/remotes/origin/{}", branch));
        }
        for branch in &self.config.default_branches {
            candidates.push(format!("refs/heads/{}", branch));
        }

        for name in &candidates {
            if let Ok(reference) = repo.find_reference(name)
                && let Ok(resolved) = reference.resolve()
                && let Some(target) = resolved.target()
            {
                debug!("Default branch of {} resolved via {}", uri, name);
                return Ok(target);
            }
        }

        Err(TrackError::NoDefaultBranch {
            uri: uri.to_string(),
            tried: self.config.default_branches.join(", "),
        })
    }

    fn checkout_detached(repo: &Repository, target: Oid) -> Result<()> {
        let commit = repo.find_commit(target)?;
        repo.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))
            .map_err(|e| TrackError::Backend(format!("Checkout failed: {}", e)))?;
        repo.set_head_detached(target)
            .map_err(|e| TrackError::Backend(format!("Failed to set HEAD: {}", e)))?;
        Ok(())
    }

    fn find_commit<'r>(repo: &'r Repository, revision: &str) -> Result<git2::Commit<'r>> {
        repo.revparse_single(revision)
            .and_then(|object| object.peel_to_commit())
            .map_err(|e| TrackError::Backend(format!("Unknown revision {}: {}", revision, e)))
    }
}

impl VcsBackend for Git2Backend {
    type Repo = GitRepo;

    fn materialize(
        &self,
        uri: &str,
        destination: &Path,
        revision: Option<&str>,
    ) -> Result<GitRepo> {
        let repo = if destination.join(".git").exists() {
            self.fetch_existing(uri, destination)?
        } else {
            if let Some(parent) = destination.parent() {
                std::fs::create_dir_all(parent).map_err(|source| TrackError::FileOperation {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            self.clone_into(uri, destination)?
        };

        let target = match revision {
            Some(revision) => Self::find_commit(&repo, revision)?.id(),
            None => self.default_branch_tip(&repo, uri)?,
        };
        Self::checkout_detached(&repo, target)?;
        debug!("Checked out {} at {}", uri, target);

        Ok(GitRepo {
            repo,
            workdir: destination.to_path_buf(),
        })
    }

    fn resolve_head(&self, repo: &GitRepo) -> Result<String> {
        let head = repo
            .repo
            .head()
            .map_err(|e| TrackError::Backend(format!("Failed to get HEAD: {}", e)))?;

        let commit = head
            .peel_to_commit()
            .map_err(|e| TrackError::Backend(format!("Failed to get commit: {}", e)))?;

        Ok(commit.id().to_string())
    }

    fn diff(&self, repo: &GitRepo, from: &str, to: &str) -> Result<Vec<DiffEntry>> {
        let old_tree = Self::find_commit(&repo.repo, from)?.tree()?;
        let new_tree = Self::find_commit(&repo.repo, to)?.tree()?;

        let mut diff = repo
            .repo
            .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), None)?;
        let mut find = DiffFindOptions::new();
        find.renames(true);
        diff.find_similar(Some(&mut find))?;

        let entries = diff
            .deltas()
            .filter_map(|delta| {
                let source = delta.old_file().path().map(path_string);
                let destination = delta.new_file().path().map(path_string);
                match delta.status() {
                    Delta::Added => Some(DiffEntry {
                        source: None,
                        destination,
                    }),
                    Delta::Deleted => Some(DiffEntry {
                        source,
                        destination: None,
                    }),
                    Delta::Modified | Delta::Renamed | Delta::Copied | Delta::Typechange => {
                        Some(DiffEntry {
                            source,
                            destination,
                        })
                    }
                    _ => None,
                }
            })
            .collect();

        Ok(entries)
    }

    fn walk_history<'a>(&'a self, repo: &'a GitRepo, from: &str) -> Result<HistoryWalk<'a>> {
        let start = Self::find_commit(&repo.repo, from)?.id();
        Ok(Box::new(FirstParentWalk {
            repo: &repo.repo,
            next: Some(start),
            interrupt: Interrupt::new(self.cancel.clone(), None),
        }))
    }

    fn resolve_root_revision(&self, uri: &str) -> Result<String> {
        let scratch = tempfile::TempDir::new()?;
        let repo = Repository::init_bare(scratch.path())?;

        {
            let mut remote = repo.remote("origin", uri)?;
            let interrupt = self.interrupt();
            let mut fetch_options = Self::fetch_options(&interrupt);
            remote
                .fetch(&[] as &[&str], Some(&mut fetch_options), None)
                .map_err(|e| Self::network_error(&interrupt, "Fetch failed", e))?;
        }

        let mut commit = repo.find_commit(self.default_branch_tip(&repo, uri)?)?;
        while let Some(parent) = commit.parent_ids().next() {
            commit = repo.find_commit(parent)?;
        }

        info!("Root revision of {} is {}", uri, commit.id());
        Ok(commit.id().to_string())
    }
}

struct FirstParentWalk<'r> {
    repo: &'r Repository,
    next: Option<Oid>,
    interrupt: Interrupt,
}

impl Iterator for FirstParentWalk<'_> {
    type Item = Result<HistoryStep>;

    fn next(&mut self) -> Option<Self::Item> {
        let oid = self.next.take()?;

        if let Err(e) = self.interrupt.check("History walk") {
            return Some(Err(e));
        }

        let commit = match self.repo.find_commit(oid) {
            Ok(commit) => commit,
            Err(e) => return Some(Err(e.into())),
        };

        let parent = commit.parent_ids().next();
        self.next = parent;

        Some(Ok(HistoryStep {
            revision: oid.to_string(),
            parent: parent.map(|p| p.to_string()),
        }))
    }
}

fn path_string(path: &Path) -> String {
    Validator::normalize_separators(&path.to_string_lossy())
}
