// file: src/repository/mod.rs
// description: Repository operations module exports
// reference: Internal module structure

pub mod backend;
pub mod changes;
#[cfg(test)]
pub(crate) mod fake;
pub mod git;
pub mod scanner;

pub use backend::{CancelToken, ChangeKind, DiffEntry, HistoryStep, Interrupt, VcsBackend};
pub use changes::ChangeSetResolver;
pub use git::{Git2Backend, GitRepo};
pub use scanner::MarkerScanner;
