// file: src/registry/store.rs
// description: line-oriented registry of tracked repositories with atomic rewrite
// reference: https://docs.rs/tempfile

use crate::error::{Result, TrackError};
use crate::models::{RecordLine, RegistryRecord};
use crate::registry::lock::RegistryLock;
use crate::utils::Validator;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// The registry file: one `root last uri` record per line.
///
/// Every mutation rewrites the whole file through a temporary file in the
/// same directory and an atomic rename, so a crash leaves either the old or
/// the new registry on disk. Callers coordinating a read-modify-write across
/// processes hold [`RegistryStore::lock`] for its duration.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock(&self) -> Result<RegistryLock> {
        RegistryLock::acquire(&self.path)
    }

    /// Creates an empty registry. Returns `false` if one already exists.
    pub fn init(&self) -> Result<bool> {
        if self.path.exists() {
            info!("Registry file {} already exists", self.path.display());
            return Ok(false);
        }

        if let Some(parent) = self.parent_dir() {
            fs::create_dir_all(parent).map_err(|source| TrackError::FileOperation {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        self.write_atomic("")?;
        info!("Registry file {} created", self.path.display());
        Ok(true)
    }

    pub fn load(&self) -> Result<Vec<RegistryRecord>> {
        if !self.path.exists() {
            return Err(TrackError::Config(format!(
                "Registry file {} does not exist, run `tr4ck init` first",
                self.path.display()
            )));
        }

        let content = fs::read_to_string(&self.path).map_err(|source| TrackError::FileOperation {
            path: self.path.clone(),
            source,
        })?;

        let records = Self::parse(&content)?;
        debug!("Loaded {} registry records", records.len());
        Ok(records)
    }

    pub fn parse(content: &str) -> Result<Vec<RegistryRecord>> {
        let mut records = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if let Some(parsed) = RecordLine::parse(line, index + 1)? {
                records.push(RegistryRecord::from(parsed));
            }
        }
        Ok(records)
    }

    pub fn render(records: &[RegistryRecord]) -> String {
        records
            .iter()
            .map(|record| format!("{}\n", RecordLine::from(record).render()))
            .collect()
    }

    pub fn save(&self, records: &[RegistryRecord]) -> Result<()> {
        self.write_atomic(&Self::render(records))?;
        debug!("Saved {} registry records", records.len());
        Ok(())
    }

    /// Adds a record. URIs are compared by exact equality.
    pub fn append(&self, record: RegistryRecord) -> Result<()> {
        Validator::validate_uri(record.uri())?;

        let mut records = self.load()?;
        if records.iter().any(|existing| existing.uri() == record.uri()) {
            return Err(TrackError::Duplicate(record.uri().to_string()));
        }

        info!("Adding {} to the registry", record.uri());
        records.push(record);
        self.save(&records)
    }

    /// Replaces the record with the same URI.
    ///
    /// A stored root revision is immutable; a record carrying a different
    /// root is rejected without touching the file.
    pub fn update(&self, record: RegistryRecord) -> Result<()> {
        let mut records = self.load()?;

        let slot = records
            .iter_mut()
            .find(|existing| existing.uri() == record.uri())
            .ok_or_else(|| TrackError::NotFound(record.uri().to_string()))?;

        if let Some(stored) = slot.root_revision()
            && record.root_revision() != Some(stored)
        {
            return Err(TrackError::RootRevisionChanged {
                uri: record.uri().to_string(),
                stored: stored.to_string(),
                given: record.root_revision().unwrap_or_default().to_string(),
            });
        }

        debug!(
            "Updating {} to {}",
            record.uri(),
            record.last_processed_revision().unwrap_or("-")
        );
        *slot = record;
        self.save(&records)
    }

    fn parent_dir(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }

    fn write_atomic(&self, content: &str) -> Result<()> {
        let dir = self.parent_dir().unwrap_or_else(|| Path::new("."));

        let mut temp = NamedTempFile::new_in(dir).map_err(|source| TrackError::FileOperation {
            path: dir.to_path_buf(),
            source,
        })?;

        temp.write_all(content.as_bytes())
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|source| TrackError::FileOperation {
                path: temp.path().to_path_buf(),
                source,
            })?;

        temp.persist(&self.path)
            .map_err(|e| TrackError::FileOperation {
                path: self.path.clone(),
                source: e.error,
            })?;

        Ok(())
    }
}
