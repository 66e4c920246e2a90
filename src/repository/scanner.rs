// file: src/repository/scanner.rs
// description: Directory walking and streaming marker search
// reference: https://docs.rs/walkdir

use crate::config::ScanSettings;
use crate::error::{Result, TrackError};
use crate::models::{MarkerHit, ScanFailure, ScanReport};
use crate::utils::Validator;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, trace, warn};
use walkdir::WalkDir;

pub struct MarkerScanner {
    settings: ScanSettings,
}

impl MarkerScanner {
    pub fn new(settings: ScanSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// First marker found in the file, reading one line at a time.
    ///
    /// On the first matching line the earliest marker in `markers` order
    /// that occurs in it wins. Matching is a literal, case-sensitive
    /// substring test.
    pub fn scan_file(path: &Path, markers: &[String]) -> Result<Option<String>> {
        let file = File::open(path).map_err(|source| TrackError::FileOperation {
            path: path.to_path_buf(),
            source,
        })?;

        let mut reader = BufReader::new(file);
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = reader
                .read_until(b'\n', &mut line)
                .map_err(|source| TrackError::FileOperation {
                    path: path.to_path_buf(),
                    source,
                })?;
            if read == 0 {
                return Ok(None);
            }

            let text = String::from_utf8_lossy(&line);
            if let Some(marker) = markers.iter().find(|m| text.contains(m.as_str())) {
                return Ok(Some(marker.clone()));
            }
        }
    }

    /// Scans the whole working tree below `root`.
    ///
    /// Ignored directories are pruned with their entire subtree. Unreadable
    /// files and walk errors are recorded as failures; the walk continues.
    pub fn scan_repository_full(&self, root: &Path) -> Result<ScanReport> {
        Validator::validate_directory(root)?;
        info!("Scanning directory: {}", root.display());

        let mut report = ScanReport::default();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                let pruned = entry.depth() > 0
                    && entry.file_type().is_dir()
                    && self
                        .settings
                        .is_ignored_dir(&entry.file_name().to_string_lossy());
                if pruned {
                    debug!("Skipping directory: {}", entry.path().display());
                }
                !pruned
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(|p| relative_path(root, p))
                        .unwrap_or_default();
                    warn!("Walk error at {}: {}", path, err);
                    report.failures.push(ScanFailure {
                        path,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if self.settings.is_ignored_extension(path) {
                trace!("Skipping file: {}", path.display());
                continue;
            }

            self.scan_into(&mut report, relative_path(root, path), path);
        }

        info!(
            "Scanned {} files, {} with markers",
            report.files_scanned,
            report.hits.len()
        );
        Ok(report.finish())
    }

    /// Scans an explicit list of repository-relative paths.
    ///
    /// Paths are expected to be filtered already; a path that vanished
    /// since the diff is recorded as a failure.
    pub fn scan_changed_files<I, S>(&self, root: &Path, changed: I) -> ScanReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = ScanReport::default();

        for relative in changed {
            let relative = relative.as_ref();
            if let Err(e) = Validator::validate_relative_path(relative) {
                report.failures.push(ScanFailure {
                    path: relative.to_string(),
                    reason: e.to_string(),
                });
                continue;
            }

            let path = root.join(relative);
            if path.is_dir() {
                debug!("Skipping directory entry: {}", relative);
                continue;
            }

            self.scan_into(&mut report, relative.to_string(), &path);
        }

        report.finish()
    }

    fn scan_into(&self, report: &mut ScanReport, relative: String, path: &Path) {
        report.files_scanned += 1;
        match Self::scan_file(path, self.settings.markers()) {
            Ok(Some(marker)) => {
                debug!("{}: {}", marker, relative);
                report.hits.push(MarkerHit {
                    path: relative,
                    marker,
                });
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Failed to scan {}: {}", relative, e);
                report.failures.push(ScanFailure {
                    path: relative,
                    reason: e.to_string(),
                });
            }
        }
    }
}

fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path).to_string_lossy();
    Validator::normalize_separators(&relative)
}
