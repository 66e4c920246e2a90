// file: src/config.rs
// description: application configuration management with yaml/toml support
// reference: https://docs.rs/config

use crate::error::{Result, TrackError};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = ".tr4ck.conf";
pub const DEFAULT_REGISTRY_FILE: &str = ".tr4ck.registry";

const DEFAULT_MARKERS: &[&str] = &["tr@ck", "todo", "fixme"];

const DEFAULT_IGNORE_DIRS: &[&str] = &[
    "__pycache__",
    ".svn",
    ".hg",
    ".tox",
    ".git",
    ".DS_Store",
    ".mypy_cache",
    ".pytest_cache",
    ".cache",
    ".idea",
    ".vscode",
    "vendor",
    "build",
    "dist",
    "target",
    "node_modules",
];

const DEFAULT_IGNORE_EXTENSIONS: &[&str] = &["json", "yaml", "yml", "sum", "mod", "html"];

const DEFAULT_BRANCHES: &[&str] = &["main", "master"];

#[derive(Debug, Clone)]
pub struct Config {
    pub registry: RegistryConfig,
    pub scan: ScanSettings,
    pub sync: SyncConfig,
    pub backend: BackendConfig,
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub path: PathBuf,
    pub archive_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffMode {
    /// Diff the last processed tree directly against the head tree.
    #[default]
    Direct,
    /// Walk first-parent history back to the last processed revision.
    History,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncConfig {
    pub diff_mode: DiffMode,
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub timeout_secs: u64,
    pub default_branches: Vec<String>,
}

/// Marker and filter settings handed to the scanner and the change resolver.
///
/// Extensions are stored without their leading dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    markers: Vec<String>,
    ignore_dirs: BTreeSet<String>,
    ignore_extensions: BTreeSet<String>,
}

impl ScanSettings {
    pub fn new<M, D, E>(markers: M, ignore_dirs: D, ignore_extensions: E) -> Self
    where
        M: IntoIterator,
        M::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(|m| -> String { m.into() })
                .filter(|m| !m.is_empty())
                .collect(),
            ignore_dirs: ignore_dirs
                .into_iter()
                .map(|d| -> String { d.into() })
                .collect(),
            ignore_extensions: ignore_extensions
                .into_iter()
                .map(|e| {
                    let ext: String = e.into();
                    normalize_extension(&ext)
                })
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignore_dirs.contains(name)
    }

    /// True when the path's extension is in the ignored set.
    pub fn is_ignored_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.ignore_extensions.contains(ext))
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self::new(
            DEFAULT_MARKERS.iter().copied(),
            DEFAULT_IGNORE_DIRS.iter().copied(),
            DEFAULT_IGNORE_EXTENSIONS.iter().copied(),
        )
    }
}

/// Shape of the on-disk configuration. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    registry_file_path: Option<String>,
    archive_dir: Option<String>,
    markers: Vec<String>,
    ignore_dirs: Vec<String>,
    ignore_extensions: Vec<String>,
    diff_mode: DiffMode,
    backend: BackendFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BackendFile {
    timeout_secs: Option<u64>,
    default_branches: Vec<String>,
}

impl Config {
    /// Loads the configuration file, layering `TR4CK__*` environment overrides on top.
    ///
    /// Without an explicit path `~/.tr4ck.conf` is read when it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let home = dirs::home_dir();
        let (source, required) = match path {
            Some(path) => (expand_tilde(&path.to_string_lossy(), home.as_deref()), true),
            None => match &home {
                Some(home) => (home.join(DEFAULT_CONFIG_FILE), false),
                None => return Self::from_file(ConfigFile::default(), None),
            },
        };

        let settings = config::Config::builder()
            .add_source(
                config::File::from(source.as_path())
                    .format(file_format(&source))
                    .required(required),
            )
            .add_source(
                config::Environment::with_prefix("TR4CK")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("markers")
                    .with_list_parse_key("ignore_dirs")
                    .with_list_parse_key("ignore_extensions")
                    .with_list_parse_key("backend.default_branches")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| TrackError::Config(e.to_string()))?;

        let file: ConfigFile = settings
            .try_deserialize()
            .map_err(|e| TrackError::Config(e.to_string()))?;

        Self::from_file(file, home.as_deref())
    }

    pub fn default_config() -> Self {
        Self::from_file(ConfigFile::default(), dirs::home_dir().as_deref())
            .unwrap_or_else(|_| Self {
                registry: RegistryConfig {
                    path: PathBuf::from(DEFAULT_REGISTRY_FILE),
                    archive_dir: default_archive_dir(),
                },
                scan: ScanSettings::default(),
                sync: SyncConfig::default(),
                backend: BackendConfig {
                    timeout_secs: 300,
                    default_branches: DEFAULT_BRANCHES.iter().map(|b| b.to_string()).collect(),
                },
            })
    }

    /// Markers replace the defaults; ignore lists extend them.
    fn from_file(file: ConfigFile, home: Option<&Path>) -> Result<Self> {
        let registry_path = match file.registry_file_path.as_deref() {
            Some(raw) if !raw.trim().is_empty() => expand_tilde(raw.trim(), home),
            _ => home
                .map(|h| h.join(DEFAULT_REGISTRY_FILE))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REGISTRY_FILE)),
        };

        let archive_dir = match file.archive_dir.as_deref() {
            Some(raw) if !raw.trim().is_empty() => expand_tilde(raw.trim(), home),
            _ => default_archive_dir(),
        };

        let markers: Vec<String> = if file.markers.is_empty() {
            DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect()
        } else {
            file.markers
        };

        let ignore_dirs = DEFAULT_IGNORE_DIRS
            .iter()
            .map(|d| d.to_string())
            .chain(file.ignore_dirs);
        let ignore_extensions = DEFAULT_IGNORE_EXTENSIONS
            .iter()
            .map(|e| e.to_string())
            .chain(file.ignore_extensions);

        let default_branches = if file.backend.default_branches.is_empty() {
            DEFAULT_BRANCHES.iter().map(|b| b.to_string()).collect()
        } else {
            file.backend.default_branches
        };

        let config = Self {
            registry: RegistryConfig {
                path: registry_path,
                archive_dir,
            },
            scan: ScanSettings::new(markers, ignore_dirs, ignore_extensions),
            sync: SyncConfig {
                diff_mode: file.diff_mode,
            },
            backend: BackendConfig {
                timeout_secs: file.backend.timeout_secs.unwrap_or(300),
                default_branches,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.scan.markers().is_empty() {
            return Err(TrackError::Config(
                "at least one non-empty marker is required".to_string(),
            ));
        }

        if self.backend.timeout_secs == 0 {
            return Err(TrackError::Config(
                "backend.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.backend.default_branches.iter().any(|b| b.trim().is_empty()) {
            return Err(TrackError::Config(
                "backend.default_branches must not contain empty names".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_archive_dir() -> PathBuf {
    std::env::temp_dir().join("tr4ck").join("archives")
}

fn file_format(path: &Path) -> config::FileFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => config::FileFormat::Toml,
        Some("json") => config::FileFormat::Json,
        _ => config::FileFormat::Yaml,
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_string()
}

/// Replaces a leading `~` with the home directory.
pub fn expand_tilde(raw: &str, home: Option<&Path>) -> PathBuf {
    match (raw.strip_prefix('~'), home) {
        (Some(rest), Some(home)) => home.join(rest.trim_start_matches(['/', '\\'])),
        _ => PathBuf::from(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = ScanSettings::default();
        assert_eq!(settings.markers(), &["tr@ck", "todo", "fixme"]);
        assert!(settings.is_ignored_dir("node_modules"));
        assert!(settings.is_ignored_dir(".git"));
        assert!(!settings.is_ignored_dir("src"));
        assert!(settings.is_ignored_extension(Path::new("go.sum")));
        assert!(settings.is_ignored_extension(Path::new("config/app.yml")));
        assert!(!settings.is_ignored_extension(Path::new("main.go")));
        assert!(!settings.is_ignored_extension(Path::new("Makefile")));
    }

    #[test]
    fn test_extensions_accept_leading_dot() {
        let settings = ScanSettings::new(["todo"], Vec::<String>::new(), [".lock", "txt"]);
        assert!(settings.is_ignored_extension(Path::new("Cargo.lock")));
        assert!(settings.is_ignored_extension(Path::new("notes.txt")));
        assert!(!settings.is_ignored_extension(Path::new("lock")));
    }

    #[test]
    fn test_expand_tilde() {
        let home = Path::new("/home/dev");
        assert_eq!(
            expand_tilde("~/.tr4ck.registry", Some(home)),
            PathBuf::from("/home/dev/.tr4ck.registry")
        );
        assert_eq!(
            expand_tilde("/var/lib/tr4ck", Some(home)),
            PathBuf::from("/var/lib/tr4ck")
        );
        assert_eq!(expand_tilde("~/x", None), PathBuf::from("~/x"));
    }

    #[test]
    fn test_file_markers_replace_and_ignores_extend() {
        let file = ConfigFile {
            markers: vec!["HACK".to_string()],
            ignore_dirs: vec!["generated".to_string()],
            ignore_extensions: vec![".snap".to_string()],
            ..ConfigFile::default()
        };

        let config = Config::from_file(file, Some(Path::new("/home/dev"))).unwrap();

        assert_eq!(config.scan.markers(), &["HACK"]);
        assert!(config.scan.is_ignored_dir("generated"));
        assert!(config.scan.is_ignored_dir("vendor"));
        assert!(config.scan.is_ignored_extension(Path::new("a.snap")));
        assert!(config.scan.is_ignored_extension(Path::new("a.json")));
        assert_eq!(
            config.registry.path,
            PathBuf::from("/home/dev/.tr4ck.registry")
        );
        assert_eq!(config.backend.default_branches, vec!["main", "master"]);
        assert_eq!(config.sync.diff_mode, DiffMode::Direct);
    }

    #[test]
    fn test_load_yaml_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tr4ck.conf");
        let registry = temp.path().join("reg");
        fs::write(
            &path,
            format!(
                "registry_file_path: {}\nmarkers:\n  - XXX\n  - todo\ndiff_mode: history\nbackend:\n  timeout_secs: 30\n",
                registry.display()
            ),
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.registry.path, registry);
        assert_eq!(config.scan.markers(), &["XXX", "todo"]);
        assert_eq!(config.sync.diff_mode, DiffMode::History);
        assert_eq!(config.backend.timeout_secs, 30);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let temp = TempDir::new().unwrap();
        let result = Config::load(Some(&temp.path().join("absent.yaml")));
        assert!(matches!(result, Err(TrackError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let file = ConfigFile {
            backend: BackendFile {
                timeout_secs: Some(0),
                default_branches: vec![],
            },
            ..ConfigFile::default()
        };
        assert!(Config::from_file(file, None).is_err());
    }

    #[test]
    fn test_empty_markers_are_dropped() {
        let file = ConfigFile {
            markers: vec![String::new()],
            ..ConfigFile::default()
        };
        assert!(matches!(
            Config::from_file(file, None),
            Err(TrackError::Config(_))
        ));
    }
}
