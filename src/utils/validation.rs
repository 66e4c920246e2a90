// file: src/utils/validation.rs
// description: data validation utilities and helpers
// reference: input validation patterns

use crate::error::{Result, TrackError};
use std::path::{Component, Path};

pub struct Validator;

impl Validator {
    /// Registry fields are whitespace separated, so a URI may not contain any.
    pub fn validate_uri(uri: &str) -> Result<()> {
        if uri.is_empty() {
            return Err(TrackError::Validation("URI cannot be empty".to_string()));
        }

        if uri.chars().any(char::is_whitespace) {
            return Err(TrackError::Validation(format!(
                "URI must not contain whitespace: {:?}",
                uri
            )));
        }

        Ok(())
    }

    pub fn validate_revision(revision: &str) -> Result<()> {
        if revision.is_empty() || revision.chars().any(char::is_whitespace) {
            return Err(TrackError::Validation(format!(
                "Invalid revision identifier: {:?}",
                revision
            )));
        }
        Ok(())
    }

    pub fn validate_directory(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(TrackError::Validation(format!(
                "Directory does not exist: {}",
                path.display()
            )));
        }

        if !path.is_dir() {
            return Err(TrackError::Validation(format!(
                "Path is not a directory: {}",
                path.display()
            )));
        }

        Ok(())
    }

    /// Rejects absolute paths and `..` so a joined path stays under its root.
    pub fn validate_relative_path(path: &str) -> Result<()> {
        let escapes = Path::new(path).components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });

        if path.is_empty() || escapes {
            return Err(TrackError::Validation(format!(
                "Path must be relative to the repository root: {}",
                path
            )));
        }

        Ok(())
    }

    /// Forward slashes only. File names are otherwise kept byte for byte,
    /// including leading or trailing spaces.
    pub fn normalize_separators(path: &str) -> String {
        path.replace('\\', "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_uri() {
        assert!(Validator::validate_uri("https://example.com/repo.git").is_ok());
        assert!(Validator::validate_uri("/srv/git/repo").is_ok());
        assert!(Validator::validate_uri("").is_err());
        assert!(Validator::validate_uri("/srv/my repo").is_err());
        assert!(Validator::validate_uri("a\tb").is_err());
    }

    #[test]
    fn test_validate_revision() {
        assert!(Validator::validate_revision("abc123").is_ok());
        assert!(Validator::validate_revision("").is_err());
        assert!(Validator::validate_revision("abc 123").is_err());
    }

    #[test]
    fn test_validate_directory() {
        let temp = TempDir::new().unwrap();
        assert!(Validator::validate_directory(temp.path()).is_ok());
        assert!(Validator::validate_directory(Path::new("/nonexistent")).is_err());
    }

    #[test]
    fn test_validate_relative_path() {
        assert!(Validator::validate_relative_path("src/a.go").is_ok());
        assert!(Validator::validate_relative_path("../etc/passwd").is_err());
        assert!(Validator::validate_relative_path("src/../../x").is_err());
        assert!(Validator::validate_relative_path("/etc/passwd").is_err());
        assert!(Validator::validate_relative_path("").is_err());
    }

    #[test]
    fn test_normalize_separators() {
        assert_eq!(
            Validator::normalize_separators("path\\to\\file"),
            "path/to/file"
        );
        assert_eq!(Validator::normalize_separators("src/a.go "), "src/a.go ");
        assert_eq!(Validator::normalize_separators(" a.go"), " a.go");
    }
}
