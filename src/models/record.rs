// file: src/models/record.rs
// description: registry record model and its line-oriented wire shape
// reference: internal data structures

use crate::error::{Result, TrackError};
use serde::Serialize;
use std::fmt;

const MAX_FIELDS: usize = 3;

/// A tracked repository.
///
/// The root revision is write-once: it may go from absent to present but
/// never changes afterwards. A last processed revision is only ever present
/// alongside a root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryRecord {
    uri: String,
    root_revision: Option<String>,
    last_processed_revision: Option<String>,
}

impl RegistryRecord {
    /// A freshly registered record: last processed starts at the root.
    pub fn new(uri: impl Into<String>, root_revision: impl Into<String>) -> Self {
        let root = root_revision.into();
        Self {
            uri: uri.into(),
            last_processed_revision: Some(root.clone()),
            root_revision: Some(root),
        }
    }

    pub fn uri_only(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            root_revision: None,
            last_processed_revision: None,
        }
    }

    pub fn with_root(uri: impl Into<String>, root_revision: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            root_revision: Some(root_revision.into()),
            last_processed_revision: None,
        }
    }

    pub fn full(
        root_revision: impl Into<String>,
        last_processed_revision: impl Into<String>,
        uri: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            root_revision: Some(root_revision.into()),
            last_processed_revision: Some(last_processed_revision.into()),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn root_revision(&self) -> Option<&str> {
        self.root_revision.as_deref()
    }

    pub fn last_processed_revision(&self) -> Option<&str> {
        self.last_processed_revision.as_deref()
    }

    /// Revision the next diff starts from: last processed, else root.
    pub fn base_revision(&self) -> Option<&str> {
        self.last_processed_revision().or(self.root_revision())
    }

    /// Sets the root of a record that has none. Re-adopting the same root is a no-op.
    pub fn adopt_root(&mut self, root_revision: &str) -> Result<()> {
        match &self.root_revision {
            None => {
                self.root_revision = Some(root_revision.to_string());
                Ok(())
            }
            Some(stored) if stored == root_revision => Ok(()),
            Some(stored) => Err(TrackError::RootRevisionChanged {
                uri: self.uri.clone(),
                stored: stored.clone(),
                given: root_revision.to_string(),
            }),
        }
    }

    /// Copy of this record with the last processed revision moved to `head`.
    pub fn advanced_to(&self, head: &str) -> Result<Self> {
        if self.root_revision.is_none() {
            return Err(TrackError::Validation(format!(
                "cannot advance {} before a root revision is adopted",
                self.uri
            )));
        }

        Ok(Self {
            last_processed_revision: Some(head.to_string()),
            ..self.clone()
        })
    }
}

impl fmt::Display for RegistryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&RecordLine::from(self).render())
    }
}

/// The three line shapes the registry file accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordLine {
    UriOnly {
        uri: String,
    },
    UriWithRoot {
        root: String,
        uri: String,
    },
    Full {
        root: String,
        last: String,
        uri: String,
    },
}

impl RecordLine {
    /// Parses one registry line. Blank lines yield `None`.
    ///
    /// `line_number` is 1-based and only used for error reporting.
    pub fn parse(line: &str, line_number: usize) -> Result<Option<Self>> {
        let fields: Vec<&str> = line.split_whitespace().collect();

        let parsed = match fields.as_slice() {
            [] => return Ok(None),
            [uri] => RecordLine::UriOnly {
                uri: uri.to_string(),
            },
            [root, uri] => RecordLine::UriWithRoot {
                root: root.to_string(),
                uri: uri.to_string(),
            },
            [root, last, uri] => RecordLine::Full {
                root: root.to_string(),
                last: last.to_string(),
                uri: uri.to_string(),
            },
            _ => {
                return Err(TrackError::Parse {
                    line: line_number,
                    message: format!(
                        "expected at most {} fields, found {}",
                        MAX_FIELDS,
                        fields.len()
                    ),
                });
            }
        };

        Ok(Some(parsed))
    }

    pub fn render(&self) -> String {
        match self {
            RecordLine::UriOnly { uri } => uri.clone(),
            RecordLine::UriWithRoot { root, uri } => format!("{} {}", root, uri),
            RecordLine::Full { root, last, uri } => format!("{} {} {}", root, last, uri),
        }
    }
}

impl From<RecordLine> for RegistryRecord {
    fn from(line: RecordLine) -> Self {
        match line {
            RecordLine::UriOnly { uri } => RegistryRecord::uri_only(uri),
            RecordLine::UriWithRoot { root, uri } => RegistryRecord::with_root(uri, root),
            RecordLine::Full { root, last, uri } => RegistryRecord::full(root, last, uri),
        }
    }
}

impl From<&RegistryRecord> for RecordLine {
    fn from(record: &RegistryRecord) -> Self {
        let uri = record.uri.clone();
        match (&record.root_revision, &record.last_processed_revision) {
            (Some(root), Some(last)) => RecordLine::Full {
                root: root.clone(),
                last: last.clone(),
                uri,
            },
            (Some(root), None) => RecordLine::UriWithRoot {
                root: root.clone(),
                uri,
            },
            (None, _) => RecordLine::UriOnly { uri },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_line_shapes() {
        assert_eq!(
            RecordLine::parse("https://example.com/a.git", 1).unwrap(),
            Some(RecordLine::UriOnly {
                uri: "https://example.com/a.git".to_string()
            })
        );
        assert_eq!(
            RecordLine::parse("abc123\t/srv/repo", 1).unwrap(),
            Some(RecordLine::UriWithRoot {
                root: "abc123".to_string(),
                uri: "/srv/repo".to_string()
            })
        );
        assert_eq!(
            RecordLine::parse("  abc123  def456 u1 ", 1).unwrap(),
            Some(RecordLine::Full {
                root: "abc123".to_string(),
                last: "def456".to_string(),
                uri: "u1".to_string()
            })
        );
        assert_eq!(RecordLine::parse("   ", 1).unwrap(), None);
    }

    #[test]
    fn test_parse_rejects_extra_fields() {
        let err = RecordLine::parse("a b c d", 7).unwrap_err();
        assert!(matches!(err, TrackError::Parse { line: 7, .. }));
    }

    #[test]
    fn test_new_record_starts_at_root() {
        let record = RegistryRecord::new("u1", "abc123");
        assert_eq!(record.root_revision(), Some("abc123"));
        assert_eq!(record.last_processed_revision(), Some("abc123"));
        assert_eq!(record.to_string(), "abc123 abc123 u1");
    }

    #[test]
    fn test_base_revision_falls_back_to_root() {
        let record = RegistryRecord::with_root("u1", "abc123");
        assert_eq!(record.base_revision(), Some("abc123"));
        assert_eq!(RegistryRecord::uri_only("u1").base_revision(), None);
    }

    #[test]
    fn test_advance_keeps_root() {
        let record = RegistryRecord::new("u1", "abc123");
        let advanced = record.advanced_to("def456").unwrap();
        assert_eq!(advanced.root_revision(), Some("abc123"));
        assert_eq!(advanced.last_processed_revision(), Some("def456"));
        assert!(RegistryRecord::uri_only("u1").advanced_to("def456").is_err());
    }

    #[test]
    fn test_adopt_root_is_write_once() {
        let mut record = RegistryRecord::uri_only("u1");
        record.adopt_root("abc123").unwrap();
        record.adopt_root("abc123").unwrap();
        assert!(matches!(
            record.adopt_root("fff000"),
            Err(TrackError::RootRevisionChanged { .. })
        ));
        assert_eq!(record.root_revision(), Some("abc123"));
    }

    #[test]
    fn test_line_conversion_preserves_shape() {
        for record in [
            RegistryRecord::uri_only("u1"),
            RegistryRecord::with_root("u2", "abc"),
            RegistryRecord::full("abc", "def", "u3"),
        ] {
            let line = RecordLine::from(&record);
            let reparsed = RecordLine::parse(&line.render(), 1).unwrap().unwrap();
            assert_eq!(RegistryRecord::from(reparsed), record);
        }
    }
}
