use std::path::PathBuf;
use thiserror::Error;
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot stat {path}: {source}")]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("the output file '{0}' already exists, pass --file-append to append to it")]
    OutputExists(PathBuf),
    #[error("the output file '{0}' does not exist but appending was requested")]
    OutputMissing(PathBuf),
    #[error("invalid exclude pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("invalid time format '{0}'")]
    InvalidTimeFormat(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}
impl RecordError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RecordError::Io {
            path: path.into(),
            source,
        }
    }
    pub(crate) fn stat(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RecordError::Stat {
            path: path.into(),
            source,
        }
    }
    /// Whether this error only concerns a single entry and must not abort the run.
    pub fn is_entry_level(&self) -> bool {
        matches!(self, RecordError::Stat { .. })
    }
}
