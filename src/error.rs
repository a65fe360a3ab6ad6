//! Error types for the word library.

use std::path::PathBuf;
use thiserror::Error;

/// Every failure the library surfaces to its callers.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// The source path or file does not exist.
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    /// An import source contained no usable delimited file.
    #[error("no tabular data found in {}", .0.display())]
    NoTabularDataFound(PathBuf),

    /// Every located file produced zero usable entries.
    #[error("the library is empty or could not be parsed")]
    EmptyOrInvalid,

    /// Read permission for a user-granted location could not be acquired.
    #[error("permission required to read {}", .0.display())]
    SecurityAccessRequired(PathBuf),

    /// Writing to disk failed. The in-memory state still holds the change.
    #[error("failed to persist {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Archive extraction failed.
    #[error("archive extraction failed: {0}")]
    ExternalTool(String),

    #[error("invalid book name: {0:?}")]
    InvalidBookName(String),

    /// The reserved default book cannot be deleted.
    #[error("book {0:?} is reserved and cannot be deleted")]
    ReservedBook(String),

    /// An entry's word is empty after trimming.
    #[error("invalid word: {0:?}")]
    InvalidWord(String),

    #[error("no entry for word {0:?}")]
    UnknownWord(String),

    /// A book file could not be written as delimited text.
    #[error("delimited text error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`LibraryError`].
pub type Result<T> = std::result::Result<T, LibraryError>;

impl LibraryError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LibraryError::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Map a read failure on a user-supplied location onto the taxonomy.
    pub(crate) fn from_read(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::NotFound => LibraryError::NotFound(path),
            std::io::ErrorKind::PermissionDenied => LibraryError::SecurityAccessRequired(path),
            _ => LibraryError::Io(err),
        }
    }
}
