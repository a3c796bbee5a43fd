//! Error types for the richflow core library
//!
//! Errors are raised at chain construction, merge and source-opening time.
//! Evaluation never returns errors: panics from caller-supplied closures
//! unwind through the pull/push call that triggered them.

use thiserror::Error;

pub mod io;
pub mod validation;

pub use self::io::{IoError, IoErrorKind};
pub use self::validation::ValidationError;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the richflow core library
///
/// Errors are categorized into two types:
/// - Validation errors: invalid stage, window or merge configuration
/// - I/O errors: sources backed by the file system
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration rejected at construction time
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// I/O related errors
    #[error(transparent)]
    Io(#[from] IoError),
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io(IoError::from_std(source))
    }
}

impl Error {
    /// Whether this error was raised while building or merging a chain
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
