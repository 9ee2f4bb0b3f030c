//! Error types for I/O operations

use thiserror::Error;

/// Errors that can occur while fetching or scanning assets
#[derive(Error, Debug)]
pub enum IoError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<IoError> for twinview_core::Error {
    fn from(e: IoError) -> Self {
        match e {
            IoError::Io(io) => twinview_core::Error::Io(io),
            not_found @ IoError::FileNotFound { .. } => twinview_core::Error::InvalidData(not_found.to_string()),
        }
    }
}

/// Result type for asset I/O
pub type Result<T> = std::result::Result<T, IoError>;
