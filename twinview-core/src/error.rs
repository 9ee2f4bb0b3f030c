//! Error types for twinview

use thiserror::Error;

/// Main error type for twinview operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("GPU error: {0}")]
    Gpu(String),
}

/// Result type alias for twinview operations
pub type Result<T> = std::result::Result<T, Error>;
