//! Error types for the inputhash crate

use thiserror::Error;

/// Errors that can occur while hashing inputs
#[derive(Error, Debug)]
pub enum Error {
    /// Value could not be canonicalized
    #[error("failed to serialize hash input: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for hashing operations
pub type Result<T> = std::result::Result<T, Error>;
