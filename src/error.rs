//! Error types for reconciliation.
//!
//! Errors are categorized so the sequencer can decide between waiting,
//! degrading, and transparently retrying. Every variant carries the text that
//! ends up in a condition message.

use conditions::Severity;
use thiserror::Error;

/// Categories of reconciliation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Referenced object is absent but may show up later
    TransientNotFound,
    /// Object exists but fails validation
    MalformedInput,
    /// Optimistic-concurrency clash while persisting
    Conflict,
    /// Collaborator failed for infrastructure reasons
    UpstreamUnavailable,
    /// The trigger cancelled the invocation
    Cancelled,
}

impl ErrorCategory {
    /// Whether this category is retried transparently.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict)
    }

    /// Severity of the condition recording an error of this category.
    pub fn severity(&self) -> Severity {
        match self {
            Self::TransientNotFound | Self::Cancelled => Severity::Info,
            Self::MalformedInput => Severity::Warning,
            Self::Conflict | Self::UpstreamUnavailable => Severity::Error,
        }
    }
}

/// Errors that can occur while reconciling an instance.
#[derive(Debug, Error)]
pub enum Error {
    /// Referenced object does not exist
    #[error("{kind} {name} not found")]
    NotFound {
        /// Kind of object (e.g. "secret")
        kind: &'static str,
        /// Object name
        name: String,
    },

    /// Secret exists but lacks a required key
    #[error("field {key} not found in secret {secret}")]
    MissingKey {
        /// Secret name
        secret: String,
        /// Missing key
        key: String,
    },

    /// Input exists but is invalid
    #[error("invalid input: {message}")]
    Malformed {
        /// What is wrong with the input
        message: String,
    },

    /// Object was modified concurrently
    #[error("conflict: {message}")]
    Conflict {
        /// Details from the store
        message: String,
    },

    /// Collaborator call failed
    #[error("upstream unavailable: {message}")]
    Unavailable {
        /// Details from the collaborator
        message: String,
    },

    /// Observed state does not match expectations yet
    #[error("{message}")]
    NotReady {
        /// What is not ready
        message: String,
    },

    /// Invocation was cancelled
    #[error("reconciliation cancelled")]
    Cancelled,

    /// Hash input could not be canonicalized
    #[error("hash error: {0}")]
    Hash(#[from] inputhash::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Worker pool could not be created
    #[error("failed to create worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NotFound { .. } => ErrorCategory::TransientNotFound,
            Error::MissingKey { .. }
            | Error::Malformed { .. }
            | Error::Hash(_)
            | Error::Json(_) => ErrorCategory::MalformedInput,
            Error::Conflict { .. } => ErrorCategory::Conflict,
            Error::Unavailable { .. } | Error::NotReady { .. } | Error::ThreadPool(_) => {
                ErrorCategory::UpstreamUnavailable
            }
            Error::Cancelled => ErrorCategory::Cancelled,
        }
    }

    /// Whether this error is retried transparently.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether this is a not-found error
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::TransientNotFound
    }

    /// Severity to record on the condition reporting this error.
    pub fn severity(&self) -> Severity {
        self.category().severity()
    }

    /// Shorthand for a not-found secret
    pub fn secret_not_found(name: impl Into<String>) -> Self {
        Error::NotFound {
            kind: "secret",
            name: name.into(),
        }
    }

    /// Shorthand for an upstream failure
    pub fn unavailable(message: impl Into<String>) -> Self {
        Error::Unavailable {
            message: message.into(),
        }
    }

    /// Shorthand for invalid input
    pub fn malformed(message: impl Into<String>) -> Self {
        Error::Malformed {
            message: message.into(),
        }
    }
}

/// Result type for reconciliation.
pub type Result<T> = std::result::Result<T, Error>;
