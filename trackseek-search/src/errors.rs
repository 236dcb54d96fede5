//! Error types for search resolution.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures surfaced inside a `LoadResult` exception.
///
/// None of these ever reach the caller as a raised error; the dispatcher
/// captures them at its boundary and packs them into the envelope.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Query was rejected before any provider was contacted.
    #[error("Invalid query for source '{source_key}': {reason}")]
    InvalidQuery {
        /// The source the query was aimed at
        source_key: String,
        /// Why the query was rejected
        reason: String,
    },

    /// No provider is registered under the requested key.
    #[error("Unknown source: {source_key}")]
    UnknownSource {
        /// The key that failed to resolve
        source_key: String,
    },

    /// The provider itself failed.
    #[error("Provider '{source_key}' failed: {error}")]
    Provider {
        /// The source whose provider failed
        source_key: String,
        /// The underlying provider failure
        #[source]
        error: ProviderError,
    },
}

impl SearchError {
    /// Serializable tag for this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SearchError::InvalidQuery { .. } => ErrorKind::InvalidQuery,
            SearchError::UnknownSource { .. } => ErrorKind::UnknownSource,
            SearchError::Provider { .. } => ErrorKind::ProviderError,
        }
    }
}

/// Errors a provider can return from a single lookup.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The request never produced a response.
    #[error("Network error: {reason}")]
    Network {
        /// The reason for the network error
        reason: String,
    },

    /// The source answered with a non-success status.
    #[error("HTTP status {status}")]
    HttpStatus {
        /// Status code returned by the source
        status: u16,
    },

    /// Response body or endpoint could not be parsed.
    #[error("Parse error: {reason}")]
    Parse {
        /// The reason for the parse error
        reason: String,
    },

    /// The caller withdrew interest before the request settled.
    #[error("Request cancelled")]
    Cancelled,

    /// The provider future panicked.
    #[error("Provider panicked: {reason}")]
    Panicked {
        /// Panic payload, when it was a string
        reason: String,
    },
}

/// Kind tag carried by an envelope exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Caller supplied an unusable query.
    InvalidQuery,
    /// No provider registered for the key.
    UnknownSource,
    /// Transport or parse failure from the external source.
    ProviderError,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InvalidQuery => write!(f, "InvalidQuery"),
            ErrorKind::UnknownSource => write!(f, "UnknownSource"),
            ErrorKind::ProviderError => write!(f, "ProviderError"),
        }
    }
}
