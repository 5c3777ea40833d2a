//! Error types for bulk retrieval.
//!
//! Transport failures are kept apart from payload validation failures so that
//! callers can tell "the API was unreachable" from "the API answered with
//! something we do not understand".

use thiserror::Error;

/// Result type for bulk load operations.
pub type LoadResult<T> = std::result::Result<T, BulkLoadError>;

/// Failure while talking to the remote API.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent or the body could not be read.
    #[error("request to {path} failed: {source}")]
    Network {
        /// Request path relative to the API root.
        path: String,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The request exceeded the per-request timeout.
    #[error("request to {path} timed out")]
    Timeout {
        /// Request path relative to the API root.
        path: String,
    },

    /// The server answered with a non-2xx status.
    #[error("{path} returned HTTP {status}: {message}")]
    Status {
        /// Request path relative to the API root.
        path: String,
        /// HTTP status code.
        status: u16,
        /// Server supplied `message`, or the raw body when there is none.
        message: String,
    },

    /// The request path could not be turned into a valid URL.
    #[error("invalid request url for {path}: {message}")]
    InvalidUrl {
        /// Request path relative to the API root.
        path: String,
        /// Parser error message.
        message: String,
    },
}

impl TransportError {
    /// HTTP status carried by this error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status {
                status, ..
            } => Some(*status),
            _ => None,
        }
    }
}

/// The API answered with a payload that does not match the expected envelope.
#[derive(Debug, Error)]
#[error("unexpected payload from {path}: {message}")]
pub struct SchemaError {
    /// Request path relative to the API root.
    pub path: String,
    /// What was wrong with the payload.
    pub message: String,
}

impl SchemaError {
    /// Build a schema error for `path`.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Every way a bulk load can fail.
///
/// Transport errors from the count call or any page call are carried through
/// unchanged in [`BulkLoadError::Transport`].
#[derive(Debug, Error)]
pub enum BulkLoadError {
    /// Network failure, timeout or non-2xx response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Malformed response payload.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The cancellation token fired before the load finished.
    #[error("bulk load cancelled after {completed_pages} page(s)")]
    Cancelled {
        /// Pages fully received before cancellation was observed.
        completed_pages: u64,
    },

    /// A page size of zero was requested.
    #[error("page size must be greater than zero")]
    InvalidPageSize,

    /// The pages delivered a different number of rows than the count call.
    #[error("count reported {expected} rows but pages returned {received}")]
    CountMismatch {
        /// Row count reported by the count endpoint.
        expected: u64,
        /// Rows actually accumulated across all pages.
        received: u64,
    },
}

/// Failure while building an HTTP transport from configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The API root is not a valid absolute URL.
    #[error("invalid api base url {url}: {message}")]
    InvalidBaseUrl {
        /// Offending URL.
        url: String,
        /// Parser error message.
        message: String,
    },

    /// The proxy URL was rejected by the HTTP client.
    #[error("invalid proxy url {url}: {source}")]
    InvalidProxy {
        /// Offending proxy URL.
        url: String,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// A credential contains characters that cannot be sent in a header.
    #[error("credential for header {header} is not a valid header value")]
    InvalidCredential {
        /// Header the credential was meant for.
        header: &'static str,
    },

    /// The HTTP client could not be built.
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}
