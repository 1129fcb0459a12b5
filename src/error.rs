//! Error types for aql-cursor.
//!
//! This module defines domain-specific error types organized by functional area.

use thiserror::Error;

/// Server error number reported when a cursor id is unknown or has expired.
pub const ERROR_CURSOR_NOT_FOUND: i64 = 1600;

/// Top-level error type encompassing all possible errors.
#[derive(Error, Debug)]
pub enum ArangoError {
    /// Connection configuration errors
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Statement validation and submission errors
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Cursor iteration and release errors
    #[error(transparent)]
    Cursor(#[from] CursorError),

    /// Transport protocol errors
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors related to connection configuration.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Invalid connection parameters
    #[error("Invalid connection parameter '{parameter}': {message}")]
    InvalidParameter { parameter: String, message: String },

    /// Connection string parsing error
    #[error("Failed to parse connection string: {0}")]
    ParseError(String),

    /// HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    ClientSetup(String),
}

/// Errors related to statement validation and submission.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The statement was rejected before any network call
    #[error("Invalid statement: {0}")]
    InvalidStatement(String),

    /// The initial submission failed
    #[error("Statement execution failed: {message}")]
    ExecutionFailed {
        /// HTTP status code reported by the server, if any
        code: Option<u16>,
        /// Server error number, if any
        error_num: Option<i64>,
        /// Human readable message
        message: String,
        /// Underlying transport failure
        #[source]
        source: TransportError,
    },
}

impl QueryError {
    /// Wrap a transport failure of the initial submission, lifting server diagnostics.
    pub(crate) fn execution_failed(source: TransportError) -> Self {
        let (code, error_num, message) = match &source {
            TransportError::Server {
                code,
                error_num,
                message,
            } => (Some(*code), Some(*error_num), message.clone()),
            other => (None, None, other.to_string()),
        };
        Self::ExecutionFailed {
            code,
            error_num,
            message,
            source,
        }
    }

    /// Server error number, when the server rejected the statement.
    pub fn error_num(&self) -> Option<i64> {
        match self {
            Self::ExecutionFailed { error_num, .. } => *error_num,
            Self::InvalidStatement(_) => None,
        }
    }
}

/// Errors related to cursor iteration and release.
#[derive(Error, Debug)]
pub enum CursorError {
    /// Fetching the next batch failed; the cursor is unchanged and the call may be retried
    #[error("Failed to fetch next batch: {0}")]
    FetchFailed(#[source] TransportError),

    /// The server no longer knows the cursor (expired or already deleted)
    #[error("Cursor '{id}' not found on server")]
    NotFound { id: String },

    /// `next()` was called past the last document
    #[error("Cursor is exhausted")]
    Exhausted,

    /// The cursor was deleted; it can no longer be used
    #[error("Cursor has been deleted")]
    Deleted,

    /// Server cursors are single-pass
    #[error("Cursor cannot be rewound")]
    NotRewindable,

    /// Releasing the server-side cursor failed
    #[error("Failed to delete cursor: {0}")]
    DeleteFailed(#[source] TransportError),

    /// A document could not be deserialized into the requested type
    #[error("Failed to decode document: {0}")]
    Decode(String),
}

impl CursorError {
    /// Whether the cursor can never yield another document after this error.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Exhausted | Self::Deleted | Self::NotRewindable | Self::NotFound { .. }
        )
    }
}

/// Errors related to the transport protocol.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Network or HTTP client failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request timed out in the transport
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The server answered with an error body
    #[error("Server error {code} (errorNum {error_num}): {message}")]
    Server {
        code: u16,
        error_num: i64,
        message: String,
    },

    /// The server no longer recognizes the cursor id
    #[error("Cursor '{id}' not found")]
    CursorNotFound { id: String },

    /// The reply could not be decoded into a batch
    #[error("Malformed server response: {0}")]
    MalformedResponse(String),

    /// Request serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Endpoint URL could not be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_decode() {
            TransportError::MalformedResponse(err.to_string())
        } else {
            TransportError::Http(err.to_string())
        }
    }
}
