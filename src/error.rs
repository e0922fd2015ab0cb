//! Error handling for the driver bookings reset job
//!
//! Store-level errors are classified once, at the boundary with the backing
//! store, and the reset service maps them onto the job-level taxonomy.

use std::time::Duration;

use strum::Display;
use thiserror::Error;

/// Broad classification of a store failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum StoreErrorKind {
    /// Network, timeout, contention or quota problems that may clear up by themselves
    Transient,
    /// Credentials or access revoked
    Permission,
    /// Anything else (schema mismatch, malformed request)
    Other,
}

/// Errors raised by a [`crate::store::BookingStore`] implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Batch of {size} writes exceeds store limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            StoreError::Unavailable(_) => StoreErrorKind::Transient,
            StoreError::PermissionDenied(_) => StoreErrorKind::Permission,
            StoreError::BatchTooLarge { .. } | StoreError::Backend(_) => StoreErrorKind::Other,
        }
    }

    pub fn unavailable(message: &str) -> Self {
        StoreError::Unavailable(message.to_string())
    }

    pub fn permission_denied(message: &str) -> Self {
        StoreError::PermissionDenied(message.to_string())
    }
}

// SQLite primary result codes (extended codes share the low byte)
const SQLITE_PERM: i64 = 3;
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;
const SQLITE_READONLY: i64 = 8;
const SQLITE_AUTH: i64 = 23;

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreError::Unavailable(error.to_string()),
            sqlx::Error::Database(db_error) => {
                let code = db_error.code().map(|code| code.into_owned()).unwrap_or_default();
                classify_database_code(&code, error.to_string())
            }
            _ => StoreError::Backend(error.to_string()),
        }
    }
}

/// Map a database error code (SQLSTATE for PostgreSQL, numeric for SQLite) to a store error
fn classify_database_code(code: &str, message: String) -> StoreError {
    // PostgreSQL SQLSTATE classes
    match code {
        "42501" | "28000" | "28P01" => return StoreError::PermissionDenied(message),
        "40001" | "40P01" | "57014" | "57P01" | "57P03" => return StoreError::Unavailable(message),
        // Connection exceptions and insufficient resources
        _ if code.len() == 5 && (code.starts_with("08") || code.starts_with("53")) => {
            return StoreError::Unavailable(message)
        }
        _ => {}
    }

    match code.parse::<i64>().map(|code| code & 0xff) {
        Ok(SQLITE_PERM | SQLITE_READONLY | SQLITE_AUTH) => StoreError::PermissionDenied(message),
        Ok(SQLITE_BUSY | SQLITE_LOCKED) => StoreError::Unavailable(message),
        _ => StoreError::Backend(message),
    }
}

/// Errors returned by a reset run
#[derive(Error, Debug)]
pub enum ResetError {
    #[error("Transient store failure: {0}")]
    TransientStore(#[source] StoreError),

    #[error("Store permission failure: {0}")]
    Permission(#[source] StoreError),

    #[error("Store failure: {0}")]
    Store(#[source] StoreError),

    #[error(
        "Partial batch failure: {committed_chunks} of {total_chunks} chunks committed \
         ({records_updated} records reset) before: {source}"
    )]
    PartialBatchFailure {
        committed_chunks: usize,
        total_chunks: usize,
        records_updated: usize,
        #[source]
        source: StoreError,
    },

    #[error("Invalid batch limit: {0}")]
    InvalidBatchLimit(usize),

    #[error("Reset run exceeded its {0:?} time limit and may have partially applied")]
    TimedOut(Duration),
}

impl ResetError {
    /// Classify a store failure that happened before any chunk was committed
    pub fn from_store(error: StoreError) -> Self {
        match error.kind() {
            StoreErrorKind::Transient => ResetError::TransientStore(error),
            StoreErrorKind::Permission => ResetError::Permission(error),
            StoreErrorKind::Other => ResetError::Store(error),
        }
    }

    /// Get error code for log output
    pub fn error_code(&self) -> &'static str {
        match self {
            ResetError::TransientStore(_) => "TransientStoreError",
            ResetError::Permission(_) => "PermissionError",
            ResetError::Store(_) => "StoreError",
            ResetError::PartialBatchFailure { .. } => "PartialBatchFailure",
            ResetError::InvalidBatchLimit(_) => "InvalidBatchLimit",
            ResetError::TimedOut(_) => "TimedOut",
        }
    }

    /// Whether re-running the whole job later can be expected to succeed
    /// without operator intervention
    pub fn is_retryable(&self) -> bool {
        match self {
            ResetError::TransientStore(_) | ResetError::TimedOut(_) => true,
            ResetError::PartialBatchFailure { source, .. } => {
                source.kind() != StoreErrorKind::Permission
            }
            ResetError::Permission(_) | ResetError::Store(_) | ResetError::InvalidBatchLimit(_) => {
                false
            }
        }
    }

    /// Whether an operator has to step in before the next run can succeed
    pub fn requires_operator(&self) -> bool {
        match self {
            ResetError::Permission(_) => true,
            ResetError::PartialBatchFailure { source, .. } => {
                source.kind() == StoreErrorKind::Permission
            }
            _ => false,
        }
    }
}

/// Result type alias for reset operations
pub type ResetResult<T> = Result<T, ResetError>;
