//! Unified error type for the bakery ledger.
//!
//! Every core operation returns [`Result`]. Callers that need a structured
//! "kind + message" answer can use [`Error::kind`] together with `Display`.

use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use thiserror::Error;

/// All errors produced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Settings or catalog file problems.
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description
        message: String,
    },

    /// Rejected input, reported per field.
    #[error("Invalid {field}: {message}")]
    Validation {
        /// Name of the offending field
        field: &'static str,
        /// Why it was rejected
        message: String,
    },

    /// A record with the same natural key already exists.
    #[error("Conflict: {message}")]
    Conflict {
        /// Human-readable description
        message: String,
    },

    /// A deduction would drive the stock of a location below zero.
    #[error("Insufficient stock for product {product_id}: {available} available, {requested} requested")]
    InsufficientStock {
        /// Product being deducted
        product_id: i64,
        /// Quantity currently on hand
        available: i32,
        /// Quantity the caller tried to remove
        requested: i32,
    },

    /// A referenced record does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity name, e.g. `"Product"`
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Storage failure other than a unique violation.
    #[error("Database error: {0}")]
    Database(#[source] DbErr),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or unreadable environment variable.
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Out-of-range integer conversion.
    #[error("Integer conversion error: {0}")]
    IntConversion(#[from] std::num::TryFromIntError),
}

/// Coarse classification used when reporting errors to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Duplicate record; the caller should switch to the update flow
    Conflict,
    /// Input rejected
    Validation,
    /// Not enough central stock
    InsufficientStock,
    /// Referenced record missing
    NotFound,
    /// Storage, configuration or I/O failure
    Internal,
}

impl Error {
    /// Returns the structured kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Config { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::EnvVar(_)
            | Self::IntConversion(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

// Unique-constraint violations are conflicts, not storage failures.
impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => Self::Conflict { message: detail },
            _ => Self::Database(err),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
