//! Unified error type for the service.
//!
//! Variants fall into four classes that the HTTP layer maps to status codes:
//! validation failures, missing entities, persistence failures and broken
//! certificate chains. See [`Error::is_client_error`].

use thiserror::Error;

/// All errors produced by configuration, core logic and persistence.
#[derive(Debug, Error)]
pub enum Error {
    /// A required field is missing or malformed.
    #[error("{message}")]
    Validation {
        /// Human-readable description of the offending field
        message: String,
    },

    /// A monetary amount or quantity is negative, NaN or infinite.
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected value
        amount: f64,
    },

    /// One or more referenced entities do not exist.
    #[error("{entity} not found: {reference}")]
    NotFound {
        /// Kind of entity that was looked up (e.g. "Presupuesto")
        entity: &'static str,
        /// Identifier(s) that failed to resolve, comma separated
        reference: String,
    },

    /// A certificate chain link could not be applied atomically, or the
    /// stored chain violates its back-link invariant.
    #[error("Certificate chain inconsistency: {message}")]
    Consistency {
        /// Description of the broken link
        message: String,
    },

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },

    /// Underlying database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Stored JSON document could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O failure (configuration file, socket binding).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable present but unusable.
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::NotFound`] on a single identifier.
    pub fn not_found(entity: &'static str, reference: impl ToString) -> Self {
        Self::NotFound {
            entity,
            reference: reference.to_string(),
        }
    }

    /// Returns true for errors caused by the request rather than the server.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::InvalidAmount { .. } | Self::NotFound { .. }
        )
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
