//! Result and error types for the core library

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::transaction::Txn;

/// One failed validation rule on a transaction field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    /// The transaction broke an entity invariant. Not fatal to the run.
    #[error("Validation error: {}", join_messages(.errors))]
    Validation {
        errors: Vec<FieldError>,
        txn: Box<Txn>,
    },

    /// Caller or mapping bug, e.g. a genuine external id collision. Fatal.
    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    #[error("Sync error: {0}")]
    Sync(String),

    #[error("Authentication failed: {0}")]
    SyncAuth(String),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Create an integrity error
    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    /// Create a sync error
    pub fn sync(msg: impl Into<String>) -> Self {
        Self::Sync(msg.into())
    }

    /// Create an authentication error
    pub fn sync_auth(msg: impl Into<String>) -> Self {
        Self::SyncAuth(msg.into())
    }

    /// Fatal errors abort the whole run instead of the current row
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Integrity(_))
    }

    /// Field-level errors for a validation failure
    pub fn field_errors(&self) -> Option<&[FieldError]> {
        match self {
            Self::Validation { errors, .. } => Some(errors),
            _ => None,
        }
    }

    /// Short type name reported in payloads
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "ValidationError",
            Self::Integrity(_) => "IntegrityError",
            Self::InvalidCurrency(_) => "InvalidCurrency",
            Self::Sync(_) => "SyncError",
            Self::SyncAuth(_) => "SyncAuthError",
            Self::Format(_) => "FormatError",
            Self::Config(_) => "ConfigError",
            Self::Io(_) => "IoError",
            Self::Json(_) => "JsonError",
            Self::Csv(_) => "CsvError",
        }
    }
}

fn join_messages(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(Error::integrity("dup").is_fatal());
        assert!(!Error::sync("timeout").is_fatal());
        assert!(!Error::Config("x".into()).is_fatal());
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Error::sync_auth("bad key").kind(), "SyncAuthError");
        assert_eq!(Error::integrity("dup").kind(), "IntegrityError");
    }

    #[test]
    fn test_field_error_display() {
        let err = FieldError::new("to_amount", "must be greater than 0");
        assert_eq!(err.to_string(), "to_amount must be greater than 0");
    }
}
