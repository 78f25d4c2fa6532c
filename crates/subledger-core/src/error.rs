//! Error types for subledger core
//!
//! Store failures are translated here, at the component boundary. The
//! caller-facing variants carry no driver detail; the cause is logged where
//! the translation happens.

use crate::response::ErrorClass;
use subledger_config::ConfigError;
use subledger_store::StoreError;

/// Ingestion failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    /// A required field was absent or blank
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Body was not a JSON object of the expected shape
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Connecting to or writing the store failed
    #[error("subscription store unavailable")]
    StoreUnavailable,
}

impl IngestError {
    /// Client or server fault
    #[inline]
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MissingField(_) | Self::MalformedPayload(_) => ErrorClass::Client,
            Self::StoreUnavailable => ErrorClass::Server,
        }
    }
}

/// Aggregate query failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// Connecting or any of the reads failed
    #[error("subscription store unavailable")]
    StoreUnavailable,
}

impl QueryError {
    /// Always a server fault
    #[inline]
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Server
    }
}

/// Building typed settings from a snapshot failed
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// A setting was missing or unparsable
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `STORE_BACKEND` named nothing we know
    #[error("unknown store backend {0:?}, expected postgres, clickhouse or memory")]
    UnknownBackend(String),

    /// Store settings rejected (e.g. table name)
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_message_names_field() {
        let err = IngestError::MissingField("email");
        assert_eq!(err.to_string(), "Missing required field: email");
        assert_eq!(err.class(), ErrorClass::Client);
    }

    #[test]
    fn store_failures_are_server_class() {
        assert_eq!(IngestError::StoreUnavailable.class(), ErrorClass::Server);
        assert_eq!(QueryError::StoreUnavailable.class(), ErrorClass::Server);
    }
}
