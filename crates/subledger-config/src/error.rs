//! Error types for settings resolution
//!
//! Two families live here:
//! - [`ParameterStoreError`]: a single remote lookup failed. The resolver
//!   consumes these and falls through to the next source; they never reach
//!   callers of [`crate::ConfigResolver::resolve`].
//! - [`ConfigError`]: reading a value out of a resolved snapshot failed.

/// Remote parameter store lookup failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParameterStoreError {
    /// The parameter does not exist at the requested path
    #[error("parameter not found: {0}")]
    NotFound(String),

    /// The store refused the request (credentials, permissions, throttling)
    #[error("parameter store rejected request: {0}")]
    Service(String),

    /// The request never produced a service response
    #[error("parameter store transport error: {0}")]
    Transport(String),

    /// The client could not be constructed at all
    #[error("parameter store unavailable: {0}")]
    Unavailable(String),
}

/// Errors reading typed values from a [`crate::ConfigSnapshot`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Key was not part of the resolved key table
    #[error("unknown setting: {0}")]
    UnknownKey(String),

    /// Value exists but does not parse as the requested type
    #[error("invalid value for {key}: {message}")]
    InvalidValue {
        /// Logical setting name
        key: String,
        /// Parser message
        message: String,
    },
}

impl ConfigError {
    /// Create invalid-value error for key
    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}
