//! Store error types
//!
//! Every backend reports failures through [`StoreError`]. Messages may carry
//! driver detail (hosts, SQL text), so callers outside this workspace should
//! only ever see the [`StoreErrorKind`] label.

use std::fmt;

/// Boxed driver error
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store operation failure
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Connection could not be opened
    #[error("failed to connect to {backend}: {source}")]
    Connect {
        /// Backend label
        backend: &'static str,
        /// Driver error
        #[source]
        source: BoxError,
    },

    /// Statement or request failed after connecting
    #[error("{backend} query failed: {source}")]
    Query {
        /// Backend label
        backend: &'static str,
        /// Driver error
        #[source]
        source: BoxError,
    },

    /// Store answered with something unexpected
    #[error("{backend} returned an unexpected response: {message}")]
    Protocol {
        /// Backend label
        backend: &'static str,
        /// What was wrong
        message: String,
    },

    /// Backend cannot perform the operation
    #[error("{backend} does not support {operation}")]
    Unsupported {
        /// Backend label
        backend: &'static str,
        /// Operation name
        operation: &'static str,
    },

    /// Settings rejected before any I/O
    #[error("invalid store settings: {0}")]
    InvalidSettings(String),
}

impl StoreError {
    /// Connection failure
    pub fn connect(backend: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Connect {
            backend,
            source: source.into(),
        }
    }

    /// Query failure
    pub fn query(backend: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Query {
            backend,
            source: source.into(),
        }
    }

    /// Unexpected response
    pub fn protocol(backend: &'static str, message: impl Into<String>) -> Self {
        Self::Protocol {
            backend,
            message: message.into(),
        }
    }

    /// Failure class
    #[inline]
    #[must_use]
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            Self::Connect { .. } => StoreErrorKind::Connect,
            Self::Query { .. } => StoreErrorKind::Query,
            Self::Protocol { .. } => StoreErrorKind::Protocol,
            Self::Unsupported { .. } => StoreErrorKind::Unsupported,
            Self::InvalidSettings(_) => StoreErrorKind::Settings,
        }
    }
}

/// Coarse failure class, safe to expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// Could not connect
    Connect,
    /// Statement failed
    Query,
    /// Unexpected response
    Protocol,
    /// Operation unsupported by backend
    Unsupported,
    /// Bad settings
    Settings,
}

impl StoreErrorKind {
    /// Snake-case label
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Query => "query",
            Self::Protocol => "protocol",
            Self::Unsupported => "unsupported",
            Self::Settings => "settings",
        }
    }
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
