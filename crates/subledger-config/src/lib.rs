//! subledger settings resolution
//!
//! Resolves a table of named settings through a fixed chain:
//!
//! ```text
//! remote parameter store (namespace + suffix) → environment (logical name) → compiled default
//! ```
//!
//! Each key degrades on its own; resolution never fails and always yields a
//! complete, immutable [`ConfigSnapshot`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use subledger_config::{
//!     ConfigResolver, EnvironmentStrategy, KeyTable, RemoteStrategy, SsmParameterStore,
//! };
//!
//! let remote = match SsmParameterStore::connect(None).await {
//!     Ok(store) => RemoteStrategy::new(Arc::new(store)),
//!     Err(e) => RemoteStrategy::unavailable(e.to_string()),
//! };
//! let resolver = ConfigResolver::new(remote, EnvironmentStrategy::process());
//! let snapshot = resolver.resolve("/subledger/frontend", &KeyTable::standard()).await;
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod key_table;
pub mod parameter_store;
pub mod resolver;
pub mod snapshot;
pub mod source;

pub use error::{ConfigError, ParameterStoreError};
pub use key_table::{keys, KeySpec, KeyTable};
pub use parameter_store::{ParameterStore, SsmParameterStore};
pub use resolver::{ConfigResolver, DEFAULT_NAMESPACE, NAMESPACE_ENV};
pub use snapshot::{ConfigParameter, ConfigSnapshot};
pub use source::{
    ConfigSource, DefaultStrategy, Environment, EnvironmentStrategy, Lookup, MapEnvironment,
    ProcessEnvironment, RemoteStrategy, ResolutionStrategy,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
