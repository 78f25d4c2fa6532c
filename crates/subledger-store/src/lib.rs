//! Subscription storage
//!
//! Per-operation connections to the backing store. A [`StoreConnector`]
//! carries settings only; [`with_connection`] opens a [`StoreConnection`],
//! runs one operation, and closes it again.
//!
//! Backends:
//! - [`PostgresConnector`]: unique email, [`WritePolicy::Upsert`]
//! - [`ClickHouseConnector`]: append-only MergeTree, [`WritePolicy::AppendOnly`]
//! - [`MemoryStore`]: in-process, either policy
//!
//! # Example
//!
//! ```rust,ignore
//! use subledger_store::{with_connection, MemoryStore};
//!
//! # async fn example() -> subledger_store::StoreResult<()> {
//! let store = MemoryStore::upsert();
//! let total = with_connection(&store, |conn| Box::pin(async move { conn.count_all().await })).await?;
//! assert_eq!(total, 0);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod clickhouse;
pub mod connector;
pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;

use std::sync::Arc;

pub use clickhouse::{ClickHouseConnection, ClickHouseConnector, ClickHouseSettings};
pub use connector::{with_connection, StoreConnection, StoreConnector};
pub use error::{BoxError, StoreError, StoreErrorKind, StoreResult};
pub use memory::{MemoryConnection, MemoryStore};
pub use model::{
    order_source_counts, NewSubscription, SourceCount, StoredSubscription, TableName, WritePolicy,
};
pub use postgres::{PostgresConnection, PostgresConnector, PostgresSettings};

/// Which backend to connect to, with its settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSettings {
    /// Postgres with unique email
    Postgres(PostgresSettings),
    /// ClickHouse, append-only
    ClickHouse(ClickHouseSettings),
    /// Fresh in-process store
    Memory(WritePolicy),
}

impl StoreSettings {
    /// Backend label
    #[must_use]
    pub fn backend(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::ClickHouse(_) => "clickhouse",
            Self::Memory(_) => "memory",
        }
    }
}

/// Build the connector for `settings`
///
/// No I/O happens here; the first connection is opened by the first operation.
///
/// # Errors
/// `StoreError::InvalidSettings` if the settings cannot form an endpoint
pub fn connector_for(settings: &StoreSettings) -> StoreResult<Arc<dyn StoreConnector>> {
    let connector: Arc<dyn StoreConnector> = match settings {
        StoreSettings::Postgres(pg) => Arc::new(PostgresConnector::new(pg)),
        StoreSettings::ClickHouse(ch) => Arc::new(ClickHouseConnector::new(ch)?),
        StoreSettings::Memory(policy) => Arc::new(MemoryStore::new(*policy)),
    };
    Ok(connector)
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
