//! Connector and connection traits
//!
//! A [`StoreConnector`] holds settings only. Every operation opens its own
//! [`StoreConnection`] and closes it afterwards; nothing is pooled or shared
//! between operations.

use crate::error::{StoreError, StoreResult};
use crate::model::{NewSubscription, SourceCount, WritePolicy};
use async_trait::async_trait;
use futures::future::BoxFuture;

/// Opens connections to one backing store
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Backend label for logs
    fn backend(&self) -> &'static str;

    /// Duplicate-handling policy this store supports
    fn write_policy(&self) -> WritePolicy;

    /// Open a fresh connection
    async fn connect(&self) -> StoreResult<Box<dyn StoreConnection>>;
}

/// One open connection
#[async_trait]
pub trait StoreConnection: Send {
    /// Create the subscription relation if it does not exist
    async fn ensure_schema(&mut self) -> StoreResult<()>;

    /// Insert, or overwrite the row with the same email
    async fn upsert(&mut self, row: &NewSubscription) -> StoreResult<()>;

    /// Insert a new row unconditionally
    async fn insert(&mut self, row: &NewSubscription) -> StoreResult<()>;

    /// Total rows
    async fn count_all(&mut self) -> StoreResult<u64>;

    /// Rows submitted within the last `days` days, by the store's clock
    async fn count_recent(&mut self, days: u32) -> StoreResult<u64>;

    /// Rows per source tag, count descending then source ascending
    async fn count_by_source(&mut self) -> StoreResult<Vec<SourceCount>>;

    /// Trivial round trip
    async fn ping(&mut self) -> StoreResult<()>;

    /// Release the connection
    async fn close(self: Box<Self>) -> StoreResult<()>;
}

/// Run `op` on a freshly opened connection, closing it on every exit path
///
/// The connection is closed after `op` completes, whether it succeeded or
/// failed. A close failure after a successful `op` is logged and does not
/// replace `op`'s result. If the future is dropped mid-flight the connection
/// is dropped with it, which releases the underlying socket.
///
/// # Errors
/// The connect error, or whatever `op` returned
pub async fn with_connection<T, F>(connector: &dyn StoreConnector, op: F) -> StoreResult<T>
where
    T: Send,
    F: for<'c> FnOnce(&'c mut dyn StoreConnection) -> BoxFuture<'c, StoreResult<T>> + Send,
{
    let mut conn = connector.connect().await?;
    let result = op(conn.as_mut()).await;
    if let Err(err) = conn.close().await {
        log_close_failure(connector.backend(), &err);
    }
    result
}

fn log_close_failure(backend: &str, err: &StoreError) {
    tracing::warn!(backend, "failed to close store connection: {err}");
}
