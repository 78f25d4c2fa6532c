//! Aggregate statistics over stored subscriptions

use crate::error::QueryError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subledger_store::{order_source_counts, with_connection, SourceCount, StoreConnector};

/// Trailing window for the recent count, in days
pub const RECENT_WINDOW_DAYS: u32 = 7;

/// Counts computed on demand
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSnapshot {
    /// All rows
    pub total: u64,
    /// Rows submitted within [`RECENT_WINDOW_DAYS`]
    pub recent_window_count: u64,
    /// Rows per source tag, count descending then tag ascending
    pub by_source: Vec<SourceCount>,
}

/// Runs the read-only aggregate queries
#[derive(Clone)]
pub struct StatsAggregator {
    connector: Arc<dyn StoreConnector>,
}

impl std::fmt::Debug for StatsAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsAggregator")
            .field("backend", &self.connector.backend())
            .finish()
    }
}

impl StatsAggregator {
    /// Create aggregator over `connector`
    #[must_use]
    pub fn new(connector: Arc<dyn StoreConnector>) -> Self {
        Self { connector }
    }

    /// Compute a fresh snapshot on one connection
    ///
    /// # Errors
    /// `StoreUnavailable` if the connect or any query fails; no partial
    /// snapshot is returned
    pub async fn snapshot(&self) -> Result<AggregateSnapshot, QueryError> {
        tracing::info!("Fetching subscriber statistics");

        let mut snapshot = with_connection(self.connector.as_ref(), |conn| {
            Box::pin(async move {
                let total = conn.count_all().await?;
                tracing::debug!(total, "Total subscribers");
                let by_source = conn.count_by_source().await?;
                tracing::debug!(sources = by_source.len(), "Source statistics");
                let recent_window_count = conn.count_recent(RECENT_WINDOW_DAYS).await?;
                tracing::debug!(recent_window_count, "Recent subscribers");

                Ok(AggregateSnapshot {
                    total,
                    recent_window_count,
                    by_source,
                })
            })
        })
        .await
        .map_err(|err| {
            tracing::error!(
                backend = self.connector.backend(),
                kind = %err.kind(),
                "Error getting subscriber stats: {err}"
            );
            QueryError::StoreUnavailable
        })?;

        order_source_counts(&mut snapshot.by_source);
        Ok(snapshot)
    }
}
