//! Store reachability probe

use crate::response::HealthReport;
use chrono::Utc;
use std::sync::Arc;
use subledger_store::{StoreConnector, StoreErrorKind, StoreResult};

/// Outcome of one probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    /// Connect, `SELECT 1` and close all worked
    Healthy,
    /// Something failed; the class says what
    Unhealthy(StoreErrorKind),
}

impl Health {
    /// Whether the store answered
    #[inline]
    #[must_use]
    pub fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Issues a trivial round trip against the store
#[derive(Clone)]
pub struct HealthProbe {
    connector: Arc<dyn StoreConnector>,
}

impl std::fmt::Debug for HealthProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthProbe")
            .field("backend", &self.connector.backend())
            .finish()
    }
}

impl HealthProbe {
    /// Create probe over `connector`
    #[must_use]
    pub fn new(connector: Arc<dyn StoreConnector>) -> Self {
        Self { connector }
    }

    /// Probe the store; never fails
    ///
    /// A failed close counts against health. The connection is closed even
    /// when the ping fails, and the ping error wins.
    pub async fn check(&self) -> Health {
        tracing::debug!("Health check requested");
        match self.round_trip().await {
            Ok(()) => {
                tracing::info!("Health check passed - database connected");
                Health::Healthy
            }
            Err(err) => {
                tracing::error!(
                    backend = self.connector.backend(),
                    "Health check failed with error: {err}"
                );
                Health::Unhealthy(err.kind())
            }
        }
    }

    /// Probe and stamp the result
    pub async fn report(&self) -> HealthReport {
        let health = self.check().await;
        HealthReport::new(health, Utc::now())
    }

    async fn round_trip(&self) -> StoreResult<()> {
        let mut conn = self.connector.connect().await?;
        let pinged = conn.ping().await;
        let closed = conn.close().await;
        pinged.and(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subledger_store::MemoryStore;

    #[tokio::test]
    async fn memory_store_is_healthy() {
        let probe = HealthProbe::new(Arc::new(MemoryStore::upsert()));
        assert_eq!(probe.check().await, Health::Healthy);

        let before = Utc::now();
        let report = probe.report().await;
        assert!(report.healthy);
        assert!(report.checked_at >= before);
    }
}
