//! Subscription ingestion
//!
//! Validate, normalize, then write one row through a freshly opened
//! connection. Whether a repeat email overwrites or appends is decided by the
//! connector's [`WritePolicy`].

use crate::error::IngestError;
use crate::subscription::SubscriptionPayload;
use serde::Serialize;
use std::sync::Arc;
use subledger_store::{with_connection, StoreConnector, WritePolicy};

/// Acknowledgement text for a stored submission
pub const SUBSCRIBED_MESSAGE: &str = "Successfully subscribed to updates!";

/// Successful ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ack {
    /// How the row was written
    pub policy: WritePolicy,
    /// Human-readable acknowledgement
    pub message: &'static str,
}

/// Validates and persists submissions
#[derive(Clone)]
pub struct SubscriptionIngestion {
    connector: Arc<dyn StoreConnector>,
}

impl std::fmt::Debug for SubscriptionIngestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionIngestion")
            .field("backend", &self.connector.backend())
            .field("policy", &self.connector.write_policy())
            .finish()
    }
}

impl SubscriptionIngestion {
    /// Create ingestion over `connector`
    #[must_use]
    pub fn new(connector: Arc<dyn StoreConnector>) -> Self {
        Self { connector }
    }

    /// Policy writes will use
    #[must_use]
    pub fn write_policy(&self) -> WritePolicy {
        self.connector.write_policy()
    }

    /// Ingest one submission
    ///
    /// Validation runs before any connection is opened.
    ///
    /// # Errors
    /// `MissingField` for blank required fields, `StoreUnavailable` if the
    /// connect or the write fails
    pub async fn ingest(
        &self,
        payload: &SubscriptionPayload,
        origin_address: &str,
    ) -> Result<Ack, IngestError> {
        tracing::info!("Processing subscription request");

        let row = payload.normalize(origin_address).inspect_err(|err| {
            tracing::warn!("Rejected subscription: {err}");
        })?;

        let policy = self.connector.write_policy();
        let backend = self.connector.backend();
        let source = row.source.clone();

        with_connection(self.connector.as_ref(), move |conn| {
            Box::pin(async move {
                match policy {
                    WritePolicy::Upsert => conn.upsert(&row).await,
                    WritePolicy::AppendOnly => conn.insert(&row).await,
                }
            })
        })
        .await
        .map_err(|err| {
            tracing::error!(backend, kind = %err.kind(), "Error processing subscription: {err}");
            IngestError::StoreUnavailable
        })?;

        tracing::info!(%policy, "New subscription from ******** via {source}");
        Ok(Ack {
            policy,
            message: SUBSCRIBED_MESSAGE,
        })
    }

    /// Parse a JSON body and ingest it
    ///
    /// # Errors
    /// `MalformedPayload` for a body that is not a JSON object, otherwise as
    /// [`Self::ingest`]
    pub async fn ingest_json(&self, body: &str, origin_address: &str) -> Result<Ack, IngestError> {
        let payload = SubscriptionPayload::from_json(body).inspect_err(|err| {
            tracing::warn!("Rejected subscription: {err}");
        })?;
        self.ingest(&payload, origin_address).await
    }
}
