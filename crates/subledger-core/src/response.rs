//! Caller-facing response shapes
//!
//! These are what an HTTP layer or the CLI serializes. None of them carry
//! store error detail.

use crate::error::{IngestError, QueryError};
use crate::health::Health;
use crate::ingest::Ack;
use crate::stats::AggregateSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Generic message for any ingestion store failure
pub const INGEST_FAILURE_MESSAGE: &str = "An error occurred while processing your subscription";

/// Generic message for any stats failure
pub const STATS_FAILURE_MESSAGE: &str = "Failed to retrieve statistics";

/// Whose fault a failure is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Bad input
    Client,
    /// Store or infrastructure
    Server,
}

impl ErrorClass {
    /// Conventional HTTP status
    #[inline]
    #[must_use]
    pub fn status_code(self) -> u16 {
        match self {
            Self::Client => 400,
            Self::Server => 500,
        }
    }
}

/// Result of one ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResponse {
    /// Whether the row was written
    pub success: bool,
    /// Acknowledgement text on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Error text on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestResponse {
    /// Build from an ingestion outcome
    #[must_use]
    pub fn from_result(result: &Result<Ack, IngestError>) -> Self {
        match result {
            Ok(ack) => Self {
                success: true,
                message: Some(ack.message.to_string()),
                error: None,
            },
            Err(err) => Self {
                success: false,
                message: None,
                error: Some(match err {
                    IngestError::MissingField(_) | IngestError::MalformedPayload(_) => {
                        err.to_string()
                    }
                    IngestError::StoreUnavailable => INGEST_FAILURE_MESSAGE.to_string(),
                }),
            },
        }
    }
}

/// Result of one stats query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatsResponse {
    /// The aggregate
    Snapshot(AggregateSnapshot),
    /// Generic failure
    Failed {
        /// Error text
        error: String,
    },
}

impl StatsResponse {
    /// Build from a stats outcome
    #[must_use]
    pub fn from_result(result: Result<AggregateSnapshot, QueryError>) -> Self {
        match result {
            Ok(snapshot) => Self::Snapshot(snapshot),
            Err(_) => Self::Failed {
                error: STATS_FAILURE_MESSAGE.to_string(),
            },
        }
    }

    /// Failure class, if this is a failure
    #[must_use]
    pub fn error_class(&self) -> Option<ErrorClass> {
        match self {
            Self::Snapshot(_) => None,
            Self::Failed { .. } => Some(ErrorClass::Server),
        }
    }
}

/// Result of one health probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Store answered the liveness query
    pub healthy: bool,
    /// Failure class when unhealthy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// When the probe finished
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    /// Report `health` as of `checked_at`
    #[must_use]
    pub fn new(health: Health, checked_at: DateTime<Utc>) -> Self {
        match health {
            Health::Healthy => Self {
                healthy: true,
                reason: None,
                checked_at,
            },
            Health::Unhealthy(kind) => Self {
                healthy: false,
                reason: Some(kind.to_string()),
                checked_at,
            },
        }
    }

    /// Failure class, if unhealthy
    #[must_use]
    pub fn error_class(&self) -> Option<ErrorClass> {
        (!self.healthy).then_some(ErrorClass::Server)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::SUBSCRIBED_MESSAGE;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use subledger_store::{StoreErrorKind, WritePolicy};

    #[test]
    fn success_response_has_message_only() {
        let ack = Ack {
            policy: WritePolicy::Upsert,
            message: SUBSCRIBED_MESSAGE,
        };
        let value = serde_json::to_value(IngestResponse::from_result(&Ok(ack))).unwrap();
        assert_eq!(
            value,
            json!({"success": true, "message": "Successfully subscribed to updates!"})
        );
    }

    #[test]
    fn store_failure_is_generic() {
        let response = IngestResponse::from_result(&Err(IngestError::StoreUnavailable));
        assert_eq!(response.error.as_deref(), Some(INGEST_FAILURE_MESSAGE));
        assert!(!response.success);
    }

    #[test]
    fn missing_field_names_the_field() {
        let response = IngestResponse::from_result(&Err(IngestError::MissingField("source")));
        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({"success": false, "error": "Missing required field: source"})
        );
    }

    #[test]
    fn stats_failure_hides_cause() {
        let response = StatsResponse::from_result(Err(QueryError::StoreUnavailable));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"error": "Failed to retrieve statistics"})
        );
        assert_eq!(response.error_class(), Some(ErrorClass::Server));
    }

    #[test]
    fn unhealthy_report_carries_class() {
        let report = HealthReport::new(Health::Unhealthy(StoreErrorKind::Connect), Utc::now());
        assert!(!report.healthy);
        assert_eq!(report.reason.as_deref(), Some("connect"));
        assert_eq!(report.error_class(), Some(ErrorClass::Server));

        let value = serde_json::to_value(HealthReport::new(Health::Healthy, Utc::now())).unwrap();
        assert!(value.get("reason").is_none());
        assert_eq!(value["healthy"], true);
    }
}
