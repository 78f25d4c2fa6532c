//! subledger core
//!
//! The decision logic between callers and the store:
//! - [`SubscriptionIngestion`]: validate, normalize, upsert or append one row
//! - [`StatsAggregator`]: total, trailing-window and per-source counts
//! - [`HealthProbe`]: one trivial round trip
//! - [`AppSettings`]: typed settings from a resolved [`ConfigSnapshot`]
//!
//! Each operation opens and closes its own store connection; components hold
//! nothing mutable and can be shared behind `Arc`.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use subledger_core::{SubscriptionIngestion, SubscriptionPayload};
//! use subledger_store::MemoryStore;
//!
//! # async fn example() -> Result<(), subledger_core::IngestError> {
//! let ingestion = SubscriptionIngestion::new(Arc::new(MemoryStore::upsert()));
//! let ack = ingestion
//!     .ingest(&SubscriptionPayload::new(" Ada ", "ADA@EX.COM", "blog"), "203.0.113.7")
//!     .await?;
//! println!("{}", ack.message);
//! # Ok(())
//! # }
//! ```
//!
//! [`ConfigSnapshot`]: subledger_config::ConfigSnapshot

#![warn(unreachable_pub)]

pub mod error;
pub mod health;
pub mod ingest;
pub mod response;
pub mod settings;
pub mod stats;
pub mod subscription;

pub use error::{IngestError, QueryError, SettingsError};
pub use health::{Health, HealthProbe};
pub use ingest::{Ack, SubscriptionIngestion, SUBSCRIBED_MESSAGE};
pub use response::{
    ErrorClass, HealthReport, IngestResponse, StatsResponse, INGEST_FAILURE_MESSAGE,
    STATS_FAILURE_MESSAGE,
};
pub use settings::{AppSettings, BackendKind, TelemetrySettings};
pub use stats::{AggregateSnapshot, StatsAggregator, RECENT_WINDOW_DAYS};
pub use subscription::{origin_address, SubscriptionPayload, REQUIRED_FIELDS};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with subledger core
    pub use crate::{
        AggregateSnapshot, AppSettings, Health, HealthProbe, IngestError, QueryError,
        StatsAggregator, SubscriptionIngestion, SubscriptionPayload,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
