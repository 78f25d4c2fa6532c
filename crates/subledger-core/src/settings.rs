//! Typed application settings built from a resolved snapshot
//!
//! The snapshot is resolved once at startup; everything downstream receives
//! an [`AppSettings`] by reference and never reads the environment itself.

use crate::error::SettingsError;
use std::fmt;
use std::str::FromStr;
use subledger_config::{keys, ConfigError, ConfigSnapshot};
use subledger_store::{ClickHouseSettings, PostgresSettings, StoreSettings, TableName, WritePolicy};

/// Backend named by `STORE_BACKEND`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// `postgres`
    Postgres,
    /// `clickhouse`
    ClickHouse,
    /// `memory`
    Memory,
}

impl FromStr for BackendKind {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "clickhouse" => Ok(Self::ClickHouse),
            "memory" => Ok(Self::Memory),
            other => Err(SettingsError::UnknownBackend(other.to_string())),
        }
    }
}

/// Telemetry values passed through to the HTTP/exporter layer
#[derive(Clone, PartialEq, Eq)]
pub struct TelemetrySettings {
    /// Browser/exporter API key
    pub hyperdx_api_key: String,
    /// Service name for browser telemetry
    pub hyperdx_service_name: String,
    /// Browser telemetry endpoint
    pub hyperdx_endpoint: String,
    /// Backend service name
    pub otel_service_name: String,
    /// OTLP exporter endpoint
    pub otel_exporter_endpoint: String,
    /// Capture request and response bodies in network spans
    pub advanced_network_capture: bool,
}

impl fmt::Debug for TelemetrySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetrySettings")
            .field("hyperdx_api_key", &"<redacted>")
            .field("hyperdx_service_name", &self.hyperdx_service_name)
            .field("hyperdx_endpoint", &self.hyperdx_endpoint)
            .field("otel_service_name", &self.otel_service_name)
            .field("otel_exporter_endpoint", &self.otel_exporter_endpoint)
            .field("advanced_network_capture", &self.advanced_network_capture)
            .finish()
    }
}

/// Everything the core needs, typed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    /// Selected backend and its connection settings
    pub store: StoreSettings,
    /// Telemetry pass-through
    pub telemetry: TelemetrySettings,
}

impl AppSettings {
    /// Build from a snapshot resolved against [`KeyTable::standard`]
    ///
    /// Only the selected backend's keys are parsed, so a malformed port for
    /// an unused backend is not an error.
    ///
    /// [`KeyTable::standard`]: subledger_config::KeyTable::standard
    ///
    /// # Errors
    /// `SettingsError` for an unknown backend, a missing or unparsable key,
    /// or an invalid table name
    pub fn from_snapshot(snapshot: &ConfigSnapshot) -> Result<Self, SettingsError> {
        let backend: BackendKind = snapshot.require(keys::STORE_BACKEND)?.parse()?;

        let store = match backend {
            BackendKind::Postgres => StoreSettings::Postgres(PostgresSettings {
                host: owned(snapshot, keys::POSTGRES_HOST)?,
                port: snapshot.parse(keys::POSTGRES_PORT)?,
                username: owned(snapshot, keys::POSTGRES_USERNAME)?,
                password: owned(snapshot, keys::POSTGRES_PASSWORD)?,
                database: owned(snapshot, keys::POSTGRES_DATABASE)?,
                table: snapshot.require(keys::POSTGRES_TABLE_NAME)?.parse::<TableName>()?,
            }),
            BackendKind::ClickHouse => StoreSettings::ClickHouse(ClickHouseSettings {
                host: owned(snapshot, keys::CLICKHOUSE_HOST)?,
                port: snapshot.parse(keys::CLICKHOUSE_PORT)?,
                username: owned(snapshot, keys::CLICKHOUSE_USERNAME)?,
                password: owned(snapshot, keys::CLICKHOUSE_PASSWORD)?,
                database: owned(snapshot, keys::CLICKHOUSE_DATABASE)?,
                table: snapshot.require(keys::CLICKHOUSE_TABLE_NAME)?.parse::<TableName>()?,
            }),
            BackendKind::Memory => StoreSettings::Memory(WritePolicy::Upsert),
        };

        let telemetry = TelemetrySettings {
            hyperdx_api_key: owned(snapshot, keys::HYPERDX_API_KEY)?,
            hyperdx_service_name: owned(snapshot, keys::HYPERDX_SERVICE_NAME)?,
            hyperdx_endpoint: owned(snapshot, keys::HYPERDX_ENDPOINT)?,
            otel_service_name: owned(snapshot, keys::OTEL_SERVICE_NAME)?,
            otel_exporter_endpoint: owned(snapshot, keys::OTEL_EXPORTER_OTLP_ENDPOINT)?,
            advanced_network_capture: flag(
                snapshot,
                keys::HYPERDX_ENABLE_ADVANCED_NETWORK_CAPTURE,
            )?,
        };

        Ok(Self { store, telemetry })
    }
}

fn owned(snapshot: &ConfigSnapshot, key: &str) -> Result<String, SettingsError> {
    Ok(snapshot.require(key)?.to_string())
}

/// `1`/`0`, `true`/`false`, `yes`/`no`, case-insensitive
fn flag(snapshot: &ConfigSnapshot, key: &str) -> Result<bool, SettingsError> {
    match snapshot.require(key)?.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => Err(ConfigError::invalid_value(
            key,
            format!("expected a boolean flag, got {other:?}"),
        )
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names_are_case_insensitive() {
        assert_eq!("Postgres".parse::<BackendKind>().unwrap(), BackendKind::Postgres);
        assert_eq!(" clickhouse ".parse::<BackendKind>().unwrap(), BackendKind::ClickHouse);
        assert!(matches!(
            "mysql".parse::<BackendKind>(),
            Err(SettingsError::UnknownBackend(name)) if name == "mysql"
        ));
    }

    #[test]
    fn telemetry_debug_hides_key() {
        let telemetry = TelemetrySettings {
            hyperdx_api_key: "hdx-secret".to_string(),
            hyperdx_service_name: "svc".to_string(),
            hyperdx_endpoint: "https://in-otel.hyperdx.io".to_string(),
            otel_service_name: "backend".to_string(),
            otel_exporter_endpoint: "https://in-otel.hyperdx.io".to_string(),
            advanced_network_capture: true,
        };
        assert!(!format!("{telemetry:?}").contains("hdx-secret"));
    }
}
