//! Typed settings built from resolved snapshots

use pretty_assertions::assert_eq;
use std::sync::Arc;
use subledger_config::{keys, ConfigError, ConfigSource, KeyTable, MapEnvironment};
use subledger_core::{AppSettings, SettingsError};
use subledger_store::{StoreSettings, WritePolicy};
use subledger_test_utils::{resolve_with, snapshot_from_env, ScriptedParameterStore};

#[tokio::test]
async fn defaults_select_local_postgres() {
    let snapshot = snapshot_from_env(Vec::<(String, String)>::new()).await;
    let settings = AppSettings::from_snapshot(&snapshot).unwrap();

    let StoreSettings::Postgres(pg) = &settings.store else {
        panic!("expected postgres, got {:?}", settings.store);
    };
    assert_eq!(pg.host, "localhost");
    assert_eq!(pg.port, 5432);
    assert_eq!(pg.username, "postgres");
    assert_eq!(pg.password, "");
    assert_eq!(pg.table.as_str(), "users");
    assert_eq!(settings.telemetry.hyperdx_service_name, "flask-subscription-app");
    assert_eq!(settings.telemetry.otel_service_name, "my-backend-app");
    assert!(settings.telemetry.advanced_network_capture);
}

#[tokio::test]
async fn network_capture_flag_parses_common_spellings() {
    for (raw, expected) in [("0", false), ("FALSE", false), ("yes", true), (" 1 ", true)] {
        let snapshot =
            snapshot_from_env([(keys::HYPERDX_ENABLE_ADVANCED_NETWORK_CAPTURE, raw)]).await;
        let settings = AppSettings::from_snapshot(&snapshot).unwrap();
        assert_eq!(settings.telemetry.advanced_network_capture, expected, "{raw:?}");
    }

    let snapshot =
        snapshot_from_env([(keys::HYPERDX_ENABLE_ADVANCED_NETWORK_CAPTURE, "maybe")]).await;
    assert!(matches!(
        AppSettings::from_snapshot(&snapshot),
        Err(SettingsError::Config(ConfigError::InvalidValue { key, .. }))
            if key == keys::HYPERDX_ENABLE_ADVANCED_NETWORK_CAPTURE
    ));
}

#[tokio::test]
async fn clickhouse_selected_from_environment() {
    let snapshot = snapshot_from_env([
        (keys::STORE_BACKEND, "clickhouse"),
        (keys::CLICKHOUSE_HOST, "ch.internal"),
        (keys::CLICKHOUSE_PORT, "18123"),
    ])
    .await;
    let settings = AppSettings::from_snapshot(&snapshot).unwrap();

    let StoreSettings::ClickHouse(ch) = &settings.store else {
        panic!("expected clickhouse, got {:?}", settings.store);
    };
    assert_eq!(ch.host, "ch.internal");
    assert_eq!(ch.port, 18123);
    assert_eq!(ch.database, "default");
    assert_eq!(ch.table.as_str(), "subscriptions");
}

#[tokio::test]
async fn remote_values_beat_environment() {
    let remote = ScriptedParameterStore::new()
        .with_value("/subledger/frontend/store/backend", "memory")
        .with_value("/subledger/frontend/postgres/password", "from-ssm");
    let env = MapEnvironment::new()
        .with(keys::STORE_BACKEND, "postgres")
        .with(keys::POSTGRES_PASSWORD, "from-env");

    let snapshot = resolve_with(Some(Arc::new(remote)), env, &KeyTable::standard()).await;

    assert_eq!(snapshot.source_of(keys::STORE_BACKEND), Some(ConfigSource::Remote));
    assert_eq!(snapshot.get(keys::POSTGRES_PASSWORD), Some("from-ssm"));
    let settings = AppSettings::from_snapshot(&snapshot).unwrap();
    assert_eq!(settings.store, StoreSettings::Memory(WritePolicy::Upsert));
}

#[tokio::test]
async fn bad_port_is_invalid_value() {
    let snapshot = snapshot_from_env([(keys::POSTGRES_PORT, "fivefourthreetwo")]).await;
    let err = AppSettings::from_snapshot(&snapshot).unwrap_err();
    assert!(matches!(
        err,
        SettingsError::Config(ConfigError::InvalidValue { ref key, .. }) if key == keys::POSTGRES_PORT
    ));
}

#[tokio::test]
async fn unused_backend_keys_are_not_parsed() {
    let snapshot = snapshot_from_env([(keys::CLICKHOUSE_PORT, "not-a-port")]).await;
    assert!(AppSettings::from_snapshot(&snapshot).is_ok());
}

#[tokio::test]
async fn injected_table_name_is_rejected() {
    let snapshot = snapshot_from_env([(keys::POSTGRES_TABLE_NAME, "users; DROP TABLE users")]).await;
    assert!(matches!(
        AppSettings::from_snapshot(&snapshot),
        Err(SettingsError::Store(_))
    ));
}

#[tokio::test]
async fn unknown_backend_is_rejected() {
    let snapshot = snapshot_from_env([(keys::STORE_BACKEND, "sqlite")]).await;
    assert!(matches!(
        AppSettings::from_snapshot(&snapshot),
        Err(SettingsError::UnknownBackend(_))
    ));
}
