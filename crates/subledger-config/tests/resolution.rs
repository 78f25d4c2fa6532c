//! Resolution priority across the standard key table

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::Arc;
use subledger_config::{
    keys, ConfigSource, KeyTable, MapEnvironment, ParameterStoreError, DEFAULT_NAMESPACE,
};
use subledger_test_utils::{resolve_with, ScriptedParameterStore};

#[derive(Debug, Clone, Copy)]
enum RemoteAnswer {
    Value,
    NotFound,
    Denied,
    Transport,
}

fn remote_answer() -> impl Strategy<Value = RemoteAnswer> {
    prop_oneof![
        Just(RemoteAnswer::Value),
        Just(RemoteAnswer::NotFound),
        Just(RemoteAnswer::Denied),
        Just(RemoteAnswer::Transport),
    ]
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #[test]
    fn each_key_takes_first_available_source(
        plan in prop::collection::vec((remote_answer(), any::<bool>()), 19)
    ) {
        let table = KeyTable::standard();
        prop_assert_eq!(table.len(), plan.len());

        let mut remote = ScriptedParameterStore::new();
        let mut env = MapEnvironment::new();
        for (spec, (answer, env_set)) in table.iter().zip(&plan) {
            let path = spec.remote_path(DEFAULT_NAMESPACE);
            remote = match answer {
                RemoteAnswer::Value => remote.with_value(path, format!("remote-{}", spec.name)),
                RemoteAnswer::NotFound => remote,
                RemoteAnswer::Denied => {
                    remote.with_error(path, ParameterStoreError::Service("AccessDeniedException".into()))
                }
                RemoteAnswer::Transport => {
                    remote.with_error(path, ParameterStoreError::Transport("timed out".into()))
                }
            };
            if *env_set {
                env = env.with(spec.name.clone(), format!("env-{}", spec.name));
            }
        }

        let snapshot = block_on(resolve_with(Some(Arc::new(remote)), env, &table));

        prop_assert_eq!(snapshot.len(), table.len());
        for (spec, (answer, env_set)) in table.iter().zip(&plan) {
            let (expected_source, expected_value) = match (answer, env_set) {
                (RemoteAnswer::Value, _) => (ConfigSource::Remote, format!("remote-{}", spec.name)),
                (_, true) => (ConfigSource::Environment, format!("env-{}", spec.name)),
                (_, false) => (ConfigSource::Default, spec.default.clone()),
            };
            prop_assert_eq!(snapshot.source_of(&spec.name), Some(expected_source));
            prop_assert_eq!(snapshot.get(&spec.name), Some(expected_value.as_str()));
        }
    }
}

#[tokio::test]
async fn unavailable_remote_falls_through_for_every_key() {
    let env = MapEnvironment::new().with(keys::POSTGRES_HOST, "db.internal");
    let snapshot = resolve_with(None, env, &KeyTable::standard()).await;

    assert_eq!(snapshot.get(keys::POSTGRES_HOST), Some("db.internal"));
    assert_eq!(
        snapshot.source_of(keys::POSTGRES_HOST),
        Some(ConfigSource::Environment)
    );
    assert!(snapshot
        .parameters()
        .filter(|p| p.key != keys::POSTGRES_HOST)
        .all(|p| p.source == ConfigSource::Default));
}

#[tokio::test]
async fn remote_is_asked_once_per_key() {
    let remote = Arc::new(ScriptedParameterStore::new());
    let table = KeyTable::standard();
    resolve_with(Some(Arc::clone(&remote)), MapEnvironment::new(), &table).await;

    let mut calls = remote.calls();
    calls.sort();
    let mut expected: Vec<_> = table
        .iter()
        .map(|spec| spec.remote_path(DEFAULT_NAMESPACE))
        .collect();
    expected.sort();
    assert_eq!(calls, expected);
}

#[tokio::test]
async fn secrets_are_masked_when_rendered() {
    let env = MapEnvironment::new().with(keys::POSTGRES_PASSWORD, "hunter2");
    let snapshot = resolve_with(None, env, &KeyTable::standard()).await;

    assert_eq!(snapshot.get(keys::POSTGRES_PASSWORD), Some("hunter2"));
    let rendered = snapshot.to_string();
    assert!(!rendered.contains("hunter2"));
    assert!(rendered.contains("********"));
}
