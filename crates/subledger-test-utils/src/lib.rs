//! Testing utilities for subledger workspace
//!
//! Shared test helpers, fixtures, and store wrappers.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use subledger_config::{
    ConfigResolver, ConfigSnapshot, EnvironmentStrategy, KeyTable, MapEnvironment,
    ParameterStore, ParameterStoreError, RemoteStrategy, DEFAULT_NAMESPACE,
};
use subledger_core::SubscriptionPayload;
use subledger_store::{
    MemoryStore, NewSubscription, SourceCount, StoreConnection, StoreConnector, StoreError,
    StoreResult, StoredSubscription, WritePolicy,
};

// ---------------------------------------------------------------------------
// Parameter store
// ---------------------------------------------------------------------------

/// Parameter store answering from a fixed script; unscripted paths are NotFound
#[derive(Debug, Default)]
pub struct ScriptedParameterStore {
    answers: HashMap<String, Result<String, ParameterStoreError>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, path: impl Into<String>, value: impl Into<String>) -> Self {
        self.answers.insert(path.into(), Ok(value.into()));
        self
    }

    pub fn with_error(mut self, path: impl Into<String>, err: ParameterStoreError) -> Self {
        self.answers.insert(path.into(), Err(err));
        self
    }

    /// Paths requested so far
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ParameterStore for ScriptedParameterStore {
    async fn get_parameter(&self, path: &str) -> Result<String, ParameterStoreError> {
        self.calls.lock().push(path.to_string());
        self.answers
            .get(path)
            .cloned()
            .unwrap_or_else(|| Err(ParameterStoreError::NotFound(path.to_string())))
    }
}

/// Resolve `table` with an optional scripted remote and a fixed environment
pub async fn resolve_with(
    remote: Option<Arc<ScriptedParameterStore>>,
    env: MapEnvironment,
    table: &KeyTable,
) -> ConfigSnapshot {
    let remote = match remote {
        Some(store) => RemoteStrategy::new(store),
        None => RemoteStrategy::unavailable("no credentials"),
    };
    ConfigResolver::new(remote, EnvironmentStrategy::new(Arc::new(env)))
        .resolve(DEFAULT_NAMESPACE, table)
        .await
}

/// Standard-table snapshot from environment pairs only
pub async fn snapshot_from_env<I, K, V>(pairs: I) -> ConfigSnapshot
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    resolve_with(None, pairs.into_iter().collect(), &KeyTable::standard()).await
}

// ---------------------------------------------------------------------------
// Payloads and rows
// ---------------------------------------------------------------------------

pub fn payload(name: &str, email: &str, source: &str) -> SubscriptionPayload {
    SubscriptionPayload::new(name, email, source)
}

pub fn ada() -> SubscriptionPayload {
    payload(" Ada ", "ADA@EX.COM", "blog")
}

/// Seed a row submitted `age_days` ago
pub fn seed_row(store: &MemoryStore, email: &str, source: &str, age_days: i64) {
    let row = NewSubscription {
        name: "Seeded".to_string(),
        company: String::new(),
        email: email.to_string(),
        source: source.to_string(),
        origin_address: String::new(),
    };
    store.seed(StoredSubscription::from_new(
        &row,
        Utc::now() - Duration::days(age_days),
    ));
}

/// Seed `count` recent rows per source with distinct emails
pub fn seed_sources(store: &MemoryStore, counts: &[(&str, usize)]) {
    for (source, count) in counts {
        for i in 0..*count {
            seed_row(store, &format!("{source}-{i}@ex.com"), source, 0);
        }
    }
}

// ---------------------------------------------------------------------------
// Connectors
// ---------------------------------------------------------------------------

/// Counts connects and closes on the wrapped connector
#[derive(Clone)]
pub struct CountingConnector {
    inner: Arc<dyn StoreConnector>,
    connects: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl CountingConnector {
    pub fn new(inner: Arc<dyn StoreConnector>) -> Self {
        Self {
            inner,
            connects: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreConnector for CountingConnector {
    fn backend(&self) -> &'static str {
        self.inner.backend()
    }

    fn write_policy(&self) -> WritePolicy {
        self.inner.write_policy()
    }

    async fn connect(&self) -> StoreResult<Box<dyn StoreConnection>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.connect().await?;
        Ok(Box::new(InjectedConnection {
            inner,
            fail_at: None,
            closes: Arc::clone(&self.closes),
        }))
    }
}

/// Operation a [`FailingConnector`] breaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Connect,
    Write,
    CountAll,
    CountRecent,
    CountBySource,
    Ping,
    Close,
}

/// Memory-backed connector that fails one chosen operation
#[derive(Clone)]
pub struct FailingConnector {
    store: MemoryStore,
    fail_at: FailAt,
    closes: Arc<AtomicUsize>,
}

impl FailingConnector {
    pub fn new(fail_at: FailAt) -> Self {
        Self::with_store(MemoryStore::upsert(), fail_at)
    }

    pub fn with_store(store: MemoryStore, fail_at: FailAt) -> Self {
        Self {
            store,
            fail_at,
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreConnector for FailingConnector {
    fn backend(&self) -> &'static str {
        "failing"
    }

    fn write_policy(&self) -> WritePolicy {
        self.store.write_policy()
    }

    async fn connect(&self) -> StoreResult<Box<dyn StoreConnection>> {
        if self.fail_at == FailAt::Connect {
            return Err(StoreError::connect("failing", "connection refused"));
        }
        let inner = self.store.connect().await?;
        Ok(Box::new(InjectedConnection {
            inner,
            fail_at: Some(self.fail_at),
            closes: Arc::clone(&self.closes),
        }))
    }
}

struct InjectedConnection {
    inner: Box<dyn StoreConnection>,
    fail_at: Option<FailAt>,
    closes: Arc<AtomicUsize>,
}

impl InjectedConnection {
    fn check(&self, op: FailAt) -> StoreResult<()> {
        if self.fail_at == Some(op) {
            Err(StoreError::query("failing", format!("injected {op:?} failure")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StoreConnection for InjectedConnection {
    async fn ensure_schema(&mut self) -> StoreResult<()> {
        self.inner.ensure_schema().await
    }

    async fn upsert(&mut self, row: &NewSubscription) -> StoreResult<()> {
        self.check(FailAt::Write)?;
        self.inner.upsert(row).await
    }

    async fn insert(&mut self, row: &NewSubscription) -> StoreResult<()> {
        self.check(FailAt::Write)?;
        self.inner.insert(row).await
    }

    async fn count_all(&mut self) -> StoreResult<u64> {
        self.check(FailAt::CountAll)?;
        self.inner.count_all().await
    }

    async fn count_recent(&mut self, days: u32) -> StoreResult<u64> {
        self.check(FailAt::CountRecent)?;
        self.inner.count_recent(days).await
    }

    async fn count_by_source(&mut self) -> StoreResult<Vec<SourceCount>> {
        self.check(FailAt::CountBySource)?;
        self.inner.count_by_source().await
    }

    async fn ping(&mut self) -> StoreResult<()> {
        self.check(FailAt::Ping)?;
        self.inner.ping().await
    }

    async fn close(self: Box<Self>) -> StoreResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.check(FailAt::Close)?;
        self.inner.close().await
    }
}
