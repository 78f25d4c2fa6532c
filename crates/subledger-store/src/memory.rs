//! In-process store
//!
//! Holds rows in a shared vector and honours a chosen [`WritePolicy`], so the
//! same ingestion code can be exercised against both duplicate-handling
//! semantics without a database. Timestamps come from the store's own clock.

use crate::connector::{StoreConnection, StoreConnector};
use crate::error::{StoreError, StoreResult};
use crate::model::{order_source_counts, NewSubscription, SourceCount, StoredSubscription, WritePolicy};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

const BACKEND: &str = "memory";

/// Shared in-memory subscription table
#[derive(Debug, Clone)]
pub struct MemoryStore {
    rows: Arc<Mutex<Vec<StoredSubscription>>>,
    policy: WritePolicy,
}

impl MemoryStore {
    /// Create empty store with `policy`
    #[inline]
    #[must_use]
    pub fn new(policy: WritePolicy) -> Self {
        Self {
            rows: Arc::new(Mutex::new(Vec::new())),
            policy,
        }
    }

    /// Store that enforces unique email
    #[inline]
    #[must_use]
    pub fn upsert() -> Self {
        Self::new(WritePolicy::Upsert)
    }

    /// Store without uniqueness
    #[inline]
    #[must_use]
    pub fn append_only() -> Self {
        Self::new(WritePolicy::AppendOnly)
    }

    /// Insert a fully-formed row, bypassing the policy
    pub fn seed(&self, row: StoredSubscription) {
        self.rows.lock().push(row);
    }

    /// Copy of all rows in insertion order
    #[must_use]
    pub fn rows(&self) -> Vec<StoredSubscription> {
        self.rows.lock().clone()
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }
}

#[async_trait]
impl StoreConnector for MemoryStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    fn write_policy(&self) -> WritePolicy {
        self.policy
    }

    async fn connect(&self) -> StoreResult<Box<dyn StoreConnection>> {
        Ok(Box::new(MemoryConnection {
            rows: Arc::clone(&self.rows),
            policy: self.policy,
        }))
    }
}

/// Connection handle onto a [`MemoryStore`]
#[derive(Debug)]
pub struct MemoryConnection {
    rows: Arc<Mutex<Vec<StoredSubscription>>>,
    policy: WritePolicy,
}

#[async_trait]
impl StoreConnection for MemoryConnection {
    async fn ensure_schema(&mut self) -> StoreResult<()> {
        Ok(())
    }

    async fn upsert(&mut self, row: &NewSubscription) -> StoreResult<()> {
        if self.policy != WritePolicy::Upsert {
            return Err(StoreError::Unsupported {
                backend: BACKEND,
                operation: "upsert",
            });
        }

        let now = Utc::now();
        let mut rows = self.rows.lock();
        match rows.iter_mut().find(|stored| stored.email == row.email) {
            Some(stored) => {
                stored.name.clone_from(&row.name);
                stored.company.clone_from(&row.company);
                stored.source.clone_from(&row.source);
                stored.origin_address.clone_from(&row.origin_address);
                stored.submitted_at = now;
            }
            None => rows.push(StoredSubscription::from_new(row, now)),
        }
        Ok(())
    }

    async fn insert(&mut self, row: &NewSubscription) -> StoreResult<()> {
        let mut rows = self.rows.lock();
        if self.policy == WritePolicy::Upsert && rows.iter().any(|stored| stored.email == row.email)
        {
            return Err(StoreError::query(
                BACKEND,
                "duplicate key value violates unique constraint on email",
            ));
        }
        rows.push(StoredSubscription::from_new(row, Utc::now()));
        Ok(())
    }

    async fn count_all(&mut self) -> StoreResult<u64> {
        Ok(self.rows.lock().len() as u64)
    }

    async fn count_recent(&mut self, days: u32) -> StoreResult<u64> {
        let cutoff = Utc::now() - Duration::days(i64::from(days));
        let count = self
            .rows
            .lock()
            .iter()
            .filter(|row| row.submitted_at >= cutoff)
            .count();
        Ok(count as u64)
    }

    async fn count_by_source(&mut self) -> StoreResult<Vec<SourceCount>> {
        let mut grouped: BTreeMap<String, u64> = BTreeMap::new();
        for row in self.rows.lock().iter() {
            *grouped.entry(row.source.clone()).or_default() += 1;
        }
        let mut counts: Vec<_> = grouped
            .into_iter()
            .map(|(source, count)| SourceCount { source, count })
            .collect();
        order_source_counts(&mut counts);
        Ok(counts)
    }

    async fn ping(&mut self) -> StoreResult<()> {
        Ok(())
    }

    async fn close(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}
