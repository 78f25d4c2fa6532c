//! Postgres backend
//!
//! The relation carries a unique constraint on `email`, so writes are
//! `INSERT … ON CONFLICT (email) DO UPDATE`: a repeated submission replaces
//! name, company, source, origin address and timestamp, and keeps the row id
//! and email. Timestamps are assigned by the server (`now()`).
//!
//! Each operation opens its own `PgConnection`; there is no pool. No
//! statement or connect timeout is configured.

use crate::connector::{StoreConnection, StoreConnector};
use crate::error::{StoreError, StoreResult};
use crate::model::{NewSubscription, SourceCount, TableName, WritePolicy};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use std::fmt;
use std::sync::Arc;

const BACKEND: &str = "postgres";

/// Connection settings for the Postgres backend
#[derive(Clone, PartialEq, Eq)]
pub struct PostgresSettings {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Login role
    pub username: String,
    /// Login password
    pub password: String,
    /// Database name
    pub database: String,
    /// Subscription relation
    pub table: TableName,
}

impl fmt::Debug for PostgresSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("table", &self.table)
            .finish()
    }
}

/// Statement text for one table, built once per connector
#[derive(Debug)]
struct Statements {
    create_table: String,
    upsert: String,
    insert: String,
    count_all: String,
    count_recent: String,
    count_by_source: String,
}

impl Statements {
    fn for_table(table: &TableName) -> Self {
        let columns = "name, company, email, source, submitted_at, origin_address";
        let values = "$1, $2, $3, $4, now(), $5";
        Self {
            create_table: format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id BIGSERIAL PRIMARY KEY,
                    name TEXT NOT NULL,
                    company TEXT NOT NULL DEFAULT '',
                    email TEXT NOT NULL UNIQUE,
                    source TEXT NOT NULL,
                    submitted_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                    origin_address TEXT NOT NULL DEFAULT ''
                )"
            ),
            upsert: format!(
                "INSERT INTO {table} ({columns}) VALUES ({values})
                 ON CONFLICT (email) DO UPDATE SET
                     name = EXCLUDED.name,
                     company = EXCLUDED.company,
                     source = EXCLUDED.source,
                     submitted_at = EXCLUDED.submitted_at,
                     origin_address = EXCLUDED.origin_address"
            ),
            insert: format!("INSERT INTO {table} ({columns}) VALUES ({values})"),
            count_all: format!("SELECT COUNT(*) FROM {table}"),
            count_recent: format!(
                "SELECT COUNT(*) FROM {table} WHERE submitted_at >= now() - make_interval(days => $1)"
            ),
            count_by_source: format!(
                "SELECT source, COUNT(*) AS count FROM {table}
                 GROUP BY source ORDER BY count DESC, source ASC"
            ),
        }
    }
}

/// Opens one `PgConnection` per operation
#[derive(Clone)]
pub struct PostgresConnector {
    options: PgConnectOptions,
    statements: Arc<Statements>,
}

impl fmt::Debug for PostgresConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConnector")
            .field("host", &self.options.get_host())
            .field("port", &self.options.get_port())
            .finish_non_exhaustive()
    }
}

impl PostgresConnector {
    /// Create connector from settings
    #[must_use]
    pub fn new(settings: &PostgresSettings) -> Self {
        let options = PgConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.username)
            .password(&settings.password)
            .database(&settings.database);

        Self {
            options,
            statements: Arc::new(Statements::for_table(&settings.table)),
        }
    }
}

#[async_trait]
impl StoreConnector for PostgresConnector {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    fn write_policy(&self) -> WritePolicy {
        WritePolicy::Upsert
    }

    async fn connect(&self) -> StoreResult<Box<dyn StoreConnection>> {
        let conn = PgConnection::connect_with(&self.options)
            .await
            .map_err(|e| StoreError::connect(BACKEND, e))?;
        tracing::debug!("Successfully connected to PostgreSQL");
        Ok(Box::new(PostgresConnection {
            conn,
            statements: Arc::clone(&self.statements),
        }))
    }
}

/// One open Postgres connection
pub struct PostgresConnection {
    conn: PgConnection,
    statements: Arc<Statements>,
}

impl fmt::Debug for PostgresConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConnection").finish_non_exhaustive()
    }
}

impl PostgresConnection {
    async fn write(&mut self, sql: &str, row: &NewSubscription) -> StoreResult<()> {
        sqlx::query(sql)
            .bind(&row.name)
            .bind(&row.company)
            .bind(&row.email)
            .bind(&row.source)
            .bind(&row.origin_address)
            .execute(&mut self.conn)
            .await
            .map_err(|e| StoreError::query(BACKEND, e))?;
        Ok(())
    }
}

fn to_count(value: i64) -> StoreResult<u64> {
    u64::try_from(value).map_err(|_| StoreError::protocol(BACKEND, format!("negative count {value}")))
}

#[async_trait]
impl StoreConnection for PostgresConnection {
    async fn ensure_schema(&mut self) -> StoreResult<()> {
        let statements = Arc::clone(&self.statements);
        sqlx::query(&statements.create_table)
            .execute(&mut self.conn)
            .await
            .map_err(|e| StoreError::query(BACKEND, e))?;
        Ok(())
    }

    async fn upsert(&mut self, row: &NewSubscription) -> StoreResult<()> {
        let statements = Arc::clone(&self.statements);
        self.write(&statements.upsert, row).await
    }

    async fn insert(&mut self, row: &NewSubscription) -> StoreResult<()> {
        let statements = Arc::clone(&self.statements);
        self.write(&statements.insert, row).await
    }

    async fn count_all(&mut self) -> StoreResult<u64> {
        let statements = Arc::clone(&self.statements);
        let count: i64 = sqlx::query_scalar(&statements.count_all)
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| StoreError::query(BACKEND, e))?;
        to_count(count)
    }

    async fn count_recent(&mut self, days: u32) -> StoreResult<u64> {
        let days = i32::try_from(days)
            .map_err(|_| StoreError::InvalidSettings(format!("window of {days} days is too large")))?;
        let statements = Arc::clone(&self.statements);
        let count: i64 = sqlx::query_scalar(&statements.count_recent)
            .bind(days)
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| StoreError::query(BACKEND, e))?;
        to_count(count)
    }

    async fn count_by_source(&mut self) -> StoreResult<Vec<SourceCount>> {
        let statements = Arc::clone(&self.statements);
        let rows: Vec<(String, i64)> = sqlx::query_as(&statements.count_by_source)
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| StoreError::query(BACKEND, e))?;

        rows.into_iter()
            .map(|(source, count)| Ok(SourceCount::new(source, to_count(count)?)))
            .collect()
    }

    async fn ping(&mut self) -> StoreResult<()> {
        let one: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| StoreError::query(BACKEND, e))?;
        if one == 1 {
            Ok(())
        } else {
            Err(StoreError::protocol(BACKEND, format!("SELECT 1 returned {one}")))
        }
    }

    async fn close(self: Box<Self>) -> StoreResult<()> {
        self.conn
            .close()
            .await
            .map_err(|e| StoreError::query(BACKEND, e))
    }
}
