//! ClickHouse backend over the HTTP interface
//!
//! MergeTree tables have no unique constraint, so this backend is append-only:
//! every submission is a new row with a server-generated UUID and timestamp.
//! `upsert` is rejected as [`StoreError::Unsupported`].

use crate::connector::{StoreConnection, StoreConnector};
use crate::error::{StoreError, StoreResult};
use crate::model::{NewSubscription, SourceCount, TableName, WritePolicy};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use std::fmt;

const BACKEND: &str = "clickhouse";

/// Connection settings for the ClickHouse backend
#[derive(Clone, PartialEq, Eq)]
pub struct ClickHouseSettings {
    /// Server host
    pub host: String,
    /// HTTP port
    pub port: u16,
    /// User name
    pub username: String,
    /// Password
    pub password: String,
    /// Database name
    pub database: String,
    /// Subscription table
    pub table: TableName,
}

impl fmt::Debug for ClickHouseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClickHouseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("table", &self.table)
            .finish()
    }
}

/// Row shape for `INSERT … FORMAT JSONEachRow`
#[derive(Serialize)]
struct InsertRow<'a> {
    name: &'a str,
    company: &'a str,
    email: &'a str,
    source: &'a str,
    ip_address: &'a str,
}

impl<'a> From<&'a NewSubscription> for InsertRow<'a> {
    fn from(row: &'a NewSubscription) -> Self {
        Self {
            name: &row.name,
            company: &row.company,
            email: &row.email,
            source: &row.source,
            ip_address: &row.origin_address,
        }
    }
}

/// Opens one HTTP session per operation
#[derive(Clone)]
pub struct ClickHouseConnector {
    base: Url,
    username: String,
    password: String,
    database: String,
    table: TableName,
}

impl fmt::Debug for ClickHouseConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClickHouseConnector")
            .field("base", &self.base.as_str())
            .field("database", &self.database)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl ClickHouseConnector {
    /// Create connector from settings
    ///
    /// # Errors
    /// `StoreError::InvalidSettings` if host and port do not form a URL
    pub fn new(settings: &ClickHouseSettings) -> StoreResult<Self> {
        let base = Url::parse(&format!("http://{}:{}/", settings.host, settings.port))
            .map_err(|e| StoreError::InvalidSettings(format!("clickhouse endpoint: {e}")))?;

        Ok(Self {
            base,
            username: settings.username.clone(),
            password: settings.password.clone(),
            database: settings.database.clone(),
            table: settings.table.clone(),
        })
    }

    /// Endpoint the connector talks to
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.base
    }
}

#[async_trait]
impl StoreConnector for ClickHouseConnector {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    fn write_policy(&self) -> WritePolicy {
        WritePolicy::AppendOnly
    }

    async fn connect(&self) -> StoreResult<Box<dyn StoreConnection>> {
        let client = Client::builder()
            .build()
            .map_err(|e| StoreError::connect(BACKEND, e))?;

        let ping = self
            .base
            .join("ping")
            .map_err(|e| StoreError::InvalidSettings(e.to_string()))?;
        client
            .get(ping)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| StoreError::connect(BACKEND, e))?;

        tracing::debug!("Successfully connected to ClickHouse");
        Ok(Box::new(ClickHouseConnection {
            client,
            base: self.base.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
            table: self.table.clone(),
        }))
    }
}

/// One HTTP session against ClickHouse
pub struct ClickHouseConnection {
    client: Client,
    base: Url,
    username: String,
    password: String,
    database: String,
    table: TableName,
}

impl fmt::Debug for ClickHouseConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClickHouseConnection")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

impl ClickHouseConnection {
    /// POST `body` and return the response text
    async fn execute(&self, body: String) -> StoreResult<String> {
        let response = self
            .client
            .post(self.base.clone())
            .query(&[
                ("database", self.database.as_str()),
                ("output_format_json_quote_64bit_integers", "0"),
            ])
            .header("X-ClickHouse-User", &self.username)
            .header("X-ClickHouse-Key", &self.password)
            .body(body)
            .send()
            .await
            .map_err(|e| StoreError::query(BACKEND, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::query(BACKEND, e))?;
        if status.is_success() {
            Ok(text)
        } else {
            Err(StoreError::query(
                BACKEND,
                format!("HTTP {status}: {}", text.trim()),
            ))
        }
    }

    async fn count(&self, sql: String) -> StoreResult<u64> {
        let text = self.execute(sql).await?;
        parse_count(&text)
    }
}

fn parse_count(text: &str) -> StoreResult<u64> {
    let trimmed = text.trim();
    trimmed
        .parse()
        .map_err(|_| StoreError::protocol(BACKEND, format!("expected a count, got {trimmed:?}")))
}

fn parse_source_counts(text: &str) -> StoreResult<Vec<SourceCount>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line)
                .map_err(|e| StoreError::protocol(BACKEND, format!("bad source row: {e}")))
        })
        .collect()
}

fn create_table_sql(table: &TableName) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id UUID DEFAULT generateUUIDv4(),
            name String,
            company String,
            email String,
            source String,
            submitted_at DateTime DEFAULT now(),
            ip_address String
        ) ENGINE = MergeTree()
        ORDER BY submitted_at"
    )
}

fn insert_sql(table: &TableName, row: &NewSubscription) -> StoreResult<String> {
    let json = serde_json::to_string(&InsertRow::from(row))
        .map_err(|e| StoreError::protocol(BACKEND, e.to_string()))?;
    Ok(format!(
        "INSERT INTO {table} (name, company, email, source, ip_address) FORMAT JSONEachRow\n{json}"
    ))
}

#[async_trait]
impl StoreConnection for ClickHouseConnection {
    async fn ensure_schema(&mut self) -> StoreResult<()> {
        self.execute(create_table_sql(&self.table)).await?;
        Ok(())
    }

    async fn upsert(&mut self, _row: &NewSubscription) -> StoreResult<()> {
        Err(StoreError::Unsupported {
            backend: BACKEND,
            operation: "upsert",
        })
    }

    async fn insert(&mut self, row: &NewSubscription) -> StoreResult<()> {
        let sql = insert_sql(&self.table, row)?;
        self.execute(sql).await?;
        Ok(())
    }

    async fn count_all(&mut self) -> StoreResult<u64> {
        self.count(format!(
            "SELECT count() FROM {} FORMAT TabSeparated",
            self.table
        ))
        .await
    }

    async fn count_recent(&mut self, days: u32) -> StoreResult<u64> {
        self.count(format!(
            "SELECT count() FROM {} WHERE submitted_at >= now() - INTERVAL {days} DAY FORMAT TabSeparated",
            self.table
        ))
        .await
    }

    async fn count_by_source(&mut self) -> StoreResult<Vec<SourceCount>> {
        let text = self
            .execute(format!(
                "SELECT source, count() AS count FROM {} GROUP BY source \
                 ORDER BY count DESC, source ASC FORMAT JSONEachRow",
                self.table
            ))
            .await?;
        parse_source_counts(&text)
    }

    async fn ping(&mut self) -> StoreResult<()> {
        let text = self.execute("SELECT 1 FORMAT TabSeparated".to_string()).await?;
        match parse_count(&text)? {
            1 => Ok(()),
            other => Err(StoreError::protocol(BACKEND, format!("SELECT 1 returned {other}"))),
        }
    }

    async fn close(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}
