//! Key tables: which settings exist, where they live remotely, and their defaults

use indexmap::IndexMap;

/// Logical names of the standard settings
#[allow(missing_docs)]
pub mod keys {
    pub const STORE_BACKEND: &str = "STORE_BACKEND";

    pub const POSTGRES_HOST: &str = "POSTGRES_HOST";
    pub const POSTGRES_PORT: &str = "POSTGRES_PORT";
    pub const POSTGRES_USERNAME: &str = "POSTGRES_USERNAME";
    pub const POSTGRES_PASSWORD: &str = "POSTGRES_PASSWORD";
    pub const POSTGRES_DATABASE: &str = "POSTGRES_DATABASE";
    pub const POSTGRES_TABLE_NAME: &str = "POSTGRES_TABLE_NAME";

    pub const CLICKHOUSE_HOST: &str = "CLICKHOUSE_HOST";
    pub const CLICKHOUSE_PORT: &str = "CLICKHOUSE_PORT";
    pub const CLICKHOUSE_USERNAME: &str = "CLICKHOUSE_USERNAME";
    pub const CLICKHOUSE_PASSWORD: &str = "CLICKHOUSE_PASSWORD";
    pub const CLICKHOUSE_DATABASE: &str = "CLICKHOUSE_DATABASE";
    pub const CLICKHOUSE_TABLE_NAME: &str = "CLICKHOUSE_TABLE_NAME";

    pub const HYPERDX_API_KEY: &str = "HYPERDX_API_KEY";
    pub const HYPERDX_SERVICE_NAME: &str = "HYPERDX_SERVICE_NAME";
    pub const HYPERDX_ENDPOINT: &str = "HYPERDX_ENDPOINT";
    pub const OTEL_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";
    pub const OTEL_EXPORTER_OTLP_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
    pub const HYPERDX_ENABLE_ADVANCED_NETWORK_CAPTURE: &str =
        "HYPERDX_ENABLE_ADVANCED_NETWORK_CAPTURE";
}

/// One recognised setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpec {
    /// Logical name, also the environment variable name
    pub name: String,
    /// Suffix appended to the namespace for the remote lookup
    pub remote_suffix: String,
    /// Compiled-in fallback
    pub default: String,
    /// Value must never be logged or rendered
    pub secret: bool,
}

impl KeySpec {
    /// Create a non-secret key spec
    #[inline]
    pub fn new(
        name: impl Into<String>,
        remote_suffix: impl Into<String>,
        default: impl ToString,
    ) -> Self {
        Self {
            name: name.into(),
            remote_suffix: remote_suffix.into(),
            default: default.to_string(),
            secret: false,
        }
    }

    /// Mark as secret
    #[inline]
    #[must_use]
    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    /// Fully-qualified remote path under `namespace`
    #[must_use]
    pub fn remote_path(&self, namespace: &str) -> String {
        format!("{}{}", namespace.trim_end_matches('/'), self.remote_suffix)
    }
}

/// Ordered set of key specs, unique by logical name
///
/// Inserting a spec whose name already exists replaces the earlier entry in
/// place, so a table never holds two specs for one key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyTable {
    specs: IndexMap<String, KeySpec>,
}

impl KeyTable {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a spec
    #[must_use]
    pub fn with(mut self, spec: KeySpec) -> Self {
        self.insert(spec);
        self
    }

    /// Add a spec in place
    pub fn insert(&mut self, spec: KeySpec) {
        self.specs.insert(spec.name.clone(), spec);
    }

    /// Look up spec by logical name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&KeySpec> {
        self.specs.get(name)
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &KeySpec> {
        self.specs.values()
    }

    /// Number of specs
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether the table is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// The settings the subscription service reads at startup
    #[must_use]
    pub fn standard() -> Self {
        use keys::*;

        Self::new()
            .with(KeySpec::new(STORE_BACKEND, "/store/backend", "postgres"))
            // Postgres
            .with(KeySpec::new(POSTGRES_HOST, "/postgres/host", "localhost"))
            .with(KeySpec::new(POSTGRES_PORT, "/postgres/port", 5432))
            .with(KeySpec::new(POSTGRES_USERNAME, "/postgres/username", "postgres"))
            .with(KeySpec::new(POSTGRES_PASSWORD, "/postgres/password", "").secret())
            .with(KeySpec::new(POSTGRES_DATABASE, "/postgres/database", "postgres"))
            .with(KeySpec::new(POSTGRES_TABLE_NAME, "/postgres/table_name", "users"))
            // ClickHouse
            .with(KeySpec::new(CLICKHOUSE_HOST, "/clickhouse/host", "localhost"))
            .with(KeySpec::new(CLICKHOUSE_PORT, "/clickhouse/port", 8123))
            .with(KeySpec::new(CLICKHOUSE_USERNAME, "/clickhouse/username", "default"))
            .with(KeySpec::new(CLICKHOUSE_PASSWORD, "/clickhouse/password", "").secret())
            .with(KeySpec::new(CLICKHOUSE_DATABASE, "/clickhouse/database", "default"))
            .with(KeySpec::new(
                CLICKHOUSE_TABLE_NAME,
                "/clickhouse/table_name",
                "subscriptions",
            ))
            // Telemetry, consumed by the web and exporter layers
            .with(KeySpec::new(HYPERDX_API_KEY, "/hyperdx/api_key", "").secret())
            .with(KeySpec::new(
                HYPERDX_SERVICE_NAME,
                "/hyperdx/service_name",
                "flask-subscription-app",
            ))
            .with(KeySpec::new(
                HYPERDX_ENDPOINT,
                "/hyperdx/endpoint",
                "https://in-otel.hyperdx.io",
            ))
            .with(KeySpec::new(
                OTEL_SERVICE_NAME,
                "/hyperdx/otel_service_name",
                "my-backend-app",
            ))
            .with(KeySpec::new(
                OTEL_EXPORTER_OTLP_ENDPOINT,
                "/hyperdx/otel_endpoint",
                "https://in-otel.hyperdx.io",
            ))
            .with(KeySpec::new(
                HYPERDX_ENABLE_ADVANCED_NETWORK_CAPTURE,
                "/hyperdx/adv_net_cap",
                1,
            ))
    }
}

impl FromIterator<KeySpec> for KeyTable {
    fn from_iter<I: IntoIterator<Item = KeySpec>>(iter: I) -> Self {
        let mut table = Self::new();
        for spec in iter {
            table.insert(spec);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_path_joins_namespace_and_suffix() {
        let spec = KeySpec::new("POSTGRES_HOST", "/postgres/host", "localhost");
        assert_eq!(spec.remote_path("/app/frontend"), "/app/frontend/postgres/host");
        assert_eq!(spec.remote_path("/app/frontend/"), "/app/frontend/postgres/host");
    }

    #[test]
    fn duplicate_name_replaces_in_place() {
        let table = KeyTable::new()
            .with(KeySpec::new("A", "/a", "1"))
            .with(KeySpec::new("B", "/b", "2"))
            .with(KeySpec::new("A", "/a2", "3"));

        assert_eq!(table.len(), 2);
        let names: Vec<_> = table.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(table.get("A").map(|s| s.default.as_str()), Some("3"));
    }

    #[test]
    fn standard_table_marks_credentials_secret() {
        let table = KeyTable::standard();
        assert!(table.get(keys::POSTGRES_PASSWORD).is_some_and(|s| s.secret));
        assert!(table.get(keys::CLICKHOUSE_PASSWORD).is_some_and(|s| s.secret));
        assert!(table.get(keys::HYPERDX_API_KEY).is_some_and(|s| s.secret));
        assert!(table.get(keys::POSTGRES_HOST).is_some_and(|s| !s.secret));
    }

    #[test]
    fn numeric_defaults_render_as_strings() {
        let table = KeyTable::standard();
        assert_eq!(table.get(keys::POSTGRES_PORT).map(|s| s.default.as_str()), Some("5432"));
        assert_eq!(table.get(keys::CLICKHOUSE_PORT).map(|s| s.default.as_str()), Some("8123"));
    }
}
