//! The resolution chain: remote parameter store, then environment, then default

use crate::key_table::{KeySpec, KeyTable};
use crate::snapshot::{ConfigParameter, ConfigSnapshot};
use crate::source::{
    ConfigSource, DefaultStrategy, EnvironmentStrategy, Lookup, RemoteStrategy, ResolutionStrategy,
};
use futures::future::join_all;

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "/subledger/frontend";

/// Environment variable overriding the namespace
pub const NAMESPACE_ENV: &str = "PARAMETER_STORE_PREFIX";

/// Resolves a key table into a [`ConfigSnapshot`]
///
/// The chain order is fixed at construction: remote, environment, default.
/// Callers choose the implementations behind the first two links, never
/// their order.
pub struct ConfigResolver {
    chain: Vec<Box<dyn ResolutionStrategy>>,
}

impl ConfigResolver {
    /// Create resolver over the given remote and environment links
    #[must_use]
    pub fn new(remote: RemoteStrategy, environment: EnvironmentStrategy) -> Self {
        Self {
            chain: vec![
                Box::new(remote),
                Box::new(environment),
                Box::new(DefaultStrategy),
            ],
        }
    }

    /// Resolve every key of `table` under `namespace`
    ///
    /// Never fails: each key degrades independently down the chain and the
    /// returned snapshot always holds one value per key. Keys are looked up
    /// concurrently; the snapshot keeps table order.
    pub async fn resolve(&self, namespace: &str, table: &KeyTable) -> ConfigSnapshot {
        let lookups = table.iter().map(|spec| self.resolve_key(namespace, spec));
        let parameters = join_all(lookups).await;
        ConfigSnapshot::new(namespace, parameters)
    }

    async fn resolve_key(&self, namespace: &str, spec: &KeySpec) -> ConfigParameter {
        for strategy in &self.chain {
            match strategy.lookup(namespace, spec).await {
                Lookup::Found(value) => {
                    let source = strategy.source();
                    log_chosen_source(&spec.name, source);
                    return ConfigParameter {
                        key: spec.name.clone(),
                        value,
                        source,
                        secret: spec.secret,
                    };
                }
                Lookup::Absent(reason) => {
                    tracing::debug!(
                        key = %spec.name,
                        source = %strategy.source(),
                        "no value: {reason}"
                    );
                }
            }
        }

        // Unreachable while DefaultStrategy terminates the chain.
        log_chosen_source(&spec.name, ConfigSource::Default);
        ConfigParameter {
            key: spec.name.clone(),
            value: spec.default.clone(),
            source: ConfigSource::Default,
            secret: spec.secret,
        }
    }
}

impl std::fmt::Debug for ConfigResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sources: Vec<_> = self.chain.iter().map(|s| s.source()).collect();
        f.debug_struct("ConfigResolver")
            .field("chain", &sources)
            .finish()
    }
}

fn log_chosen_source(key: &str, source: ConfigSource) {
    match source {
        ConfigSource::Remote => tracing::info!("Loaded {key} from parameter store"),
        ConfigSource::Environment => tracing::info!("Using environment variable for {key}"),
        ConfigSource::Default => tracing::info!("Using default value for {key}"),
    }
}
