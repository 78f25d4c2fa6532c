//! Resolution strategies
//!
//! Each strategy answers one question for one key: "do you have a value?".
//! Answers are [`Lookup`] values, never errors; the resolver walks the chain
//! and takes the first [`Lookup::Found`].

use crate::key_table::KeySpec;
use crate::parameter_store::ParameterStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Where a resolved value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigSource {
    /// Remote parameter store
    Remote,
    /// Process environment
    Environment,
    /// Compiled-in default
    Default,
}

impl ConfigSource {
    /// Lower-case label
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Environment => "environment",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of asking one strategy for one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Strategy has a value
    Found(String),
    /// Strategy has nothing; reason is for logs only
    Absent(String),
}

/// One link of the resolution chain
#[async_trait]
pub trait ResolutionStrategy: Send + Sync {
    /// Source label attached to values this strategy finds
    fn source(&self) -> ConfigSource;

    /// Look up `spec` under `namespace`
    async fn lookup(&self, namespace: &str, spec: &KeySpec) -> Lookup;
}

/// Read access to a process-style environment
#[cfg_attr(test, mockall::automock)]
pub trait Environment: Send + Sync {
    /// Value of variable `key`, `None` when unset
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Fixed environment backed by a map
#[derive(Debug, Clone, Default)]
pub struct MapEnvironment {
    vars: HashMap<String, String>,
}

impl MapEnvironment {
    /// Create empty environment
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl Environment for MapEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapEnvironment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Remote parameter store lookup at `namespace + suffix`
///
/// A store that could not be constructed is represented as
/// [`RemoteStrategy::unavailable`] and answers `Absent` for every key.
#[derive(Clone)]
pub struct RemoteStrategy {
    store: Result<Arc<dyn ParameterStore>, String>,
}

impl RemoteStrategy {
    /// Strategy backed by a live store
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn ParameterStore>) -> Self {
        Self { store: Ok(store) }
    }

    /// Strategy whose store failed to construct
    #[inline]
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            store: Err(reason.into()),
        }
    }
}

impl fmt::Debug for RemoteStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.store {
            Ok(_) => f.write_str("RemoteStrategy(connected)"),
            Err(reason) => write!(f, "RemoteStrategy(unavailable: {reason})"),
        }
    }
}

#[async_trait]
impl ResolutionStrategy for RemoteStrategy {
    fn source(&self) -> ConfigSource {
        ConfigSource::Remote
    }

    async fn lookup(&self, namespace: &str, spec: &KeySpec) -> Lookup {
        let store = match &self.store {
            Ok(store) => store,
            Err(reason) => return Lookup::Absent(reason.clone()),
        };

        let path = spec.remote_path(namespace);
        match store.get_parameter(&path).await {
            Ok(value) => Lookup::Found(value),
            Err(err) => {
                tracing::warn!("Failed to get parameter {path} from parameter store: {err}");
                Lookup::Absent(err.to_string())
            }
        }
    }
}

/// Environment variable lookup by logical name
#[derive(Clone)]
pub struct EnvironmentStrategy {
    env: Arc<dyn Environment>,
}

impl EnvironmentStrategy {
    /// Strategy over `env`
    #[inline]
    #[must_use]
    pub fn new(env: Arc<dyn Environment>) -> Self {
        Self { env }
    }

    /// Strategy over the process environment
    #[inline]
    #[must_use]
    pub fn process() -> Self {
        Self::new(Arc::new(ProcessEnvironment))
    }
}

impl fmt::Debug for EnvironmentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EnvironmentStrategy")
    }
}

#[async_trait]
impl ResolutionStrategy for EnvironmentStrategy {
    fn source(&self) -> ConfigSource {
        ConfigSource::Environment
    }

    async fn lookup(&self, _namespace: &str, spec: &KeySpec) -> Lookup {
        match self.env.var(&spec.name) {
            Some(value) => Lookup::Found(value),
            None => Lookup::Absent(format!("{} not set", spec.name)),
        }
    }
}

/// Compiled-in default; always answers
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStrategy;

#[async_trait]
impl ResolutionStrategy for DefaultStrategy {
    fn source(&self) -> ConfigSource {
        ConfigSource::Default
    }

    async fn lookup(&self, _namespace: &str, spec: &KeySpec) -> Lookup {
        Lookup::Found(spec.default.clone())
    }
}
