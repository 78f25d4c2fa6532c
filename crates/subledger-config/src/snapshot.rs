//! Immutable resolved settings

use crate::error::ConfigError;
use crate::source::ConfigSource;
use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;

const MASK: &str = "********";

/// One resolved setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigParameter {
    /// Logical name
    pub key: String,
    /// Resolved raw value
    pub value: String,
    /// Which link of the chain answered
    pub source: ConfigSource,
    /// Value must not be rendered
    pub secret: bool,
}

impl ConfigParameter {
    /// Value safe for logs and terminal output
    #[must_use]
    pub fn display_value(&self) -> &str {
        if self.secret && !self.value.is_empty() {
            MASK
        } else {
            &self.value
        }
    }
}

/// Complete, read-only result of one resolution pass
///
/// Every key of the table it was resolved from is present exactly once, in
/// table order. There is no way to mutate a snapshot after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSnapshot {
    namespace: String,
    parameters: IndexMap<String, ConfigParameter>,
}

impl ConfigSnapshot {
    pub(crate) fn new(namespace: impl Into<String>, parameters: Vec<ConfigParameter>) -> Self {
        Self {
            namespace: namespace.into(),
            parameters: parameters
                .into_iter()
                .map(|parameter| (parameter.key.clone(), parameter))
                .collect(),
        }
    }

    /// Namespace the remote lookups were made under
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Raw value of `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(|p| p.value.as_str())
    }

    /// Raw value of `key`, or `UnknownKey`
    ///
    /// # Errors
    /// `ConfigError::UnknownKey` if the key was not resolved
    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))
    }

    /// Parse `key` as `T`
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    /// `UnknownKey` if absent, `InvalidValue` if the parse fails
    pub fn parse<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.require(key)?
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::invalid_value(key, e.to_string()))
    }

    /// Source that answered for `key`
    #[must_use]
    pub fn source_of(&self, key: &str) -> Option<ConfigSource> {
        self.parameters.get(key).map(|p| p.source)
    }

    /// Full parameter record for `key`
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&ConfigParameter> {
        self.parameters.get(key)
    }

    /// Iterate parameters in key-table order
    pub fn parameters(&self) -> impl Iterator<Item = &ConfigParameter> {
        self.parameters.values()
    }

    /// Number of resolved keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Whether nothing was resolved
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

impl fmt::Display for ConfigSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "namespace: {}", self.namespace)?;
        let width = self.parameters.keys().map(String::len).max().unwrap_or(0);
        for parameter in self.parameters.values() {
            writeln!(
                f,
                "  {:<width$}  {:<11}  {}",
                parameter.key,
                parameter.source.as_str(),
                parameter.display_value(),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn snapshot() -> ConfigSnapshot {
        ConfigSnapshot::new(
            "/ns",
            vec![
                ConfigParameter {
                    key: "POSTGRES_PORT".to_string(),
                    value: " 6543 ".to_string(),
                    source: ConfigSource::Environment,
                    secret: false,
                },
                ConfigParameter {
                    key: "POSTGRES_PASSWORD".to_string(),
                    value: "hunter2".to_string(),
                    source: ConfigSource::Remote,
                    secret: true,
                },
                ConfigParameter {
                    key: "HYPERDX_API_KEY".to_string(),
                    value: String::new(),
                    source: ConfigSource::Default,
                    secret: true,
                },
            ],
        )
    }

    #[test]
    fn parse_trims_and_converts() {
        assert_eq!(snapshot().parse::<u16>("POSTGRES_PORT"), Ok(6543));
    }

    #[test]
    fn parse_reports_invalid_value() {
        let err = snapshot().parse::<u16>("POSTGRES_PASSWORD").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "POSTGRES_PASSWORD"));
    }

    #[test]
    fn unknown_key() {
        assert_eq!(
            snapshot().require("NOPE"),
            Err(ConfigError::UnknownKey("NOPE".to_string()))
        );
    }

    #[test]
    fn secrets_are_masked_when_rendered() {
        let rendered = snapshot().to_string();
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("********"));
        assert!(rendered.contains("POSTGRES_PORT"));
    }

    #[test]
    fn empty_secret_renders_empty() {
        let snap = snapshot();
        let key = snap.parameter("HYPERDX_API_KEY").unwrap();
        assert_eq!(key.display_value(), "");
    }

    #[test]
    fn source_of_reports_chain_link() {
        assert_eq!(snapshot().source_of("POSTGRES_PASSWORD"), Some(ConfigSource::Remote));
        assert_eq!(snapshot().source_of("NOPE"), None);
    }
}
