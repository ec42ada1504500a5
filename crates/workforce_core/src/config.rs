//! Store configuration.
//!
//! # Responsibility
//! - Describe where the store lives and how relationship mutations treat
//!   unresolved references.
//! - Parse the same settings from environment variables for binaries.
//!
//! # Invariants
//! - Parsing never panics; bad values become `ConfigError`.
//! - Unset variables fall back to `StoreConfig::default()` values.

use crate::db::DEFAULT_BUSY_TIMEOUT;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "WORKFORCE_DB_PATH";
pub const ENV_BUSY_TIMEOUT_MS: &str = "WORKFORCE_BUSY_TIMEOUT_MS";
pub const ENV_REFERENCE_POLICY: &str = "WORKFORCE_REFERENCE_POLICY";

/// Backing location of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    Memory,
}

/// Treatment of relationship mutations that name an unknown entity id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferencePolicy {
    /// Skip the reference and report it in the operation outcome.
    #[default]
    Skip,
    /// Fail the unit of work with `RepoError::InvalidReference`.
    Reject,
}

impl ReferencePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "skip" => Some(Self::Skip),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Reject => "reject",
        }
    }
}

/// Settings used once, when the process-wide `Store` is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub location: StoreLocation,
    pub busy_timeout: Duration,
    pub reference_policy: ReferencePolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: StoreLocation::Memory,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            reference_policy: ReferencePolicy::Skip,
        }
    }
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: StoreLocation::File(path.into()),
            ..Self::default()
        }
    }

    pub fn with_reference_policy(mut self, policy: ReferencePolicy) -> Self {
        self.reference_policy = policy;
        self
    }

    /// Reads settings from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, one call per variable name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = non_blank(lookup(ENV_DB_PATH)) {
            config.location = if path == ":memory:" {
                StoreLocation::Memory
            } else {
                StoreLocation::File(PathBuf::from(path))
            };
        }

        if let Some(raw) = non_blank(lookup(ENV_BUSY_TIMEOUT_MS)) {
            let millis = raw.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                key: ENV_BUSY_TIMEOUT_MS,
                value: raw.clone(),
            })?;
            config.busy_timeout = Duration::from_millis(millis);
        }

        if let Some(raw) = non_blank(lookup(ENV_REFERENCE_POLICY)) {
            config.reference_policy =
                ReferencePolicy::parse(&raw).ok_or(ConfigError::InvalidValue {
                    key: ENV_REFERENCE_POLICY,
                    value: raw.clone(),
                })?;
        }

        Ok(config)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for `{key}`")
            }
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ReferencePolicy, StoreConfig, StoreLocation};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = StoreConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.location, StoreLocation::Memory);
        assert_eq!(config.reference_policy, ReferencePolicy::Skip);
    }

    #[test]
    fn reads_all_settings() {
        let config = StoreConfig::from_lookup(lookup_from(&[
            ("WORKFORCE_DB_PATH", "/tmp/workforce.sqlite3"),
            ("WORKFORCE_BUSY_TIMEOUT_MS", "250"),
            ("WORKFORCE_REFERENCE_POLICY", " Reject "),
        ]))
        .unwrap();
        assert_eq!(
            config.location,
            StoreLocation::File(PathBuf::from("/tmp/workforce.sqlite3"))
        );
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert_eq!(config.reference_policy, ReferencePolicy::Reject);
    }

    #[test]
    fn memory_marker_selects_in_memory_store() {
        let config =
            StoreConfig::from_lookup(lookup_from(&[("WORKFORCE_DB_PATH", ":memory:")])).unwrap();
        assert_eq!(config.location, StoreLocation::Memory);
    }

    #[test]
    fn rejects_unknown_policy_and_bad_timeout() {
        let policy_err =
            StoreConfig::from_lookup(lookup_from(&[("WORKFORCE_REFERENCE_POLICY", "loud")]))
                .unwrap_err();
        assert!(matches!(
            policy_err,
            ConfigError::InvalidValue {
                key: "WORKFORCE_REFERENCE_POLICY",
                ..
            }
        ));

        let timeout_err =
            StoreConfig::from_lookup(lookup_from(&[("WORKFORCE_BUSY_TIMEOUT_MS", "soon")]))
                .unwrap_err();
        assert!(timeout_err.to_string().contains("soon"));
    }
}
