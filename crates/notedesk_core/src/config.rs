//! Runtime configuration for the data access layer.
//!
//! # Invariants
//! - Every field has a default; an empty JSON object is a valid config.
//! - `validate` runs on every load path before a config is handed out.

use crate::cache::CacheConfig;
use crate::logging::{default_log_level, normalize_level};
use crate::perf::DEFAULT_METRICS_WINDOW;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

/// Composition-root settings for cache, timing and logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// Lookup cache entry lifetime in milliseconds.
    pub cache_ttl_ms: u64,
    /// Optional bound on cached entries.
    pub cache_max_entries: Option<usize>,
    /// Purge expired cache entries on every write.
    pub cache_sweep_on_write: bool,
    /// Timing samples retained per label.
    pub metrics_window: usize,
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 5 * 60 * 1000,
            cache_max_entries: None,
            cache_sweep_on_write: false,
            metrics_window: DEFAULT_METRICS_WINDOW,
            log_level: default_log_level().to_string(),
        }
    }
}

impl CoreConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl_ms == 0 {
            return Err(ConfigError::Invalid(
                "cache_ttl_ms must be greater than 0".to_string(),
            ));
        }
        if self.cache_max_entries == Some(0) {
            return Err(ConfigError::Invalid(
                "cache_max_entries must be greater than 0 when set".to_string(),
            ));
        }
        if self.metrics_window == 0 {
            return Err(ConfigError::Invalid(
                "metrics_window must be greater than 0".to_string(),
            ));
        }
        normalize_level(&self.log_level).map_err(|err| ConfigError::Invalid(err.to_string()))?;
        Ok(())
    }

    pub fn cache_config(&self) -> CacheConfig {
        let config = CacheConfig::new()
            .with_ttl(Duration::from_millis(self.cache_ttl_ms))
            .with_sweep_on_write(self.cache_sweep_on_write);
        match self.cache_max_entries {
            Some(max) => config.with_max_entries(max),
            None => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};
    use std::time::Duration;

    #[test]
    fn empty_object_yields_defaults() {
        let config = CoreConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.cache_config().default_ttl, Duration::from_secs(300));
        assert_eq!(config.cache_config().max_entries, None);
        assert_eq!(config.metrics_window, 100);
    }

    #[test]
    fn overrides_are_applied() {
        let config = CoreConfig::from_json_str(
            r#"{"cache_ttl_ms": 1500, "cache_max_entries": 64, "cache_sweep_on_write": true, "metrics_window": 10, "log_level": "warn"}"#,
        )
        .unwrap();
        let cache = config.cache_config();
        assert_eq!(cache.default_ttl, Duration::from_millis(1500));
        assert_eq!(cache.max_entries, Some(64));
        assert!(cache.sweep_on_write);
        assert_eq!(config.metrics_window, 10);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for raw in [
            r#"{"cache_ttl_ms": 0}"#,
            r#"{"cache_max_entries": 0}"#,
            r#"{"metrics_window": 0}"#,
            r#"{"log_level": "loud"}"#,
        ] {
            let err = CoreConfig::from_json_str(raw).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{raw} -> {err}");
        }
    }

    #[test]
    fn unknown_fields_and_bad_json_fail_to_parse() {
        assert!(matches!(
            CoreConfig::from_json_str(r#"{"cache_ttl": 5}"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            CoreConfig::from_json_str("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notedesk.json");
        std::fs::write(&path, r#"{"metrics_window": 25}"#).unwrap();

        let config = CoreConfig::from_path(&path).unwrap();
        assert_eq!(config.metrics_window, 25);
        assert!(matches!(
            CoreConfig::from_path(dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
