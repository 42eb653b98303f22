//! Runtime configuration resolved from environment variables.
//!
//! # Invariants
//! - Unset variables fall back to defaults; set-but-blank values are errors.
//! - `log_dir`, when present, is absolute.

use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "REGISTRAR_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "REGISTRAR_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "REGISTRAR_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "registrar.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrarConfig {
    pub db_path: PathBuf,
    pub log_level: &'static str,
    /// File logging is disabled when `None`.
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyValue(&'static str),
    InvalidLogLevel(String),
    RelativeLogDir(PathBuf),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyValue(key) => write!(f, "{key} is set but empty"),
            Self::InvalidLogLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::RelativeLogDir(path) => write!(
                f,
                "{ENV_LOG_DIR} must be an absolute path, got `{}`",
                path.display()
            ),
        }
    }
}

impl Error for ConfigError {}

impl Default for RegistrarConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl RegistrarConfig {
    /// Resolves configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = non_blank(ENV_DB_PATH, lookup(ENV_DB_PATH))? {
            config.db_path = PathBuf::from(value);
        }
        if let Some(value) = non_blank(ENV_LOG_LEVEL, lookup(ENV_LOG_LEVEL))? {
            config.log_level = normalize_level(&value)
                .map_err(|_| ConfigError::InvalidLogLevel(value.clone()))?;
        }
        if let Some(value) = non_blank(ENV_LOG_DIR, lookup(ENV_LOG_DIR))? {
            config.log_dir = Some(absolute_dir(PathBuf::from(value))?);
        }

        Ok(config)
    }

    /// Overrides fields with explicitly provided values, e.g. CLI flags.
    pub fn with_overrides(
        mut self,
        db_path: Option<PathBuf>,
        log_level: Option<&str>,
        log_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = db_path {
            self.db_path = path;
        }
        if let Some(level) = log_level {
            self.log_level = normalize_level(level)
                .map_err(|_| ConfigError::InvalidLogLevel(level.to_string()))?;
        }
        if let Some(dir) = log_dir {
            self.log_dir = Some(absolute_dir(dir)?);
        }
        Ok(self)
    }
}

fn non_blank(key: &'static str, value: Option<String>) -> Result<Option<String>, ConfigError> {
    match value {
        Some(value) if value.trim().is_empty() => Err(ConfigError::EmptyValue(key)),
        Some(value) => Ok(Some(value.trim().to_string())),
        None => Ok(None),
    }
}

fn absolute_dir(path: PathBuf) -> Result<PathBuf, ConfigError> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Err(ConfigError::RelativeLogDir(path))
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, RegistrarConfig, ENV_DB_PATH, ENV_LOG_DIR, ENV_LOG_LEVEL};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = RegistrarConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, RegistrarConfig::default());
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn env_values_are_normalized() {
        let dir = std::env::temp_dir();
        let dir_text = dir.to_str().unwrap();
        let config = RegistrarConfig::from_lookup(lookup(&[
            (ENV_DB_PATH, "/data/registrar.db"),
            (ENV_LOG_LEVEL, "WARNING"),
            (ENV_LOG_DIR, dir_text),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/data/registrar.db"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(dir));
    }

    #[test]
    fn blank_and_relative_values_are_rejected() {
        let err = RegistrarConfig::from_lookup(lookup(&[(ENV_DB_PATH, "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::EmptyValue(ENV_DB_PATH));

        let err = RegistrarConfig::from_lookup(lookup(&[(ENV_LOG_DIR, "logs")])).unwrap_err();
        assert!(matches!(err, ConfigError::RelativeLogDir(_)));
    }

    #[test]
    fn overrides_win_over_environment() {
        let config = RegistrarConfig::from_lookup(lookup(&[(ENV_LOG_LEVEL, "error")]))
            .unwrap()
            .with_overrides(Some(PathBuf::from("other.db")), Some("trace"), None)
            .unwrap();
        assert_eq!(config.db_path, PathBuf::from("other.db"));
        assert_eq!(config.log_level, "trace");
    }
}
