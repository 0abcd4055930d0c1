//! Server configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use gasmon_types::DEFAULT_GAS_THRESHOLD;

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings.
    pub server: ServerConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Classification settings.
    pub classifier: ClassifierConfig,
    /// History endpoint settings.
    pub history: HistoryConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - Server bind address is valid (host:port format) and the push buffer is non-zero
    /// - Storage path is not empty
    /// - Gas threshold is a finite, non-negative number
    /// - History limits satisfy `1 <= default_limit <= max_limit`
    ///
    /// # Example
    ///
    /// ```
    /// use gasmon_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.classifier.validate());
        errors.extend(self.history.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind: String,
    /// Capacity of the push channel buffer. Slow subscribers lose the oldest
    /// events once it fills.
    pub broadcast_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            broadcast_buffer: 100,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError {
                field: "server.bind".to_string(),
                message: "bind address cannot be empty".to_string(),
            });
        } else {
            match self.bind.rsplit_once(':') {
                None => errors.push(ValidationError {
                    field: "server.bind".to_string(),
                    message: format!(
                        "invalid bind address '{}': expected format 'host:port'",
                        self.bind
                    ),
                }),
                Some((_, port)) => match port.parse::<u16>() {
                    Ok(0) => errors.push(ValidationError {
                        field: "server.bind".to_string(),
                        message: "port cannot be 0".to_string(),
                    }),
                    Err(_) => errors.push(ValidationError {
                        field: "server.bind".to_string(),
                        message: format!("invalid port '{}': must be a number 1-65535", port),
                    }),
                    Ok(_) => {}
                },
            }
        }

        if self.broadcast_buffer == 0 {
            errors.push(ValidationError {
                field: "server.broadcast_buffer".to_string(),
                message: "broadcast buffer must be greater than 0".to_string(),
            });
        }

        errors
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: gasmon_store::default_db_path(),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.path".to_string(),
                message: "database path cannot be empty".to_string(),
            });
        }

        errors
    }
}

/// Classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Channel value (ppm) above which a channel is classified as danger.
    pub gas_threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            gas_threshold: DEFAULT_GAS_THRESHOLD,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !self.gas_threshold.is_finite() || self.gas_threshold < 0.0 {
            errors.push(ValidationError {
                field: "classifier.gas_threshold".to_string(),
                message: format!(
                    "threshold {} must be a finite, non-negative number",
                    self.gas_threshold
                ),
            });
        }

        errors
    }
}

/// History endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Rows returned when the request carries no usable `limit`.
    pub default_limit: u32,
    /// Hard ceiling on rows per request.
    pub max_limit: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 100,
        }
    }
}

impl HistoryConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.default_limit == 0 {
            errors.push(ValidationError {
                field: "history.default_limit".to_string(),
                message: "default limit must be at least 1".to_string(),
            });
        }
        if self.default_limit > self.max_limit {
            errors.push(ValidationError {
                field: "history.max_limit".to_string(),
                message: format!(
                    "max limit {} is below the default limit {}",
                    self.max_limit, self.default_limit
                ),
            });
        }

        errors
    }

    /// Resolve a raw `limit` query value.
    ///
    /// Only the leading integer counts (`"12.7"` is 12). Values without one
    /// fall back to `default_limit`; negative values become 0; everything is
    /// clamped to `max_limit`.
    ///
    /// ```
    /// use gasmon_service::config::HistoryConfig;
    ///
    /// let history = HistoryConfig::default();
    /// assert_eq!(history.resolve_limit(None), 50);
    /// assert_eq!(history.resolve_limit(Some("500")), 100);
    /// assert_eq!(history.resolve_limit(Some(" 7 ")), 7);
    /// assert_eq!(history.resolve_limit(Some("seven")), 50);
    /// ```
    pub fn resolve_limit(&self, raw: Option<&str>) -> u32 {
        let requested = match raw.and_then(leading_integer) {
            Some(n) => n.clamp(0, i64::from(u32::MAX)) as u32,
            None => self.default_limit,
        };
        requested.min(self.max_limit)
    }
}

/// Parse the integer prefix of `raw`, so `"12.7"` and `"10abc"` both give
/// their leading digits. Overlong digit runs saturate.
fn leading_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim_start();
    let (negative, digits) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind` or `history.max_limit`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gasmon")
        .join("server.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation_fields(config: &Config) -> Vec<String> {
        match config.validate() {
            Err(ConfigError::Validation(errors)) => errors.into_iter().map(|e| e.field).collect(),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(()) => Vec::new(),
        }
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.server.broadcast_buffer, 100);
        assert_eq!(config.storage.path, gasmon_store::default_db_path());
        assert_eq!(config.classifier.gas_threshold, 400.0);
        assert_eq!(config.history.default_limit, 50);
        assert_eq!(config.history.max_limit, 100);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [classifier]
            gas_threshold = 250.0
            "#,
        )
        .unwrap();

        assert_eq!(config.classifier.gas_threshold, 250.0);
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.history.max_limit, 100);
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("conf").join("server.toml");

        let config = Config {
            server: ServerConfig {
                bind: "0.0.0.0:9090".to_string(),
                broadcast_buffer: 16,
            },
            storage: StorageConfig {
                path: PathBuf::from("/tmp/gasmon-test.db"),
            },
            classifier: ClassifierConfig {
                gas_threshold: 300.0,
            },
            history: HistoryConfig {
                default_limit: 20,
                max_limit: 40,
            },
        };

        config.save(&config_path).unwrap();
        let loaded = Config::load_validated(&config_path).unwrap();

        assert_eq!(loaded.server.bind, "0.0.0.0:9090");
        assert_eq!(loaded.server.broadcast_buffer, 16);
        assert_eq!(loaded.storage.path, PathBuf::from("/tmp/gasmon-test.db"));
        assert_eq!(loaded.classifier.gas_threshold, 300.0);
        assert_eq!(loaded.history.default_limit, 20);
        assert_eq!(loaded.history.max_limit, 40);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/gasmon/server.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("bad.toml");
        std::fs::write(&path, "[server\nbind = ").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_validate_bind_address() {
        let mut config = Config::default();

        config.server.bind = "localhost".to_string();
        assert_eq!(validation_fields(&config), vec!["server.bind"]);

        config.server.bind = "localhost:0".to_string();
        assert_eq!(validation_fields(&config), vec!["server.bind"]);

        config.server.bind = "localhost:http".to_string();
        assert_eq!(validation_fields(&config), vec!["server.bind"]);

        config.server.bind = "[::1]:8080".to_string();
        assert!(validation_fields(&config).is_empty());
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = Config::default();
        config.server.broadcast_buffer = 0;
        config.storage.path = PathBuf::new();
        config.classifier.gas_threshold = f64::NAN;
        config.history.default_limit = 0;

        let fields = validation_fields(&config);
        assert_eq!(
            fields,
            vec![
                "server.broadcast_buffer",
                "storage.path",
                "classifier.gas_threshold",
                "history.default_limit",
            ]
        );

        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("storage.path: database path cannot be empty"));
    }

    #[test]
    fn test_validate_limit_ordering() {
        let mut config = Config::default();
        config.history.default_limit = 150;
        assert_eq!(validation_fields(&config), vec!["history.max_limit"]);
    }

    #[test]
    fn test_resolve_limit() {
        let history = HistoryConfig::default();

        assert_eq!(history.resolve_limit(None), 50);
        assert_eq!(history.resolve_limit(Some("")), 50);
        assert_eq!(history.resolve_limit(Some("12")), 12);
        assert_eq!(history.resolve_limit(Some("100")), 100);
        assert_eq!(history.resolve_limit(Some("500")), 100);
        assert_eq!(history.resolve_limit(Some("-3")), 0);
        assert_eq!(history.resolve_limit(Some("abc")), 50);
        assert_eq!(history.resolve_limit(Some("-")), 50);
        assert_eq!(history.resolve_limit(Some("99999999999999999999")), 100);
    }

    #[test]
    fn test_resolve_limit_uses_leading_digits() {
        let history = HistoryConfig::default();

        assert_eq!(history.resolve_limit(Some("12.7")), 12);
        assert_eq!(history.resolve_limit(Some("10abc")), 10);
        assert_eq!(history.resolve_limit(Some("+8")), 8);
        assert_eq!(history.resolve_limit(Some("-4x")), 0);
    }
}
