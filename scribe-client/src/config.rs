//! Client configuration loaded with figment.
//!
//! Sources in precedence order (later sources override earlier ones):
//! 1. Built-in defaults
//! 2. An optional configuration file (TOML, YAML or JSON, chosen by extension)
//! 3. Environment variables prefixed with `SCRIBE_`

use std::path::Path;

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Prefix of environment variables read by `ScribeConfig::load`.
pub const ENV_PREFIX: &str = "SCRIBE_";

/// Where and whether encoded lines are sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScribeConfig {
    /// Category every line is sent under.
    pub category: String,
    /// Collector host, reserved for transports that open a connection.
    /// `LogTransport` and `MemoryTransport` ignore it.
    pub host: String,
    /// Collector port, paired with `host`.
    pub port: u16,
    /// When false, `ScribeClient::send` encodes but never calls the transport.
    pub enabled: bool,
}

impl Default for ScribeConfig {
    fn default() -> Self {
        Self {
            category: "default".to_string(),
            host: "127.0.0.1".to_string(),
            port: 1463,
            enabled: true,
        }
    }
}

impl ScribeConfig {
    /// Load defaults, then `path` if given, then the environment.
    ///
    /// An explicitly named file that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
        }
        Self::from_figment(Self::figment(path)?)
    }

    /// The layered figment `load` extracts from.
    pub fn figment(path: Option<&Path>) -> Result<Figment, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(ScribeConfig::default()));
        if let Some(path) = path {
            debug!(path = %path.display(), "loading scribe configuration file");
            figment = match extension(path).as_deref() {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("yaml") | Some("yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "path".to_string(),
                        message: format!(
                            "unsupported configuration format: {}",
                            path.display()
                        ),
                    })
                }
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Extract and validate a configuration from any figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: ScribeConfig = figment.extract()?;
        config.validate()?;
        debug!(
            category = %config.category,
            endpoint = %config.endpoint(),
            enabled = config.enabled,
            "loaded scribe configuration"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.category.trim().is_empty() {
            return Err(invalid("category", "must not be empty"));
        }
        if self.host.trim().is_empty() {
            return Err(invalid("host", "must not be empty"));
        }
        if self.port == 0 {
            return Err(invalid("port", "must not be zero"));
        }
        Ok(())
    }

    /// `host:port` of the collector, for transports that open a connection.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    fn clear_env() {
        for key in ["CATEGORY", "HOST", "PORT", "ENABLED"] {
            env::remove_var(format!("{ENV_PREFIX}{key}"));
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = ScribeConfig::load(None).unwrap();
        assert_eq!(config, ScribeConfig::default());
        assert_eq!(config.endpoint(), "127.0.0.1:1463");
    }

    #[test]
    #[serial]
    fn test_toml_file_overrides_defaults() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scribe.toml");
        fs::write(&path, "category = \"audit\"\nport = 1500\n").unwrap();

        let config = ScribeConfig::load(Some(&path)).unwrap();
        assert_eq!(config.category, "audit");
        assert_eq!(config.port, 1500);
        assert_eq!(config.host, "127.0.0.1");
        assert!(config.enabled);
    }

    #[test]
    #[serial]
    fn test_yaml_and_json_files() {
        clear_env();
        let dir = TempDir::new().unwrap();

        let yaml = dir.path().join("scribe.yml");
        fs::write(&yaml, "host: collector.local\nenabled: false\n").unwrap();
        let config = ScribeConfig::load(Some(&yaml)).unwrap();
        assert_eq!(config.host, "collector.local");
        assert!(!config.enabled);

        let json = dir.path().join("scribe.json");
        fs::write(&json, r#"{"category": "events"}"#).unwrap();
        let config = ScribeConfig::load(Some(&json)).unwrap();
        assert_eq!(config.category, "events");
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scribe.toml");
        fs::write(&path, "category = \"audit\"\n").unwrap();

        env::set_var("SCRIBE_CATEGORY", "from-env");
        env::set_var("SCRIBE_PORT", "2000");
        let config = ScribeConfig::load(Some(&path));
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.category, "from-env");
        assert_eq!(config.port, 2000);
    }

    #[test]
    #[serial]
    fn test_endpoint_follows_host_and_port() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scribe.toml");
        fs::write(&path, "host = \"collector.local\"\nport = 9463\n").unwrap();

        let config = ScribeConfig::load(Some(&path)).unwrap();
        assert_eq!(config.endpoint(), "collector.local:9463");
    }

    #[test]
    fn test_missing_file() {
        let err = ScribeConfig::load(Some(Path::new("/nonexistent/scribe.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scribe.ini");
        fs::write(&path, "port=1").unwrap();
        let err = ScribeConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "path"));
    }

    #[test]
    fn test_validation() {
        let config = ScribeConfig {
            port: 0,
            ..ScribeConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "port"
        ));

        let config = ScribeConfig {
            category: "  ".to_string(),
            ..ScribeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_value_is_a_parse_error() {
        let figment = Figment::new()
            .merge(Serialized::defaults(ScribeConfig::default()))
            .merge(Serialized::default("port", "not-a-port"));
        let err = ScribeConfig::from_figment(figment).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }
}
