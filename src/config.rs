//! Service configuration, read from a TOML file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "OMNISEND_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "./omnisend.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Populate empty collections with demo records on startup
    #[serde(default)]
    pub seed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1:8080".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "kebab-case")]
pub enum StorageConfig {
    Memory,
    File {
        #[serde(default = "default_data_dir")]
        path: PathBuf,
    },
    Mongo {
        #[serde(default = "default_mongo_uri")]
        uri: String,
        #[serde(default = "default_mongo_database")]
        database: String,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::File {
            path: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_mongo_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_mongo_database() -> String {
    "omnisend".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Probability that a simulated transmission succeeds
    #[serde(default = "default_success_rate")]
    pub success_rate: f64,

    #[serde(default)]
    pub rotation: RotationConfig,

    #[serde(default)]
    pub recipients: RecipientScope,

    #[serde(default)]
    pub completion: CompletionConfig,

    /// Period of the server-side tick loop; disabled when unset
    #[serde(default)]
    pub autotick_ms: Option<u64>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            success_rate: default_success_rate(),
            rotation: RotationConfig::default(),
            recipients: RecipientScope::default(),
            completion: CompletionConfig::default(),
            autotick_ms: None,
        }
    }
}

fn default_success_rate() -> f64 {
    0.95
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RotationConfig {
    #[default]
    Uniform,
    RoundRobin,
}

/// Which contacts a campaign may be delivered to.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecipientScope {
    /// The campaign's assigned contacts, or the whole book when none are
    /// assigned.
    #[default]
    Assigned,
    /// Always the whole contact book.
    All,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "kebab-case")]
pub enum CompletionConfig {
    #[default]
    Never,
    Attempts {
        target: u64,
    },
    Audience,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!("failed to read {}: {}", path.display(), e))
        })?;

        content.parse()
    }

    /// Loads the file named by `OMNISEND_CONFIG`, then `./omnisend.toml`,
    /// falling back to the defaults when neither exists.
    pub fn load() -> Result<Self, Error> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }

        let path = Path::new(DEFAULT_CONFIG_PATH);
        if path.exists() {
            return Self::from_file(path);
        }

        Ok(Config::default())
    }

    pub fn validate(&self) -> Result<(), Error> {
        let rate = self.dispatch.success_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(Error::InvalidConfig(format!(
                "dispatch.success_rate must be within [0, 1], got {}",
                rate
            )));
        }

        if self.dispatch.autotick_ms == Some(0) {
            return Err(Error::InvalidConfig(
                "dispatch.autotick_ms must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

impl std::str::FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_console() {
        let config = Config::default();

        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert_eq!(
            config.storage,
            StorageConfig::File {
                path: PathBuf::from("data")
            }
        );
        assert_eq!(config.dispatch.success_rate, 0.95);
        assert_eq!(config.dispatch.rotation, RotationConfig::Uniform);
        assert_eq!(config.dispatch.recipients, RecipientScope::Assigned);
        assert_eq!(config.dispatch.completion, CompletionConfig::Never);
        assert_eq!(config.dispatch.autotick_ms, None);
        assert!(!config.seed);
    }

    #[test]
    fn parses_a_full_file() {
        let config: Config = r#"
            seed = true

            [server]
            bind_address = "0.0.0.0:3000"

            [storage]
            backend = "mongo"
            database = "console"

            [dispatch]
            success_rate = 0.8
            rotation = "round-robin"
            recipients = "all"
            autotick_ms = 3000

            [dispatch.completion]
            policy = "attempts"
            target = 500
        "#
        .parse()
        .unwrap();

        assert!(config.seed);
        assert_eq!(config.server.bind_address, "0.0.0.0:3000");
        assert_eq!(
            config.storage,
            StorageConfig::Mongo {
                uri: "mongodb://localhost:27017".to_string(),
                database: "console".to_string(),
            }
        );
        assert_eq!(config.dispatch.rotation, RotationConfig::RoundRobin);
        assert_eq!(config.dispatch.recipients, RecipientScope::All);
        assert_eq!(
            config.dispatch.completion,
            CompletionConfig::Attempts { target: 500 }
        );
        assert_eq!(config.dispatch.autotick_ms, Some(3000));
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = "".parse().unwrap();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.dispatch.success_rate, 0.95);
    }

    #[test]
    fn rejects_out_of_range_success_rate() {
        let result = "[dispatch]\nsuccess_rate = 1.5".parse::<Config>();

        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
