use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

/// Relay settings, read from the environment
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port for HTTP and WebSocket traffic
    #[serde(default = "default_port")]
    pub port: u16,

    /// `development` enables permissive CORS when no origins are listed
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated
    pub cors_origins: Option<String>,

    /// Level for this crate's own logs when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Database URL. Documents are kept in memory when absent.
    pub db_url: Option<String>,

    /// Largest text frame the relay will process
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,

    /// Tell remaining participants when someone disconnects
    #[serde(default)]
    pub announce_departures: bool,
}

impl Config {
    /// Read `app.env` (or `.env`) into the environment, then deserialize
    pub fn load() -> Result<Self, ConfigError> {
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            dotenvy::dotenv().ok();
        }

        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("✅ Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    /// `host:port` for the listener
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_development(&self) -> bool {
        ["dev", "development"]
            .iter()
            .any(|name| self.environment.eq_ignore_ascii_case(name))
    }

    /// Origins listed in `cors_origins`, trimmed, empties dropped
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            cors_origins: None,
            service_name: default_service_name(),
            db_url: None,
            max_message_bytes: default_max_message_bytes(),
            announce_departures: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvError(#[from] envy::Error),
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "debug".to_string()
}

fn default_service_name() -> String {
    "notepad-sync".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_max_message_bytes() -> usize {
    1024 * 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.server_address(), "0.0.0.0:3000");
        assert!(!config.announce_departures);
        assert!(config.db_url.is_none());
        assert!(config.is_development());
    }

    #[test]
    fn parses_from_env_pairs() {
        let vars = vec![
            ("PORT".to_string(), "8080".to_string()),
            ("ANNOUNCE_DEPARTURES".to_string(), "true".to_string()),
            ("MAX_MESSAGE_BYTES".to_string(), "2048".to_string()),
            ("SERVICE_NAME".to_string(), "notes-relay".to_string()),
            ("CORS_ORIGINS".to_string(), "http://a.test, ,http://b.test".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.announce_departures);
        assert_eq!(config.max_message_bytes, 2048);
        assert_eq!(config.service_name, "notes-relay");
        assert_eq!(config.cors_origin_list(), vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.host, "0.0.0.0");
    }
}
