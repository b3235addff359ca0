// src/config.rs
use serde::Deserialize;
use std::time::Duration;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    Memory,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub database_url: String,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default = "default_store_backend")]
    pub store_backend: StoreBackend,
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    #[serde(default = "default_jwt_expiration_hours")]
    pub jwt_expiration_hours: i64,
    #[serde(default = "default_rate_limit")]
    pub rate_limit: i64,
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::Redis
}

fn default_store_timeout_ms() -> u64 {
    2000
}

fn default_jwt_expiration_hours() -> i64 {
    1
}

fn default_rate_limit() -> i64 {
    100
}

fn default_rate_limit_window_secs() -> u64 {
    60
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_environment() -> String {
    "development".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] envy::Error),
    #[error("{0}")]
    Invalid(String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config: Config = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_expiration_hours <= 0 {
            return Err(ConfigError::Invalid(
                "JWT_EXPIRATION_HOURS must be positive".to_string(),
            ));
        }
        if self.is_production() {
            if self.jwt_secret.is_empty() || self.jwt_refresh_secret.is_empty() {
                return Err(ConfigError::Invalid(
                    "JWT_SECRET and JWT_REFRESH_SECRET must be set in production".to_string(),
                ));
            }
            // a renewal token must never verify as an access token
            if self.jwt_secret == self.jwt_refresh_secret {
                return Err(ConfigError::Invalid(
                    "JWT_SECRET and JWT_REFRESH_SECRET must differ".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}
