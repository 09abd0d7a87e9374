use crate::{
    auth::{JwtServiceImpl, config::JwtConfig},
    cache::config::CacheConfig,
    database::config::DatabaseConfig,
    provider::config::KakaoConfig,
    server::config::{LoggingConfig, MetricsConfig, ServerConfig},
};
use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

const ENV_PREFIX: &str = "KAKAO_LOGIN";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub jwt: JwtConfig,
    #[serde(default)]
    pub kakao: KakaoConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder =
            ConfigBuilder::builder().add_source(config::Config::try_from(&Config::default())?);

        if Path::new("config.yaml").exists() {
            builder = builder.add_source(File::with_name("config"));
        }

        builder = builder.add_source(Self::env_source());

        builder.build()?.try_deserialize()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut builder =
            ConfigBuilder::builder().add_source(config::Config::try_from(&Config::default())?);

        if path.as_ref().exists() {
            builder = builder.add_source(File::from(path.as_ref()));
        }

        builder = builder.add_source(Self::env_source());

        builder.build()?.try_deserialize()
    }

    fn env_source() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
    }

    /// Reject settings the service cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        JwtServiceImpl::from_config(&self.jwt)
            .map_err(|e| ConfigError::Message(format!("jwt: {}", e)))?;
        if !matches!(self.cache.backend.as_str(), "memory" | "redis") {
            return Err(ConfigError::Message(format!(
                "cache.backend must be 'memory' or 'redis', got '{}'",
                self.cache.backend
            )));
        }
        if self.cache.credential_ttl == 0 {
            return Err(ConfigError::Message(
                "cache.credential_ttl must be greater than zero".into(),
            ));
        }
        if self.kakao.request_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "kakao.request_timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
