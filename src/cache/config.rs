use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// `memory` or `redis`
    #[serde(default = "default_cache_backend")]
    pub backend: String,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Prepended to every Redis key. Empty keeps keys in the plain
    /// `member_kakao_token_<id>` form.
    #[serde(default)]
    pub key_prefix: String,
    /// Lifetime in seconds of a freshly written provider credential
    #[serde(default = "default_credential_ttl")]
    pub credential_ttl: u64,
    /// When true, overwriting a live credential also restarts its TTL.
    #[serde(default)]
    pub refresh_ttl_on_overwrite: bool,
    /// Seconds between sweeps of expired in-memory entries
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval: u64,
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

fn default_cache_backend() -> String {
    "memory".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_credential_ttl() -> u64 {
    1000
}

fn default_cleanup_interval() -> u64 {
    300
}

fn default_command_timeout_ms() -> u64 {
    1000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            redis_url: default_redis_url(),
            key_prefix: String::new(),
            credential_ttl: default_credential_ttl(),
            refresh_ttl_on_overwrite: false,
            cleanup_interval: default_cleanup_interval(),
            command_timeout_ms: default_command_timeout_ms(),
        }
    }
}

impl CacheConfig {
    pub fn credential_ttl(&self) -> Duration {
        Duration::from_secs(self.credential_ttl)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}
