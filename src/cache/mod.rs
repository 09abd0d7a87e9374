//! Credential cache for Kakao access tokens
//!
//! Each member holds at most one live provider credential, stored under
//! [`credential_key`]. Writes follow set-if-absent-or-overwrite semantics:
//! a fresh entry gets the full TTL, an overwrite of a live entry keeps the
//! original expiry unless [`OverwritePolicy::RefreshExpiry`] is configured.

use crate::database::entities::AccountId;
use crate::health::{HealthCheckResult, HealthChecker};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod config;
pub mod memory;
pub mod redis;

pub use memory::MemoryCredentialCache;
pub use redis::RedisCredentialCache;

use crate::cache::config::CacheConfig;

const CREDENTIAL_KEY_PREFIX: &str = "member_kakao_token_";

/// Cache error types
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache error: {0}")]
    Cache(String),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// The one place cache keys are built. Every read, write and delete goes
/// through here so login and logout can never disagree on the key.
pub fn credential_key(account_id: AccountId) -> String {
    format!("{CREDENTIAL_KEY_PREFIX}{account_id}")
}

/// What happens to the expiry of a live entry when it is overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Replace the token, keep the original expiry
    #[default]
    KeepExpiry,
    /// Replace the token and restart the TTL
    RefreshExpiry,
}

impl OverwritePolicy {
    pub fn from_config(config: &CacheConfig) -> Self {
        if config.refresh_ttl_on_overwrite {
            OverwritePolicy::RefreshExpiry
        } else {
            OverwritePolicy::KeepExpiry
        }
    }
}

/// Result of a [`CredentialCache::put`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Created,
    Overwritten,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedCredential {
    pub account_id: AccountId,
    pub provider_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedCredential {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Keyed store of provider credentials. Mutations are atomic per key.
#[async_trait]
pub trait CredentialCache: Send + Sync {
    /// Create the entry with `ttl`, or overwrite a live one per the
    /// configured [`OverwritePolicy`].
    async fn put(
        &self,
        account_id: AccountId,
        provider_token: &str,
        ttl: Duration,
    ) -> CacheResult<PutOutcome>;

    /// Live token for the member, `None` when absent or expired.
    async fn get(&self, account_id: AccountId) -> CacheResult<Option<String>>;

    /// Remove the entry. Deleting a missing entry is not an error.
    async fn delete(&self, account_id: AccountId) -> CacheResult<()>;

    async fn health_check(&self) -> CacheResult<()>;

    fn backend(&self) -> &'static str;
}

/// Build the backend named by `config.backend`.
///
/// Must be called from within a Tokio runtime; the memory backend spawns
/// its sweeper task here.
pub fn build_credential_cache(config: &CacheConfig) -> CacheResult<Arc<dyn CredentialCache>> {
    let policy = OverwritePolicy::from_config(config);
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryCredentialCache::new(
            policy,
            Duration::from_secs(config.cleanup_interval),
        ))),
        "redis" => Ok(Arc::new(RedisCredentialCache::new(
            &config.redis_url,
            &config.key_prefix,
            policy,
            config.command_timeout(),
        )?)),
        other => Err(CacheError::Cache(format!(
            "unsupported cache backend: {other}"
        ))),
    }
}

/// Reports whether the credential cache backend answers.
pub struct CredentialCacheHealthChecker {
    cache: Arc<dyn CredentialCache>,
}

impl CredentialCacheHealthChecker {
    pub fn new(cache: Arc<dyn CredentialCache>) -> Arc<Self> {
        Arc::new(Self { cache })
    }
}

#[async_trait]
impl HealthChecker for CredentialCacheHealthChecker {
    fn name(&self) -> &str {
        "credential_cache"
    }

    async fn check(&self) -> HealthCheckResult {
        match self.cache.health_check().await {
            Ok(()) => HealthCheckResult::healthy_with_details(serde_json::json!({
                "backend": self.cache.backend(),
            })),
            // Logins keep working without the cache, so this is not fatal
            Err(err) => HealthCheckResult::degraded_with_details(
                "Credential cache unreachable".to_string(),
                serde_json::json!({
                    "backend": self.cache.backend(),
                    "error": err.to_string(),
                }),
            ),
        }
    }
}
