use super::{CacheError, CacheResult, CredentialCache, OverwritePolicy, PutOutcome, credential_key};
use crate::database::entities::AccountId;
use async_trait::async_trait;
use redis::{AsyncCommands, Client, RedisError, Script, aio::ConnectionManager};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::info;

/// Set-if-absent-or-overwrite in one server-side step.
///
/// KEYS[1] credential key, ARGV[1] token, ARGV[2] TTL in ms,
/// ARGV[3] "1" to restart the TTL on overwrite. Returns 1 when the key
/// was created, 0 when a live key was overwritten. `KEEPTTL` needs Redis 6.
const PUT_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
  if ARGV[3] == '1' then
    redis.call('SET', KEYS[1], ARGV[1], 'PX', ARGV[2])
  else
    redis.call('SET', KEYS[1], ARGV[1], 'KEEPTTL')
  end
  return 0
end
redis.call('SET', KEYS[1], ARGV[1], 'PX', ARGV[2])
return 1
"#;

/// Redis-backed credential cache. Expiry is enforced by Redis itself.
///
/// The connection is opened lazily so the service can start, and keep
/// logging members in, while Redis is down.
pub struct RedisCredentialCache {
    client: Client,
    connection: Mutex<Option<ConnectionManager>>,
    key_prefix: String,
    policy: OverwritePolicy,
    command_timeout: Duration,
    put_script: Script,
}

impl RedisCredentialCache {
    pub fn new(
        redis_url: &str,
        key_prefix: &str,
        policy: OverwritePolicy,
        command_timeout: Duration,
    ) -> CacheResult<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| CacheError::Connection(format!("Redis client error: {}", e)))?;

        Ok(Self {
            client,
            connection: Mutex::new(None),
            key_prefix: key_prefix.to_string(),
            policy,
            command_timeout,
            put_script: Script::new(PUT_SCRIPT),
        })
    }

    fn key(&self, account_id: AccountId) -> String {
        format!("{}{}", self.key_prefix, credential_key(account_id))
    }

    async fn connection(&self) -> CacheResult<ConnectionManager> {
        let mut slot = self.connection.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        let conn = timeout(self.command_timeout, self.client.get_connection_manager())
            .await
            .map_err(|_| CacheError::Timeout(self.command_timeout))?
            .map_err(|e| CacheError::Connection(format!("Redis connection error: {}", e)))?;

        info!("Connected to Redis credential cache");
        *slot = Some(conn.clone());
        Ok(conn)
    }
}

#[async_trait]
impl CredentialCache for RedisCredentialCache {
    async fn put(
        &self,
        account_id: AccountId,
        provider_token: &str,
        ttl: Duration,
    ) -> CacheResult<PutOutcome> {
        let key = self.key(account_id);
        let ttl_ms = ttl.as_millis().max(1) as u64;
        let refresh = if self.policy == OverwritePolicy::RefreshExpiry {
            "1"
        } else {
            "0"
        };

        let mut invocation = self.put_script.prepare_invoke();
        invocation.key(&key).arg(provider_token).arg(ttl_ms).arg(refresh);

        let mut conn = self.connection().await?;
        let created: i64 = timeout(self.command_timeout, invocation.invoke_async(&mut conn))
            .await
            .map_err(|_| CacheError::Timeout(self.command_timeout))?
            .map_err(|e: RedisError| CacheError::Cache(format!("Redis put error: {}", e)))?;

        Ok(if created == 1 {
            PutOutcome::Created
        } else {
            PutOutcome::Overwritten
        })
    }

    async fn get(&self, account_id: AccountId) -> CacheResult<Option<String>> {
        let key = self.key(account_id);
        let mut conn = self.connection().await?;

        let value: Option<String> = timeout(self.command_timeout, conn.get(&key))
            .await
            .map_err(|_| CacheError::Timeout(self.command_timeout))?
            .map_err(|e: RedisError| CacheError::Cache(format!("Redis GET error: {}", e)))?;

        Ok(value)
    }

    async fn delete(&self, account_id: AccountId) -> CacheResult<()> {
        let key = self.key(account_id);
        let mut conn = self.connection().await?;

        timeout(self.command_timeout, async {
            let _: () = conn.del(&key).await?;
            Ok::<(), RedisError>(())
        })
        .await
        .map_err(|_| CacheError::Timeout(self.command_timeout))?
        .map_err(|e: RedisError| CacheError::Cache(format!("Redis DEL error: {}", e)))?;

        Ok(())
    }

    async fn health_check(&self) -> CacheResult<()> {
        let mut conn = self.connection().await?;

        timeout(
            self.command_timeout,
            redis::cmd("PING").query_async::<String>(&mut conn),
        )
        .await
        .map_err(|_| CacheError::Timeout(self.command_timeout))?
        .map_err(|e| CacheError::Connection(format!("Redis ping failed: {}", e)))?;

        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_is_rejected() {
        let result = RedisCredentialCache::new(
            "not-a-redis-url",
            "",
            OverwritePolicy::KeepExpiry,
            Duration::from_millis(100),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_key_uses_shared_constructor() {
        let cache = RedisCredentialCache::new(
            "redis://localhost:6379",
            "",
            OverwritePolicy::KeepExpiry,
            Duration::from_millis(100),
        )
        .unwrap();
        assert_eq!(cache.key(5), "member_kakao_token_5");

        let prefixed = RedisCredentialCache::new(
            "redis://localhost:6379",
            "shop:",
            OverwritePolicy::KeepExpiry,
            Duration::from_millis(100),
        )
        .unwrap();
        assert_eq!(prefixed.key(5), "shop:member_kakao_token_5");
    }

    #[tokio::test]
    async fn test_unreachable_server_surfaces_error() {
        // Nothing listens on port 1
        let cache = RedisCredentialCache::new(
            "redis://127.0.0.1:1",
            "",
            OverwritePolicy::KeepExpiry,
            Duration::from_millis(200),
        )
        .unwrap();

        assert!(cache.get(1).await.is_err());
        assert!(cache.health_check().await.is_err());
    }
}
