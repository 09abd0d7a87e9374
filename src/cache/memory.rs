use super::{
    CacheResult, CachedCredential, CredentialCache, OverwritePolicy, PutOutcome, credential_key,
};
use crate::cache::CacheError;
use crate::database::entities::AccountId;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::{DashMap, mapref::entry::Entry};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// In-process credential cache.
///
/// Per-key atomicity comes from the DashMap shard lock held by
/// [`DashMap::entry`] for the whole read-check-write.
pub struct MemoryCredentialCache {
    entries: Arc<DashMap<String, CachedCredential>>,
    policy: OverwritePolicy,
}

impl MemoryCredentialCache {
    /// A zero `cleanup_interval` disables the background sweeper; expired
    /// entries are then only evicted lazily on read.
    pub fn new(policy: OverwritePolicy, cleanup_interval: Duration) -> Self {
        let cache = Self {
            entries: Arc::new(DashMap::new()),
            policy,
        };

        if !cleanup_interval.is_zero() {
            cache.start_cleanup_task(cleanup_interval);
        }
        cache
    }

    fn start_cleanup_task(&self, interval: Duration) {
        let entries = Arc::downgrade(&self.entries);

        tokio::spawn(async move {
            loop {
                sleep(interval).await;

                let Some(entries) = Weak::upgrade(&entries) else {
                    break;
                };
                let before = entries.len();
                entries.retain(|_, entry| !entry.is_expired());
                let evicted = before.saturating_sub(entries.len());
                if evicted > 0 {
                    debug!(evicted, "Swept expired credentials");
                }
            }
        });
    }

    /// Number of stored entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Full entry including expiry, `None` when absent or expired.
    pub fn inspect(&self, account_id: AccountId) -> Option<CachedCredential> {
        self.entries
            .get(&credential_key(account_id))
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.clone())
    }
}

#[async_trait]
impl CredentialCache for MemoryCredentialCache {
    async fn put(
        &self,
        account_id: AccountId,
        provider_token: &str,
        ttl: Duration,
    ) -> CacheResult<PutOutcome> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| CacheError::Cache(format!("TTL out of range: {}", e)))?;
        let now = Utc::now();
        let fresh = || CachedCredential {
            account_id,
            provider_token: provider_token.to_string(),
            expires_at: now + ttl,
        };

        let outcome = match self.entries.entry(credential_key(account_id)) {
            Entry::Occupied(mut occupied) if !occupied.get().is_expired_at(now) => {
                let entry = occupied.get_mut();
                entry.provider_token = provider_token.to_string();
                if self.policy == OverwritePolicy::RefreshExpiry {
                    entry.expires_at = now + ttl;
                }
                PutOutcome::Overwritten
            }
            // An expired entry counts as absent
            Entry::Occupied(mut occupied) => {
                occupied.insert(fresh());
                PutOutcome::Created
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh());
                PutOutcome::Created
            }
        };

        Ok(outcome)
    }

    async fn get(&self, account_id: AccountId) -> CacheResult<Option<String>> {
        let key = credential_key(account_id);
        let live = self.entries.get(&key).and_then(|entry| {
            if entry.is_expired() {
                None
            } else {
                Some(entry.provider_token.clone())
            }
        });

        if live.is_none() {
            // Only evict if still expired, a concurrent put may have refreshed it
            self.entries.remove_if(&key, |_, entry| entry.is_expired());
        }
        Ok(live)
    }

    async fn delete(&self, account_id: AccountId) -> CacheResult<()> {
        self.entries.remove(&credential_key(account_id));
        Ok(())
    }

    async fn health_check(&self) -> CacheResult<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
