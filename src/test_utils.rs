use crate::{
    config::Config,
    provider::{ProviderClient, ProviderError, ProviderProfile, ProviderToken},
    server::Server,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

/// Profile with an email and optional nickname
pub fn profile(email: &str, display_name: Option<&str>) -> ProviderProfile {
    ProviderProfile {
        provider_user_id: None,
        email: Some(email.to_string()),
        display_name: display_name.map(str::to_string),
        avatar_url: None,
    }
}

/// Scripted provider. Each registered code redeems once, like Kakao's.
#[derive(Default)]
pub struct FakeProvider {
    codes: Mutex<HashMap<String, (String, ProviderProfile)>>,
    profiles: Mutex<HashMap<String, ProviderProfile>>,
    delay: Option<Duration>,
    redeem_calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_code(self, code: &str, access_token: &str, profile: ProviderProfile) -> Self {
        if let Ok(mut codes) = self.codes.lock() {
            codes.insert(code.to_string(), (access_token.to_string(), profile));
        }
        self
    }

    /// Delay every code redemption
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn redeem_calls(&self) -> usize {
        self.redeem_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderClient for FakeProvider {
    async fn redeem_code(&self, code: &str) -> Result<ProviderToken, ProviderError> {
        self.redeem_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let grant = self.codes.lock().unwrap().remove(code);
        let (access_token, profile) = grant.ok_or_else(|| {
            ProviderError::Rejected("invalid_grant: authorization code not found".to_string())
        })?;

        self.profiles
            .lock()
            .unwrap()
            .insert(access_token.clone(), profile);
        Ok(ProviderToken::new(access_token, Some(Duration::from_secs(21599))))
    }

    async fn fetch_profile(&self, token: &ProviderToken) -> Result<ProviderProfile, ProviderError> {
        self.profiles
            .lock()
            .unwrap()
            .get(token.secret())
            .cloned()
            .ok_or_else(|| ProviderError::Rejected("-401: invalid access token".to_string()))
    }
}

/// Test server builder with in-memory backends and a scripted provider
pub struct TestServerBuilder {
    config: Config,
    provider: FakeProvider,
}

impl TestServerBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            provider: FakeProvider::new(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_provider(mut self, provider: FakeProvider) -> Self {
        self.provider = provider;
        self
    }

    pub async fn build(self) -> Server {
        let mut config = self.config;

        config.database.url = "sqlite::memory:".to_string();
        config.cache.backend = "memory".to_string();
        config.cache.cleanup_interval = 0;
        config.jwt.secret = "test-secret".to_string();
        config.jwt.algorithm = "HS256".to_string();
        config.metrics.enabled = false;

        let server = Server::with_provider(config, Arc::new(self.provider))
            .await
            .unwrap();
        server.database.migrate().await.unwrap();
        server
    }
}

impl Default for TestServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
