//! Kakao OAuth2 provider client
//!
//! Two stateless calls: redeem an authorization code for an access token,
//! then read the member profile with that token. Neither call retries.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub mod config;
pub mod kakao;

pub use config::KakaoConfig;
pub use kakao::KakaoClient;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Transport failure or 5xx; the provider could not be asked
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    /// The provider answered and refused, e.g. a reused or expired code
    #[error("provider rejected the request: {0}")]
    Rejected(String),
    /// The profile response could not be decoded
    #[error("malformed provider profile: {0}")]
    MalformedProfile(String),
}

/// Kakao access token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderToken {
    access_token: String,
    expires_in: Option<Duration>,
}

impl ProviderToken {
    pub fn new(access_token: impl Into<String>, expires_in: Option<Duration>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_in,
        }
    }

    pub fn secret(&self) -> &str {
        &self.access_token
    }

    /// Lifetime reported by Kakao. Informational; the cache uses its own TTL.
    pub fn expires_in(&self) -> Option<Duration> {
        self.expires_in
    }
}

impl fmt::Debug for ProviderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderToken")
            .field("access_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Profile fields read from the provider. Presence of `email` is checked
/// by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider_user_id: Option<i64>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Exchange a single-use authorization code for an access token.
    async fn redeem_code(&self, code: &str) -> Result<ProviderToken, ProviderError>;

    /// Fetch the profile of the member the token belongs to.
    async fn fetch_profile(&self, token: &ProviderToken) -> Result<ProviderProfile, ProviderError>;
}
