//! Login orchestration
//!
//! One attempt walks `ReceivedCode -> HaveProviderToken -> HaveProfile ->
//! HaveIdentity -> HaveSession -> Success`. Any provider failure ends the
//! attempt; a credential cache failure is logged and the login still
//! succeeds.

use crate::auth::identity::IdentityResolver;
use crate::auth::jwt::JwtService;
use crate::cache::CredentialCache;
use crate::config::Config;
use crate::database::entities::AccountId;
use crate::error::AppError;
use crate::metrics;
use crate::provider::{ProviderClient, ProviderError};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    ReceivedCode,
    HaveProviderToken,
    HaveProfile,
    HaveIdentity,
    HaveSession,
    Success,
}

impl fmt::Display for LoginStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoginStage::ReceivedCode => "received_code",
            LoginStage::HaveProviderToken => "have_provider_token",
            LoginStage::HaveProfile => "have_profile",
            LoginStage::HaveIdentity => "have_identity",
            LoginStage::HaveSession => "have_session",
            LoginStage::Success => "success",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct LoginSettings {
    /// Upper bound for each provider call
    pub call_timeout: Duration,
    pub credential_ttl: Duration,
    /// Pass provider error text through to the client
    pub expose_provider_errors: bool,
}

impl LoginSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            call_timeout: config.kakao.request_timeout(),
            credential_ttl: config.cache.credential_ttl(),
            expose_provider_errors: config.server.expose_error_details,
        }
    }
}

impl Default for LoginSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub session_token: String,
    pub account_id: AccountId,
    /// The member was created by this login
    pub created: bool,
}

pub struct LoginService {
    provider: Arc<dyn ProviderClient>,
    identity: IdentityResolver,
    sessions: Arc<dyn JwtService>,
    credentials: Arc<dyn CredentialCache>,
    settings: LoginSettings,
}

impl LoginService {
    pub fn new(
        provider: Arc<dyn ProviderClient>,
        identity: IdentityResolver,
        sessions: Arc<dyn JwtService>,
        credentials: Arc<dyn CredentialCache>,
        settings: LoginSettings,
    ) -> Self {
        Self {
            provider,
            identity,
            sessions,
            credentials,
            settings,
        }
    }

    pub async fn login(
        &self,
        access_code: &str,
        cancel: CancellationToken,
    ) -> Result<LoginOutcome, AppError> {
        let result = self.run_login(access_code, &cancel).await;
        metrics::record_login(outcome_label(&result));
        result
    }

    async fn run_login(
        &self,
        access_code: &str,
        cancel: &CancellationToken,
    ) -> Result<LoginOutcome, AppError> {
        let access_code = access_code.trim();
        if access_code.is_empty() {
            return Err(AppError::BadRequest("access_code is required".to_string()));
        }

        let mut stage = LoginStage::ReceivedCode;

        let provider_token = self
            .call_provider(stage, cancel, self.provider.redeem_code(access_code))
            .await?;
        stage = LoginStage::HaveProviderToken;
        debug!(%stage, "Authorization code redeemed");

        let profile = self
            .call_provider(stage, cancel, self.provider.fetch_profile(&provider_token))
            .await?;
        stage = LoginStage::HaveProfile;

        let email = profile
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .ok_or_else(|| {
                warn!(%stage, "Kakao profile has no email");
                AppError::MalformedProfile("email missing from Kakao profile".to_string())
            })?;
        let display_name = profile
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| email_local_part(email));

        let resolved = self
            .identity
            .resolve(email, display_name, profile.avatar_url.as_deref())
            .await?;
        let account_id = resolved.identity.account_id;
        stage = LoginStage::HaveIdentity;
        debug!(%stage, account_id, created = resolved.created, "Identity resolved");

        let session_token = self
            .sessions
            .issue(account_id, &resolved.identity.display_name)?;
        stage = LoginStage::HaveSession;

        match self
            .credentials
            .put(
                account_id,
                provider_token.secret(),
                self.settings.credential_ttl,
            )
            .await
        {
            Ok(outcome) => debug!(%stage, account_id, ?outcome, "Provider credential cached"),
            Err(err) => {
                metrics::record_cache_degraded("put");
                warn!(%stage, account_id, error = %err, "Credential cache degraded, login continues");
            }
        }

        stage = LoginStage::Success;
        info!(%stage, account_id, created = resolved.created, "Login succeeded");

        Ok(LoginOutcome {
            session_token,
            account_id,
            created: resolved.created,
        })
    }

    /// Decode the session (expiry ignored) and drop the member's cached
    /// credential. Succeeds whether or not an entry existed.
    pub async fn logout(&self, session_token: &str) -> Result<AccountId, AppError> {
        let claims = self.sessions.decode_for_logout(session_token)?;
        let account_id = claims.sub;

        if let Err(err) = self.credentials.delete(account_id).await {
            metrics::record_cache_degraded("delete");
            warn!(account_id, error = %err, "Credential cache degraded, logout continues");
        }

        info!(account_id, "Logged out");
        Ok(account_id)
    }

    /// Await one provider call under the configured timeout, giving up early
    /// when `cancel` fires.
    async fn call_provider<T, F>(
        &self,
        stage: LoginStage,
        cancel: &CancellationToken,
        call: F,
    ) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        let timeout = self.settings.call_timeout;

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                Err(ProviderError::Unavailable("login cancelled".to_string()))
            }
            result = tokio::time::timeout(timeout, call) => match result {
                Ok(inner) => inner,
                Err(_) => Err(ProviderError::Unavailable(format!(
                    "no response within {}ms",
                    timeout.as_millis()
                ))),
            },
        };

        result.map_err(|err| {
            warn!(%stage, error = %err, "Kakao call failed");
            self.provider_failure(err)
        })
    }

    fn provider_failure(&self, err: ProviderError) -> AppError {
        let expose = self.settings.expose_provider_errors;
        match err {
            ProviderError::Unavailable(detail) if expose => AppError::ProviderUnavailable(detail),
            ProviderError::Unavailable(_) => {
                AppError::ProviderUnavailable("Kakao did not respond".to_string())
            }
            ProviderError::Rejected(detail) if expose => AppError::ProviderRejected(detail),
            ProviderError::Rejected(_) => {
                AppError::ProviderRejected("authorization code was not accepted".to_string())
            }
            ProviderError::MalformedProfile(detail) if expose => AppError::MalformedProfile(detail),
            ProviderError::MalformedProfile(_) => {
                AppError::MalformedProfile("profile could not be read".to_string())
            }
        }
    }
}

fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

fn outcome_label(result: &Result<LoginOutcome, AppError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(AppError::BadRequest(_)) => "bad_request",
        Err(AppError::ProviderUnavailable(_)) => "provider_unavailable",
        Err(AppError::ProviderRejected(_)) => "provider_rejected",
        Err(AppError::MalformedProfile(_)) => "malformed_profile",
        Err(_) => "error",
    }
}
