use super::{KakaoConfig, ProviderClient, ProviderError, ProviderProfile, ProviderToken};
use async_trait::async_trait;
use oauth2::{
    AuthType, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
    RedirectUrl, RequestTokenError, TokenResponse, TokenUrl, basic::BasicClient,
};
use serde::Deserialize;
use tracing::debug;

// Only the token endpoint is used; authorization happens in the browser
type KakaoOAuthClient =
    BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

#[derive(Debug, Deserialize)]
struct KakaoUserInfo {
    id: Option<i64>,
    #[serde(default)]
    kakao_account: Option<KakaoAccount>,
    #[serde(default)]
    properties: Option<KakaoProperties>,
}

#[derive(Debug, Deserialize)]
struct KakaoAccount {
    email: Option<String>,
    #[serde(default)]
    profile: Option<KakaoAccountProfile>,
}

#[derive(Debug, Deserialize)]
struct KakaoAccountProfile {
    nickname: Option<String>,
    profile_image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KakaoProperties {
    nickname: Option<String>,
    profile_image: Option<String>,
}

impl From<KakaoUserInfo> for ProviderProfile {
    fn from(info: KakaoUserInfo) -> Self {
        let (email, account_profile) = match info.kakao_account {
            Some(account) => (account.email, account.profile),
            None => (None, None),
        };
        let (nickname, profile_image) = match info.properties {
            Some(properties) => (properties.nickname, properties.profile_image),
            None => (None, None),
        };

        // `properties` is the legacy location; newer apps only fill the account profile
        let (fallback_nickname, fallback_image) = match account_profile {
            Some(profile) => (profile.nickname, profile.profile_image_url),
            None => (None, None),
        };

        ProviderProfile {
            provider_user_id: info.id,
            email: email.filter(|e| !e.trim().is_empty()),
            display_name: nickname.or(fallback_nickname),
            avatar_url: profile_image.or(fallback_image),
        }
    }
}

/// Kakao implementation of [`ProviderClient`].
///
/// Form fields `grant_type`, `client_id`, `code` and `redirect_uri` (plus
/// `client_secret` when configured) are bound from [`KakaoConfig`].
pub struct KakaoClient {
    oauth_client: KakaoOAuthClient,
    http_client: reqwest::Client,
    user_info_url: String,
}

impl KakaoClient {
    pub fn new(config: &KakaoConfig) -> Result<Self, ProviderError> {
        let token_url = TokenUrl::new(config.token_url.clone())
            .map_err(|e| ProviderError::Unavailable(format!("invalid token URL: {e}")))?;
        let redirect_url = RedirectUrl::new(config.redirect_uri.clone())
            .map_err(|e| ProviderError::Unavailable(format!("invalid redirect URI: {e}")))?;

        let mut oauth_client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url)
            .set_auth_type(AuthType::RequestBody);
        if let Some(secret) = config.client_secret.as_ref().filter(|s| !s.is_empty()) {
            oauth_client = oauth_client.set_client_secret(ClientSecret::new(secret.clone()));
        }

        let http_client = reqwest::ClientBuilder::new()
            // Following redirects opens the client up to SSRF vulnerabilities.
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("reqwest build error: {e}")))?;

        Ok(Self {
            oauth_client,
            http_client,
            user_info_url: config.user_info_url.clone(),
        })
    }
}

#[async_trait]
impl ProviderClient for KakaoClient {
    async fn redeem_code(&self, code: &str) -> Result<ProviderToken, ProviderError> {
        let response = self
            .oauth_client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(|err| match err {
                RequestTokenError::ServerResponse(body) => {
                    let detail = match body.error_description() {
                        Some(description) => format!("{}: {}", body.error(), description),
                        None => body.error().to_string(),
                    };
                    ProviderError::Rejected(detail)
                }
                RequestTokenError::Request(e) => {
                    ProviderError::Unavailable(format!("token request failed: {e}"))
                }
                RequestTokenError::Parse(e, _) => {
                    ProviderError::Rejected(format!("unexpected token response: {e}"))
                }
                RequestTokenError::Other(msg) => ProviderError::Rejected(msg),
            })?;

        debug!(expires_in = ?response.expires_in(), "Redeemed Kakao authorization code");

        Ok(ProviderToken::new(
            response.access_token().secret().clone(),
            response.expires_in(),
        ))
    }

    async fn fetch_profile(&self, token: &ProviderToken) -> Result<ProviderProfile, ProviderError> {
        let response = self
            .http_client
            .get(&self.user_info_url)
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("user info request failed: {e}")))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(ProviderError::Unavailable(format!(
                "user info request failed with status: {status}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected(format!(
                "user info request failed with status {status}: {body}"
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("user info read failed: {e}")))?;
        let user_info: KakaoUserInfo = serde_json::from_slice(&body)
            .map_err(|e| ProviderError::MalformedProfile(format!("invalid user info body: {e}")))?;

        Ok(user_info.into())
    }
}
