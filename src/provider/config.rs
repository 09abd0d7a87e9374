use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Kakao application settings, loaded once at startup and handed to
/// [`KakaoClient`](super::KakaoClient).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KakaoConfig {
    /// REST API key of the Kakao application
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_user_info_url")]
    pub user_info_url: String,
    /// Upper bound for each outbound provider call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_redirect_uri() -> String {
    "http://localhost:3000/oauth/kakao".to_string()
}

fn default_token_url() -> String {
    "https://kauth.kakao.com/oauth/token".to_string()
}

fn default_user_info_url() -> String {
    "https://kapi.kakao.com/v2/user/me".to_string()
}

fn default_request_timeout_secs() -> u64 {
    5
}

impl Default for KakaoConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            redirect_uri: default_redirect_uri(),
            token_url: default_token_url(),
            user_info_url: default_user_info_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl KakaoConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
