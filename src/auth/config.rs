use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    #[serde(default = "default_jwt_secret")]
    pub secret: String,
    #[serde(default = "default_jwt_algorithm")]
    pub algorithm: String,
    /// Session token lifetime in seconds
    #[serde(default = "default_session_ttl")]
    pub session_ttl: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: default_jwt_secret(),
            algorithm: default_jwt_algorithm(),
            session_ttl: default_session_ttl(),
        }
    }
}

fn default_jwt_secret() -> String {
    "change-me-session-secret".to_string()
}

fn default_jwt_algorithm() -> String {
    "HS256".to_string()
}

fn default_session_ttl() -> u64 {
    86400 // 24 hours
}
