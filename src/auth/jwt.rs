use crate::auth::config::JwtConfig;
use crate::database::entities::AccountId;
use crate::error::AppError;
use crate::health::{HealthCheckResult, HealthChecker};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Session tokens are signed and verified with one shared secret, so only
/// the HMAC family is accepted.
pub fn parse_algorithm(alg: &str) -> Result<Algorithm, AppError> {
    match Algorithm::from_str(alg) {
        Ok(algorithm @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)) => Ok(algorithm),
        Ok(_) => Err(AppError::BadRequest(format!(
            "JWT algorithm {} needs a key pair; use HS256, HS384 or HS512",
            alg
        ))),
        Err(_) => Err(AppError::BadRequest(format!(
            "Unsupported JWT algorithm: {}",
            alg
        ))),
    }
}

fn check_secret(secret: &str) -> Result<(), AppError> {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("JWT secret must not be empty".to_string()));
    }
    // A JWK would be signed as raw JSON bytes but verified with its `k` value
    if trimmed.starts_with('{') {
        return Err(AppError::BadRequest(
            "JWT secret must be a plain shared secret, not a JWK".to_string(),
        ));
    }
    Ok(())
}

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: AccountId,
    /// Display name at the time of issue
    pub name: String,
    pub iat: usize,
    pub exp: usize,
}

impl SessionClaims {
    pub fn new_at(
        account_id: AccountId,
        display_name: impl Into<String>,
        ttl_seconds: u64,
        now: DateTime<Utc>,
    ) -> Self {
        let iat = now.timestamp().max(0) as usize;
        Self {
            sub: account_id,
            name: display_name.into(),
            iat,
            exp: iat + ttl_seconds as usize,
        }
    }

    pub fn is_expired(&self) -> bool {
        let now = Utc::now().timestamp() as usize;
        self.exp <= now
    }

}

/// Session issuer trait for dependency injection and testing
pub trait JwtService: Send + Sync {
    /// Mint a session token for a member
    fn issue(&self, account_id: AccountId, display_name: &str) -> Result<String, AppError>;

    /// Signature and expiry checked; for authenticated routes
    fn validate(&self, token: &str) -> Result<SessionClaims, AppError>;

    /// Signature checked, expiry ignored; logout must still find the member
    /// after the session lapsed
    fn decode_for_logout(&self, token: &str) -> Result<SessionClaims, AppError>;
}

#[derive(Clone)]
pub struct JwtServiceImpl {
    algorithm: Algorithm,
    session_ttl: u64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtServiceImpl {
    pub fn new(secret: &str, algorithm: Algorithm, session_ttl: u64) -> Result<Self, AppError> {
        check_secret(secret)?;
        Ok(Self {
            algorithm,
            session_ttl,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    pub fn from_config(config: &JwtConfig) -> Result<Self, AppError> {
        let algorithm = parse_algorithm(&config.algorithm)?;
        Self::new(&config.secret, algorithm, config.session_ttl)
    }

    /// Same as [`JwtService::issue`] with an explicit clock. Identical
    /// inputs and `now` produce an identical token.
    pub fn issue_at(
        &self,
        account_id: AccountId,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let claims = SessionClaims::new_at(account_id, display_name, self.session_ttl, now);
        self.encode(&claims)
    }

    pub fn encode(&self, claims: &SessionClaims) -> Result<String, AppError> {
        encode(&Header::new(self.algorithm), claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    fn decode_with(&self, token: &str, validate_exp: bool) -> Result<SessionClaims, AppError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = validate_exp;
        validation.leeway = 0;
        if !validate_exp {
            validation.required_spec_claims.clear();
        }

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(AppError::Jwt)
    }

    pub fn health_checker(&self) -> Arc<JwtHealthChecker> {
        Arc::new(JwtHealthChecker {
            service: self.clone(),
        })
    }
}

impl JwtService for JwtServiceImpl {
    fn issue(&self, account_id: AccountId, display_name: &str) -> Result<String, AppError> {
        self.issue_at(account_id, display_name, Utc::now())
    }

    fn validate(&self, token: &str) -> Result<SessionClaims, AppError> {
        self.decode_with(token, true)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))
    }

    fn decode_for_logout(&self, token: &str) -> Result<SessionClaims, AppError> {
        self.decode_with(token, false)
            .map_err(|_| AppError::BadRequest("Invalid session token".to_string()))
    }
}

/// Health checker implementation for the session issuer
pub struct JwtHealthChecker {
    service: JwtServiceImpl,
}

#[async_trait]
impl HealthChecker for JwtHealthChecker {
    fn name(&self) -> &str {
        "jwt"
    }

    async fn check(&self) -> HealthCheckResult {
        let algorithm = format!("{:?}", self.service.algorithm);

        let round_trip = self
            .service
            .issue(0, "health-check")
            .and_then(|token| self.service.validate(&token));

        match round_trip {
            Ok(claims) if claims.sub == 0 => HealthCheckResult::healthy_with_details(
                serde_json::json!({ "algorithm": algorithm }),
            ),
            Ok(_) => HealthCheckResult::unhealthy_with_details(
                "Token validation returned incorrect claims".to_string(),
                serde_json::json!({ "algorithm": algorithm }),
            ),
            Err(err) => HealthCheckResult::unhealthy_with_details(
                "Session token round trip failed".to_string(),
                serde_json::json!({
                    "algorithm": algorithm,
                    "error": err.to_string()
                }),
            ),
        }
    }
}
