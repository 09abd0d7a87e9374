use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use kakao_login_gateway::{Config, Server};
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, header, method, path},
};

pub const TOKEN_PATH: &str = "/oauth/token";
pub const USER_INFO_PATH: &str = "/v2/user/me";

/// Server wired to a wiremock stand-in for Kakao
pub struct TestHarness {
    pub kakao: MockServer,
    pub server: Server,
    pub app: Router,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Build with a hook to adjust the config after the test defaults
    pub async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let kakao = MockServer::start().await;

        let mut config = Config::default();
        config.jwt.secret = "integration-secret".to_string();
        config.database.url = "sqlite::memory:".to_string();
        config.cache.backend = "memory".to_string();
        config.cache.cleanup_interval = 0;
        config.metrics.enabled = false;
        config.kakao.client_id = "rest-key".to_string();
        config.kakao.token_url = format!("{}{}", kakao.uri(), TOKEN_PATH);
        config.kakao.user_info_url = format!("{}{}", kakao.uri(), USER_INFO_PATH);
        config.kakao.request_timeout_secs = 2;
        adjust(&mut config);

        let server = Server::new(config).await.unwrap();
        server.database.migrate().await.unwrap();
        let app = server.create_app();

        Self { kakao, server, app }
    }

    /// Kakao accepts `code` exactly once and answers with `access_token`
    pub async fn grant_code(&self, code: &str, access_token: &str) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains(format!("code={code}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": access_token,
                "token_type": "bearer",
                "refresh_token": format!("refresh-{access_token}"),
                "expires_in": 21599,
            })))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&self.kakao)
            .await;
    }

    /// Any code not granted above is refused the way Kakao refuses a used code
    pub async fn reject_other_codes(&self) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "authorization code not found",
                "error_code": "KOE320",
            })))
            .with_priority(10)
            .mount(&self.kakao)
            .await;
    }

    pub async fn profile_for(&self, access_token: &str, email: &str, nickname: Option<&str>) {
        let mut properties = json!({});
        if let Some(nickname) = nickname {
            properties["nickname"] = json!(nickname);
        }

        Mock::given(method("GET"))
            .and(path(USER_INFO_PATH))
            .and(header("authorization", format!("Bearer {access_token}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1234,
                "kakao_account": { "email": email },
                "properties": properties,
            })))
            .mount(&self.kakao)
            .await;
    }

    pub async fn slow_token_endpoint(&self, delay: Duration) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "late", "token_type": "bearer"}))
                    .set_delay(delay),
            )
            .mount(&self.kakao)
            .await;
    }

    pub async fn request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn login(&self, code: &str) -> (StatusCode, Value) {
        self.request(login_request(code)).await
    }

    pub async fn logout(&self, authorization: Option<&str>) -> (StatusCode, Value) {
        self.request(logout_request(authorization)).await
    }
}

pub fn login_request(code: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/reqlogin")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "access_code": code }).to_string()))
        .unwrap()
}

pub fn logout_request(authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/logouts");
    if let Some(value) = authorization {
        builder = builder.header("Authorization", value);
    }
    builder.body(Body::empty()).unwrap()
}

/// Claims of a session token, read without verifying the signature
pub fn session_claims(token: &str) -> Value {
    let payload = token.split('.').nth(1).unwrap();
    let bytes = URL_SAFE_NO_PAD.decode(payload).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
