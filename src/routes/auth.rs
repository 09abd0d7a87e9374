use crate::{api_response::ApiResponse, auth::extract_bearer, error::AppError, server::Server};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
    routing::{get, post},
};
use serde::Deserialize;
use tracing::{Instrument, error};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub access_code: String,
}

pub fn create_auth_routes() -> Router<Server> {
    Router::new()
        .route("/reqlogin", post(login_handler))
        .route("/logouts", get(logout_handler))
}

/// Redeem a Kakao authorization code for a session token.
///
/// The pipeline runs as a tracked task so a dropped connection cannot
/// abandon it between the member insert and the cache write.
pub async fn login_handler(
    State(server): State<Server>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<String>>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let login_service = server.login_service.clone();
    let cancel = server.shutdown.child_token();
    let outcome = server
        .shutdown
        .spawn(
            async move { login_service.login(&request.access_code, cancel).await }
                .in_current_span(),
        )
        .await
        .map_err(|e| {
            error!(error = %e, "Login task aborted");
            AppError::Internal("login task aborted".to_string())
        })??;

    Ok(Json(ApiResponse::success(
        outcome.session_token,
        "login succeeded",
    )))
}

pub async fn logout_handler(
    State(server): State<Server>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<String>>, AppError> {
    let token = extract_bearer(&headers).ok_or_else(|| {
        AppError::BadRequest("Missing or malformed Authorization header".to_string())
    })?;

    server.login_service.logout(token).await?;

    Ok(Json(ApiResponse::success(
        "null".to_string(),
        "logout succeeded",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::credential_key;
    use crate::test_utils::{FakeProvider, TestServerBuilder, profile};
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    async fn server_with_codes() -> Server {
        let provider = FakeProvider::new()
            .with_code("abc123", "tok-1", profile("a@x.com", Some("Alice")))
            .with_code("def456", "tok-2", profile("a@x.com", Some("Alice")));
        TestServerBuilder::new().with_provider(provider).build().await
    }

    fn login_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/reqlogin")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn logout_request(auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/logouts");
        if let Some(auth) = auth {
            builder = builder.header("Authorization", auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_login_returns_session_token() {
        let server = server_with_codes().await;
        let app = create_auth_routes().with_state(server.clone());

        let response = app
            .oneshot(login_request(r#"{"access_code":"abc123"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "success");
        let token = body["data"].as_str().unwrap();
        let claims = server.jwt_service.validate(token).unwrap();

        let cached = server.credential_cache.get(claims.sub).await.unwrap();
        assert_eq!(cached.as_deref(), Some("tok-1"));
        assert_eq!(credential_key(claims.sub), format!("member_kakao_token_{}", claims.sub));
    }

    #[tokio::test]
    async fn test_login_without_code_is_bad_request() {
        let server = server_with_codes().await;
        let app = create_auth_routes().with_state(server);

        let response = app.clone().oneshot(login_request("{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["status"], "fail");

        let response = app.oneshot(login_request("not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_code_is_rejected() {
        let server = server_with_codes().await;
        let app = create_auth_routes().with_state(server);

        let response = app
            .oneshot(login_request(r#"{"access_code":"nope"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn test_logout_clears_cached_credential() {
        let server = server_with_codes().await;
        let app = create_auth_routes().with_state(server.clone());

        let response = app
            .clone()
            .oneshot(login_request(r#"{"access_code":"abc123"}"#))
            .await
            .unwrap();
        let token = json_body(response).await["data"]
            .as_str()
            .unwrap()
            .to_string();
        let account_id = server.jwt_service.validate(&token).unwrap().sub;

        let response = app
            .clone()
            .oneshot(logout_request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"], "null");
        assert_eq!(server.credential_cache.get(account_id).await.unwrap(), None);

        // Nothing cached any more; still succeeds
        let response = app
            .oneshot(logout_request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_logout_requires_bearer_header() {
        let server = server_with_codes().await;
        let app = create_auth_routes().with_state(server);

        let response = app.clone().oneshot(logout_request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(logout_request(Some("Token abc")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(logout_request(Some("Bearer not-a-jwt")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
