use crate::{health::HealthReport, server::Server};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct HealthCheckQuery {
    #[serde(default)]
    check: Option<String>,
}

/// `GET /health` answers liveness; `?check=all` or `?check=<component>`
/// runs the registered checkers.
pub fn create_health_routes() -> Router<Server> {
    Router::new().route("/", get(health_check))
}

async fn health_check(
    State(server): State<Server>,
    Query(params): Query<HealthCheckQuery>,
) -> (StatusCode, Json<HealthReport>) {
    let report = server
        .health_service
        .check_health(params.check.as_deref())
        .await;
    (report.status.http_status(), Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestServerBuilder;
    use axum::{
        body::{Body, to_bytes},
        http::Request,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let server = TestServerBuilder::new().build().await;
        let app = create_health_routes().with_state(server);

        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_liveness_runs_no_checks() {
        let (status, body) = get_json("/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert!(body["checks"].as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_all_checks_registered_components() {
        let (status, body) = get_json("/?check=all").await;
        assert_eq!(status, StatusCode::OK);

        let checks = body["checks"].as_object().unwrap();
        assert!(checks.contains_key("database"));
        assert!(checks.contains_key("credential_cache"));
        assert!(checks.contains_key("jwt"));
    }

    #[tokio::test]
    async fn test_single_component() {
        let (status, body) = get_json("/?check=jwt").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checks"].as_object().unwrap().len(), 1);
        assert_eq!(body["checks"]["jwt"]["status"], "healthy");
    }

    #[tokio::test]
    async fn test_unknown_component_is_empty() {
        let (status, body) = get_json("/?check=unknown").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["checks"].as_object().unwrap().is_empty());
    }
}
