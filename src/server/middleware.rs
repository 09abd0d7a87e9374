use axum::{body::Body, extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::info;

/// Logs one line per request and one per response. Runs inside the
/// request-id span, so both lines carry `request_id`.
pub async fn request_response_logger(req: Request<Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    // Health probes are too frequent to be worth a line each
    if path.starts_with("/health") {
        return next.run(req).await;
    }

    info!(method = %method, path = %path, "API request");

    let start = Instant::now();
    let response = next.run(req).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "API response"
    );

    response
}
