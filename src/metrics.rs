use axum::{body::Body, extract::MatchedPath, http::Request, middleware::Next, response::Response};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;
use tracing::info;

/// Install the Prometheus recorder and its scrape listener on `port`
pub fn init_metrics_with_port(
    port: u16,
) -> Result<PrometheusHandle, Box<dyn std::error::Error + Send + Sync>> {
    let builder = PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .add_global_label("service", env!("CARGO_PKG_NAME"));

    let handle = builder.install_recorder()?;

    info!("Metrics server started on :{}/metrics", port);
    Ok(handle)
}

/// Middleware to collect HTTP request metrics
pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    gauge!("http_requests_active").increment(1.0);

    let response = next.run(req).await;

    let status = response.status();
    let labels = [
        ("method", method),
        ("path", path),
        ("status", status.as_str().to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
    gauge!("http_requests_active").decrement(1.0);

    if status.is_server_error() {
        counter!("http_errors_total", &labels[..2]).increment(1);
    }

    response
}

/// Count a finished login attempt by outcome label
pub fn record_login(outcome: &'static str) {
    counter!("login_attempts_total", "outcome" => outcome).increment(1);
}

/// Count a credential cache call that failed but did not fail the request
pub fn record_cache_degraded(operation: &'static str) {
    counter!("credential_cache_degraded_total", "operation" => operation).increment(1);
}
