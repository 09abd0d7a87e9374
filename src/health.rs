use async_trait::async_trait;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Degraded still serves logins, so only `Unhealthy` maps to 503.
    pub fn http_status(self) -> StatusCode {
        match self {
            HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub duration_ms: Option<u64>,
}

impl HealthCheckResult {
    fn with_status(
        status: HealthStatus,
        message: Option<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        Self {
            status,
            message,
            details,
            duration_ms: None,
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(HealthStatus::Healthy, None, None)
    }

    pub fn healthy_with_details(details: serde_json::Value) -> Self {
        Self::with_status(HealthStatus::Healthy, None, Some(details))
    }

    pub fn degraded_with_details(message: String, details: serde_json::Value) -> Self {
        Self::with_status(HealthStatus::Degraded, Some(message), Some(details))
    }

    pub fn unhealthy(message: String) -> Self {
        Self::with_status(HealthStatus::Unhealthy, Some(message), None)
    }

    pub fn unhealthy_with_details(message: String, details: serde_json::Value) -> Self {
        Self::with_status(HealthStatus::Unhealthy, Some(message), Some(details))
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

#[async_trait]
pub trait HealthChecker: Send + Sync {
    /// The name of this health check component
    fn name(&self) -> &str;

    async fn check(&self) -> HealthCheckResult;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    pub timestamp: String,
    pub checks: BTreeMap<String, HealthCheckResult>,
}

/// Registry of component checkers behind `GET /health`.
#[derive(Default)]
pub struct HealthService {
    checkers: RwLock<BTreeMap<String, Arc<dyn HealthChecker>>>,
}

impl HealthService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, checker: Arc<dyn HealthChecker>) {
        let name = checker.name().to_string();
        self.checkers.write().await.insert(name, checker);
    }

    pub async fn registered(&self) -> Vec<String> {
        self.checkers.read().await.keys().cloned().collect()
    }

    /// `None` reports liveness only, `Some("all")` runs every checker and
    /// any other value runs the checker with that name.
    pub async fn check_health(&self, filter: Option<&str>) -> HealthReport {
        let checkers = self.checkers.read().await;
        let mut checks = BTreeMap::new();

        let selected = checkers.iter().filter(|(name, _)| match filter {
            Some("all") => true,
            Some(wanted) => name.as_str() == wanted,
            None => false,
        });

        for (name, checker) in selected {
            let start = Instant::now();
            let result = checker.check().await;
            let elapsed = start.elapsed().as_millis() as u64;
            checks.insert(name.clone(), result.with_duration(elapsed));
        }

        // Worst component status wins
        let status = checks
            .values()
            .map(|result| result.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);

        HealthReport {
            status,
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            checks,
        }
    }
}
