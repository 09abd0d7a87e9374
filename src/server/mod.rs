pub mod config;
pub mod middleware;

use crate::{
    auth::{
        IdentityResolver, LoginService, LoginSettings,
        jwt::{JwtService, JwtServiceImpl},
        session_auth_middleware,
    },
    cache::{CredentialCache, CredentialCacheHealthChecker, build_credential_cache},
    config::Config,
    database::{DatabaseManager, DatabaseManagerImpl},
    error::AppError,
    health::HealthService,
    metrics,
    provider::{KakaoClient, ProviderClient},
    routes::{create_auth_routes, create_health_routes, create_member_routes},
    server::middleware::request_response_logger,
    shutdown::ShutdownCoordinator,
    utils::request_id_middleware,
};
use axum::{Router, middleware::from_fn, middleware::from_fn_with_state};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::{error, info};

#[derive(Clone)]
pub struct Server {
    pub config: Arc<Config>,
    pub jwt_service: Arc<dyn JwtService>,
    pub login_service: Arc<LoginService>,
    pub database: Arc<dyn DatabaseManager>,
    pub credential_cache: Arc<dyn CredentialCache>,
    pub health_service: Arc<HealthService>,
    pub shutdown: Arc<ShutdownCoordinator>,
}

impl Server {
    /// Build the server against the real Kakao endpoints in `config.kakao`
    pub async fn new(config: Config) -> Result<Self, AppError> {
        let provider = KakaoClient::new(&config.kakao)
            .map_err(|e| AppError::Internal(format!("Failed to build Kakao client: {}", e)))?;
        Self::with_provider(config, Arc::new(provider)).await
    }

    pub async fn with_provider(
        config: Config,
        provider: Arc<dyn ProviderClient>,
    ) -> Result<Self, AppError> {
        if config.metrics.enabled {
            metrics::init_metrics_with_port(config.metrics.port).map_err(|e| {
                error!(
                    "Failed to start metrics server on port {}: {}",
                    config.metrics.port, e
                );
                AppError::Internal(format!("Failed to start metrics server: {}", e))
            })?;
        }

        let jwt_service_impl = JwtServiceImpl::from_config(&config.jwt)?;
        let jwt_service: Arc<dyn JwtService> = Arc::new(jwt_service_impl.clone());

        let credential_cache = build_credential_cache(&config.cache)?;
        info!(backend = credential_cache.backend(), "Credential cache ready");

        let database_impl = Arc::new(DatabaseManagerImpl::new_from_config(&config).await?);
        let database: Arc<dyn DatabaseManager> = database_impl.clone();

        let login_service = Arc::new(LoginService::new(
            provider,
            IdentityResolver::new(database.clone()),
            jwt_service.clone(),
            credential_cache.clone(),
            LoginSettings::from_config(&config),
        ));

        let health_service = Arc::new(HealthService::new());
        health_service.register(database_impl).await;
        health_service
            .register(CredentialCacheHealthChecker::new(credential_cache.clone()))
            .await;
        health_service
            .register(jwt_service_impl.health_checker())
            .await;

        Ok(Self {
            config: Arc::new(config),
            jwt_service,
            login_service,
            database,
            credential_cache,
            health_service,
            shutdown: Arc::new(ShutdownCoordinator::new()),
        })
    }

    pub async fn run(&self) -> Result<(), AppError> {
        if self.config.database.migration_on_startup {
            info!("Running database migrations");
            self.database.migrate().await?;
        }

        let app = self.create_app();

        let addr: SocketAddr = format!("{}:{}", self.config.server.host, self.config.server.port)
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid listen address: {}", e)))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to bind to address: {}", e)))?;

        info!("Server listening on http://{}", addr);

        let signal_coordinator = self.shutdown.clone();
        tokio::spawn(async move {
            signal_coordinator.wait_for_shutdown_signal().await;
        });

        let shutdown_token = self.shutdown.token();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_token.cancelled().await;
                info!("Graceful shutdown initiated");
            })
            .await;

        if let Err(e) = &result {
            error!("Server error: {}", e);
        }

        self.shutdown
            .drain(Duration::from_secs(self.config.server.shutdown_timeout_secs))
            .await;
        info!("Server shutdown complete");

        result.map_err(|e| AppError::Internal(format!("Server error: {}", e)))
    }

    pub fn create_app(&self) -> Router {
        let mut app = Router::new()
            .merge(create_auth_routes())
            .nest("/members", self.member_routes())
            .nest("/health", create_health_routes())
            .with_state(self.clone());

        if self.config.metrics.enabled {
            app = app.layer(from_fn(metrics::metrics_middleware));
        }
        if self.config.logging.log_request {
            app = app.layer(from_fn(request_response_logger));
        }
        // Outermost, so every inner layer runs inside the request span
        app.layer(from_fn(request_id_middleware))
    }

    fn member_routes(&self) -> Router<Server> {
        create_member_routes().layer(from_fn_with_state(self.clone(), session_auth_middleware))
    }
}
