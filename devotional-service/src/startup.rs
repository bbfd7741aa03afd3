//! Application startup and lifecycle management.

use crate::config::{BatchConfig, DevotionalConfig};
use crate::handlers::{health, jobs};
use crate::jobs::{PassageJob, PrivateDevotionalJob, PublicDevotionalJob};
use crate::services::metrics::init_metrics;
use crate::services::providers::gemini::{GeminiConfig, GeminiTextProvider};
use crate::services::providers::TextProvider;
use crate::services::store::{DevotionalStore, PgStore};
use axum::{
    handler::Handler,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    request_id_middleware, require_shared_secret, SharedSecret, CRON_SECRET_HEADER,
};
use service_core::retry::RetryConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DevotionalStore>,
    pub secret: SharedSecret,
    pub passage_job: PassageJob,
    pub public_devotional_job: PublicDevotionalJob,
    pub private_devotional_job: PrivateDevotionalJob,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DevotionalStore>,
        provider: Arc<dyn TextProvider>,
        secret: SharedSecret,
        retry: RetryConfig,
        batch: BatchConfig,
    ) -> Self {
        Self {
            passage_job: PassageJob::new(
                store.clone(),
                provider.clone(),
                retry,
                batch.recent_reference_limit,
            ),
            public_devotional_job: PublicDevotionalJob::new(
                store.clone(),
                provider.clone(),
                batch.recent_reference_limit,
            ),
            private_devotional_job: PrivateDevotionalJob::new(store.clone(), provider, batch),
            store,
            secret,
        }
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            HeaderName::from_static(CRON_SECRET_HEADER),
        ])
}

/// Build the HTTP router.
///
/// The secret guard wraps only the POST handlers, so preflight and
/// wrong-method requests are answered without it.
pub fn router(state: AppState) -> Router {
    let guard = middleware::from_fn_with_state(state.secret.clone(), require_shared_secret);

    Router::new()
        .route(
            "/jobs/passage-generate",
            post(jobs::passage_generate.layer(guard.clone()))
                .options(jobs::options_ok)
                .fallback(jobs::method_not_allowed),
        )
        .route(
            "/jobs/public-devotional-generate",
            post(jobs::public_devotional_generate.layer(guard.clone()))
                .options(jobs::options_ok)
                .fallback(jobs::method_not_allowed),
        )
        .route(
            "/jobs/private-devotional-generate",
            post(jobs::private_devotional_generate.layer(guard))
                .options(jobs::options_ok)
                .fallback(jobs::method_not_allowed),
        )
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors_layer())
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: DevotionalConfig) -> Result<Self, AppError> {
        Self::build_internal(config, true).await
    }

    /// Build the application without running migrations.
    /// Use this in tests when migrations are already applied by the test harness.
    pub async fn build_without_migrations(config: DevotionalConfig) -> Result<Self, AppError> {
        Self::build_internal(config, false).await
    }

    async fn build_internal(
        config: DevotionalConfig,
        run_migrations: bool,
    ) -> Result<Self, AppError> {
        init_metrics();

        let store = PgStore::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        if run_migrations {
            store.run_migrations().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to run migrations");
                e
            })?;
        }

        let provider = GeminiTextProvider::new(GeminiConfig {
            api_url: config.gemini.api_url.clone(),
            api_key: config.gemini.api_key.clone(),
            timeout: config.gemini.timeout,
        })
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create Gemini provider");
            AppError::ConfigError(anyhow::anyhow!("Failed to create Gemini provider: {}", e))
        })?;

        let state = AppState::new(
            Arc::new(store),
            Arc::new(provider),
            SharedSecret::new(config.cron.secret.clone()),
            config.gemini.retry_config(),
            config.batch.clone(),
        );

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Devotional service listener bound");

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!(
            service = "devotional-service",
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, router(self.state)).await
    }
}
