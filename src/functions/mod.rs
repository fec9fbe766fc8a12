/// Media edge functions
///
/// The three server endpoints fronting the platform database and object
/// storage: `get-upload-url`, `remove-tmp` and `reorder`. All require a
/// bearer access token; ownership and quota are enforced here, not in the
/// client.
pub mod auth;
pub mod db;
pub mod maintenance;
pub mod rate_limit;
pub mod remove_tmp;
pub mod reorder;
pub mod upload_url;

use crate::baas::StorageAdmin;
use crate::config::FunctionsConfig;
use crate::error::{PartnerError, PartnerResult};
use crate::metrics;
use axum::{
    http::{header, Method, StatusCode},
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Shared state for the functions server
#[derive(Clone)]
pub struct FunctionsContext {
    pub config: Arc<FunctionsConfig>,
    pub db: PgPool,
    pub storage: Arc<StorageAdmin>,
    pub limiter: Arc<rate_limit::FunctionRateLimiter>,
}

impl FunctionsContext {
    /// Build the context from configuration
    pub async fn new(config: FunctionsConfig) -> PartnerResult<Self> {
        config.validate()?;

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .map_err(PartnerError::Database)?;

        // Connectivity check before serving
        sqlx::query("SELECT 1")
            .execute(&db)
            .await
            .map_err(PartnerError::Database)?;

        let storage = Arc::new(StorageAdmin::new(&config.platform_url, &config.service_key)?);
        let limiter = Arc::new(rate_limit::FunctionRateLimiter::new(&config.rate_limit));

        Ok(Self {
            config: Arc::new(config),
            db,
            storage,
            limiter,
        })
    }
}

/// Build the function routes
pub fn routes() -> Router<FunctionsContext> {
    Router::new()
        .route("/functions/v1/get-upload-url", post(upload_url::get_upload_url))
        .route("/functions/v1/remove-tmp", post(remove_tmp::remove_tmp))
        .route("/functions/v1/reorder", post(reorder::reorder))
}

/// Build the main application router
pub fn build_router(ctx: FunctionsContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_endpoint))
        .merge(routes())
        .with_state(ctx.clone())
        .layer(middleware::from_fn_with_state(
            ctx,
            rate_limit::rate_limit_middleware,
        ))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .fallback(not_found)
}

/// Health check handler
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Prometheus metrics handler
async fn metrics_endpoint() -> String {
    metrics::render()
}

/// 404 handler
async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Endpoint not found" })),
    )
}

/// Start the functions server
pub async fn serve(ctx: FunctionsContext) -> PartnerResult<()> {
    let addr = format!("{}:{}", ctx.config.hostname, ctx.config.port);

    info!("Lumera media functions listening on {}", addr);

    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| PartnerError::Server(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| PartnerError::Server(format!("Server error: {}", e)))?;

    Ok(())
}
