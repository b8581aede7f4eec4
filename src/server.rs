//! # Server Module
//!
//! HTTP server setup and route configuration for the accounts server.

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{Method, header},
    routing::get,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{AuthGate, JwtService};
use crate::config::Config;
use crate::database::{
    DatabaseConfig, DatabaseConnection, MemoryUserDirectory, PgUserDirectory, UserDirectory,
};
use crate::routes::health::health;
use crate::services::AccountService;

/// Application state shared across all route handlers
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub gate: AuthGate,
}

impl AppState {
    pub fn new(directory: Arc<dyn UserDirectory>, jwt_service: Arc<JwtService>) -> Self {
        Self {
            accounts: AccountService::new(directory.clone(), jwt_service.clone()),
            gate: AuthGate::new(jwt_service, directory),
        }
    }
}

/// Connect the configured directory backend, running migrations for PostgreSQL
pub async fn build_directory(config: &Config) -> Result<Arc<dyn UserDirectory>> {
    match DatabaseConfig::from_settings(&config.database)? {
        Some(db_config) => {
            let db = DatabaseConnection::new(db_config).await?;
            db.migrate().await?;
            Ok(Arc::new(PgUserDirectory::new(db.pool().clone())))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory user directory");
            Ok(Arc::new(MemoryUserDirectory::new()))
        }
    }
}

/// Build the full application router
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(crate::routes::auth::create_auth_routes())
        .merge(crate::routes::users::create_user_routes(state.gate.clone()))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods([
                        Method::GET,
                        Method::POST,
                        Method::PUT,
                        Method::DELETE,
                        Method::OPTIONS,
                    ])
                    .allow_headers([
                        header::ORIGIN,
                        header::CONTENT_TYPE,
                        header::ACCEPT,
                        header::AUTHORIZATION,
                    ]),
            ),
        )
        .with_state(state)
}

/// Starts the HTTP server and serves until Ctrl+C.
pub async fn start(config: Config) -> Result<()> {
    if config.auth.uses_insecure_secret() {
        tracing::warn!("⚠️  JWT_SECRET is not set; using the insecure development default");
    }

    let jwt_service = Arc::new(JwtService::new(&config.auth));
    let directory = build_directory(&config).await?;
    let app = build_app(AppState::new(directory, jwt_service));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {} - port may already be in use", addr))?;

    tracing::info!("🚀 Accounts server starting...");
    tracing::info!("📡 Listening on http://{}", addr);
    tracing::info!("🏥 Health check available at http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
