//! # Accounts Server
//!
//! A small account-management HTTP API built with Axum and Tokio: password
//! login, bearer tokens, and CRUD on user records where only the owner of a
//! record may change or delete it.
//!
//! ## Architecture
//! - `config`: environment configuration, loaded once and passed explicitly
//! - `auth`: password hashing, JWT service, authentication gate, ownership policy
//! - `database`: user directory backends (PostgreSQL or in-memory) and migrations
//! - `services`: account operations and request validation
//! - `routes`: HTTP handlers
//! - `server`: router assembly and startup
//!
//! ## Running the Server
//! ```bash
//! JWT_SECRET=... DATABASE_URL=postgres://... cargo run
//! ```
//!
//! Without `DATABASE_URL` the server keeps users in memory.

mod auth;
mod config;
mod database;
mod errors;
mod routes;
mod server;
mod services;

use anyhow::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false) // Don't show module targets for cleaner output
                .compact(),
        )
        .init();

    tracing::info!("🏁 Starting accounts server...");
    tracing::info!("📦 Package: {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "🏗️  Build profile: {}",
        if cfg!(debug_assertions) { "debug" } else { "release" }
    );

    let config = config::Config::from_env()?;
    tracing::info!(
        "🔐 Tokens: {:?}, {} minute TTL",
        config.auth.jwt_algorithm,
        config.auth.access_token_expire_minutes
    );

    server::start(config).await
}
