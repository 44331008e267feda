//! # Garden Server
//!
//! A small HTTP service for user signup, authentication and basic admin user
//! management, built with Axum and Tokio on top of PostgreSQL.
//!
//! ## Features
//! - Argon2id password hashing
//! - Short-lived JWT bearer tokens with renewal inside a refresh window
//! - Admin-only routes gated on the token's admin claim
//! - Structured logging with tracing
//!
//! ## Architecture
//! - `config`: Environment variable configuration
//! - `auth`: Password hashing, token service and authentication middleware
//! - `database`: Credential store, PostgreSQL pool and migrations
//! - `services`: User signup/signin orchestration
//! - `routes`: HTTP route handlers
//! - `server`: Router assembly and the HTTP listener
//!
//! ## Environment Setup
//! Required: `POSTGRES_HOST`, `POSTGRES_DB`, `POSTGRES_USER`,
//! `POSTGRES_PASSWORD`, `HTTP_ADDR`, `JWT_SECRET`. A `.env` file in the
//! working directory is loaded if present.
//!
//! ## Running the Server
//! ```bash
//! RUST_LOG=info cargo run
//! ```

mod auth;
mod config;
mod database;
mod error;
mod routes;
mod server;
mod services;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point.
///
/// Initializes logging, loads configuration and runs the server until a
/// shutdown signal arrives. Configuration or startup failures exit with
/// status 1.
#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact(),
        )
        .init();

    tracing::info!("🏁 Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = match config::Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server::start(config).await {
        tracing::error!("Server error: {:#}", e);
        std::process::exit(1);
    }
}
