//! # Server Module
//!
//! Application state, router assembly and the HTTP listener.

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::jwt::TokenService;
use crate::auth::middleware::AuthMiddleware;
use crate::auth::password::PasswordHasher;
use crate::config::Config;
use crate::database::{DatabaseConnection, UserStore};
use crate::routes;
use crate::services::UserService;

/// Application state shared across all route handlers
#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
    pub tokens: Arc<TokenService>,
}

/// Build the CORS layer. `None` allows any origin.
pub fn cors_layer(origins: Option<&[String]>) -> Result<CorsLayer> {
    let allow_origin = match origins {
        None => AllowOrigin::any(),
        Some(origins) => {
            let origins = origins
                .iter()
                .map(|origin| {
                    origin
                        .parse::<HeaderValue>()
                        .with_context(|| format!("Invalid CORS origin: {}", origin))
                })
                .collect::<Result<Vec<_>>>()?;
            AllowOrigin::list(origins)
        }
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]))
}

/// Assemble every route with its authentication gates
pub fn router(state: AppState, cors: CorsLayer) -> Router {
    let tokens = state.tokens.clone();

    let profile_routes = routes::users::create_profile_routes().route_layer(
        middleware::from_fn_with_state(tokens.clone(), AuthMiddleware::validate_token),
    );

    // Layers run bottom-up: token validation first, then the admin check
    let admin_routes = routes::users::create_admin_routes()
        .route_layer(middleware::from_fn(AuthMiddleware::require_admin))
        .route_layer(middleware::from_fn_with_state(
            tokens,
            AuthMiddleware::validate_token,
        ));

    Router::new()
        .merge(routes::auth::create_auth_routes())
        .merge(profile_routes)
        .merge(admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Connect to the database, wire the services and serve until shutdown
pub async fn start(config: Config) -> Result<()> {
    let db = DatabaseConnection::new(config.database.clone())
        .await
        .context("Failed to connect to the database")?;
    db.migrate().await?;
    let store: Arc<dyn UserStore> = Arc::new(db);

    let hasher = PasswordHasher::new(&config.password).context("Invalid password hash settings")?;
    let tokens =
        Arc::new(TokenService::new(&config.auth).context("Failed to initialize token service")?);
    let users = UserService::new(store, hasher);

    if let Some(admin) = &config.admin {
        users
            .ensure_admin(&admin.username, &admin.password)
            .await
            .context("Failed to seed admin user")?;
    }

    let state = AppState { users, tokens };
    let app = router(state, cors_layer(config.cors_origins.as_deref())?);

    let listener = TcpListener::bind(config.http_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.http_addr))?;

    tracing::info!("🚀 HTTP listening on http://{}", config.http_addr);
    tracing::info!(
        "⏱️  Token timeout {}s, max refresh {}s",
        config.auth.timeout_secs,
        config.auth.max_refresh_secs
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Received shutdown signal, shutting down...");
}
