//! Auth routes for signup, signin and token renewal

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
    routing::{get, post},
};

use crate::auth::middleware::bearer_token;
use crate::auth::models::{Credentials, SignupResponse, TokenResponse};
use crate::error::AppError;
use crate::server::AppState;

/// `POST /signup`: create an account and return its id
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<SignupResponse>, AppError> {
    let Json(credentials) = payload.map_err(|e| AppError::Validation(e.body_text()))?;

    let user = state
        .users
        .signup(&credentials.username, &credentials.password)
        .await?;

    Ok(Json(SignupResponse { id: user.id }))
}

/// `POST /signin`: exchange credentials for a bearer token
pub async fn signin(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let Json(credentials) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    if credentials.username.trim().is_empty() || credentials.password.is_empty() {
        return Err(AppError::Validation(
            "missing Username or Password".to_string(),
        ));
    }

    let user = state
        .users
        .authenticate(&credentials.username, &credentials.password)
        .await?;

    let issued = state.tokens.issue(&user.username, user.is_admin)?;
    tracing::info!("🔑 Issued token for {}", user.username);

    Ok(Json(TokenResponse::from(issued)))
}

/// `GET /refresh_token`: renew a token still inside its refresh window.
///
/// The presented token may already be expired; only its signature and its
/// original signin time are checked.
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    let token = bearer_token(&headers)?;
    let issued = state.tokens.renew(token).map_err(|e| {
        tracing::info!("Token renewal refused: {}", e);
        AppError::from(e)
    })?;

    Ok(Json(TokenResponse::from(issued)))
}

pub fn create_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/refresh_token", get(refresh_token))
}
