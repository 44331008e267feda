//! Authentication Middleware
//!
//! Axum middleware for bearer-token validation and admin gating, plus the
//! `AuthUser` extractor handlers use to receive the caller's identity.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::auth::{jwt::TokenService, models::AuthUser};
use crate::error::AppError;

/// Authentication middleware that validates JWT tokens and injects user info
pub struct AuthMiddleware;

impl AuthMiddleware {
    /// Reject the request unless it carries a valid, unexpired bearer token
    pub async fn validate_token(
        State(tokens): State<Arc<TokenService>>,
        mut req: Request,
        next: Next,
    ) -> Result<Response, AppError> {
        let claims = {
            let token = bearer_token(req.headers())?;
            tokens.verify(token).map_err(|e| {
                tracing::warn!("[AuthMiddleware] {} {} rejected: {}", req.method(), req.uri(), e);
                AppError::from(e)
            })?
        };

        let auth_user = AuthUser::from(claims);
        tracing::debug!(
            "[AuthMiddleware] Authenticated {} (admin={})",
            auth_user.username,
            auth_user.is_admin
        );

        req.extensions_mut().insert(auth_user);
        Ok(next.run(req).await)
    }

    /// Admin gate; must be layered inside `validate_token`
    pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
        let auth_user = req
            .extensions()
            .get::<AuthUser>()
            .ok_or_else(|| AppError::unauthorized("authentication required"))?;

        if !auth_user.is_admin {
            tracing::warn!(
                "[AuthMiddleware] {} denied admin route {}",
                auth_user.username,
                req.uri()
            );
            return Err(AppError::unauthorized(
                "you don't have permission to access this resource",
            ));
        }

        Ok(next.run(req).await)
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::unauthorized("auth header is empty"))?;

    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::unauthorized("auth header is invalid"))
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthUser>().cloned().ok_or_else(|| {
            tracing::error!("AuthUser requested on {} without the auth middleware", parts.uri);
            AppError::unauthorized("authentication required")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::test_auth_config;
    use axum::{
        Router,
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
    };
    use chrono::{Duration, Utc};
    use tower::ServiceExt;

    async fn whoami(user: AuthUser) -> String {
        user.username
    }

    fn app(tokens: Arc<TokenService>) -> Router {
        let admin = Router::new()
            .route("/admin", get(whoami))
            .route_layer(middleware::from_fn(AuthMiddleware::require_admin))
            .route_layer(middleware::from_fn_with_state(
                tokens.clone(),
                AuthMiddleware::validate_token,
            ));

        Router::new()
            .route("/me", get(whoami))
            .route_layer(middleware::from_fn_with_state(
                tokens,
                AuthMiddleware::validate_token,
            ))
            .merge(admin)
            .route("/unguarded", get(whoami))
    }

    async fn call(app: Router, uri: &str, auth: Option<String>) -> (StatusCode, String) {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn tokens() -> Arc<TokenService> {
        Arc::new(TokenService::new(&test_auth_config()).unwrap())
    }

    #[tokio::test]
    async fn test_missing_header_rejected() {
        let (status, body) = call(app(tokens()), "/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["code"], 401);
        assert_eq!(body["message"], "auth header is empty");
    }

    #[tokio::test]
    async fn test_malformed_header_rejected() {
        let tokens = tokens();
        let issued = tokens.issue("alice", false).unwrap();

        for value in [issued.token.clone(), format!("Token {}", issued.token), "Bearer ".into()] {
            let (status, body) = call(app(tokens.clone()), "/me", Some(value)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert!(body.contains("auth header is invalid"));
        }
    }

    #[tokio::test]
    async fn test_valid_token_reaches_handler() {
        let tokens = tokens();
        let issued = tokens.issue("alice", false).unwrap();
        let (status, body) = call(
            app(tokens.clone()),
            "/me",
            Some(format!("Bearer {}", issued.token)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "alice");
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let tokens = tokens();
        let issued = tokens
            .issue_at("alice", false, Utc::now() - Duration::minutes(5))
            .unwrap();
        let (status, body) = call(
            app(tokens.clone()),
            "/me",
            Some(format!("Bearer {}", issued.token)),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("token is expired"));
    }

    #[tokio::test]
    async fn test_admin_gate() {
        let tokens = tokens();
        let user = tokens.issue("alice", false).unwrap();
        let admin = tokens.issue("root", true).unwrap();

        let (status, _) = call(
            app(tokens.clone()),
            "/admin",
            Some(format!("Bearer {}", user.token)),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = call(
            app(tokens.clone()),
            "/admin",
            Some(format!("Bearer {}", admin.token)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "root");

        let (status, _) = call(app(tokens), "/admin", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_extractor_without_gate_is_rejected() {
        let tokens = tokens();
        let issued = tokens.issue("alice", false).unwrap();
        let (status, _) = call(
            app(tokens.clone()),
            "/unguarded",
            Some(format!("Bearer {}", issued.token)),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
