//! User routes: the caller's own profile and admin user management

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection, rejection::PathRejection},
    routing::get,
};
use serde_json::{Value, json};

use crate::auth::models::{AuthUser, UpdateProfileRequest};
use crate::database::User;
use crate::error::AppError;
use crate::server::AppState;

/// `GET /profile`
pub async fn profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.users.profile(&user.username).await?))
}

/// `PUT /profile`: change the caller's username
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<User>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let updated = state.users.rename(&user.username, &request.username).await?;
    Ok(Json(updated))
}

/// `GET /admin/users`
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.users.list().await?))
}

/// `GET /admin/users/{id}`
pub async fn show_user(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<User>, AppError> {
    let Path(id) = id.map_err(|_| AppError::not_found("user not found"))?;
    Ok(Json(state.users.find(id).await?))
}

/// `DELETE /admin/users/{id}`
pub async fn delete_user(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<Value>, AppError> {
    let Path(id) = id.map_err(|_| AppError::not_found("user not found"))?;
    state.users.delete(id).await?;
    Ok(Json(json!({ "id": id })))
}

/// Routes for any authenticated user
pub fn create_profile_routes() -> Router<AppState> {
    Router::new().route("/profile", get(profile).put(update_profile))
}

/// Routes that additionally require the admin flag
pub fn create_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/{id}", get(show_user).delete(delete_user))
}
