//! Authentication API endpoints
//!
//! - POST /api/auth/token/login/ - Exchange email and password for a token
//! - POST /api/auth/token/logout/ - Revoke the presented token

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::json_body;
use crate::api::middleware::{extract_token, ApiError, AppState, AuthenticatedUser};
use crate::api::responses::TokenResponse;
use crate::services::FieldErrors;

/// Request body for token login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Build the auth router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/token/login/", post(login))
        .route("/auth/token/logout/", post(logout))
}

/// POST /api/auth/token/login/
async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let body = json_body(body)?;

    let mut errors = FieldErrors::new();
    if body.email.is_none() {
        errors.add("email", "This field is required.");
    }
    if body.password.is_none() {
        errors.add("password", "This field is required.");
    }
    errors.into_result()?;

    let session = state
        .user_service
        .login(
            body.email.as_deref().unwrap_or_default(),
            body.password.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(Json(TokenResponse {
        auth_token: session.id,
    }))
}

/// POST /api/auth/token/logout/
async fn logout(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    if let Some(token) = extract_token(&headers) {
        state.user_service.logout(&token).await?;
        tracing::info!("User {} logged out", user.id);
    }
    Ok(StatusCode::NO_CONTENT)
}
