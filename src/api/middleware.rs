//! API middleware
//!
//! Contains:
//! - Application state shared by handlers
//! - The JSON error type and service error mappings
//! - Token authentication (`Authorization: Token <key>` or `Bearer <key>`)

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::Config;
use crate::db::repositories::{
    SqlxIngredientRepository, SqlxRecipeListRepository, SqlxRecipeRepository,
    SqlxSessionRepository, SqlxSubscriptionRepository, SqlxTagRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::{
    FieldErrors, IngredientService, IngredientServiceError, MediaStorage, RecipeService,
    RecipeServiceError, SubscriptionService, SubscriptionServiceError, TagService,
    TagServiceError, UserService, UserServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub recipe_service: Arc<RecipeService>,
    pub subscription_service: Arc<SubscriptionService>,
    pub tag_service: Arc<TagService>,
    pub ingredient_service: Arc<IngredientService>,
    pub media: Arc<MediaStorage>,
    /// Public origin without a trailing slash
    pub site_url: Arc<str>,
}

impl AppState {
    /// Wire repositories and services over `pool`
    pub fn new(pool: DynDatabasePool, config: &Config) -> Self {
        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let recipe_repo = SqlxRecipeRepository::boxed(pool.clone());
        let tag_repo = SqlxTagRepository::boxed(pool.clone());
        let ingredient_repo = SqlxIngredientRepository::boxed(pool.clone());
        let list_repo = SqlxRecipeListRepository::boxed(pool.clone());
        let subscription_repo = SqlxSubscriptionRepository::boxed(pool);

        let media = Arc::new(MediaStorage::new(
            config.media.clone(),
            config.server.base_url(),
        ));

        Self {
            user_service: Arc::new(UserService::new(
                user_repo.clone(),
                session_repo,
                media.clone(),
                config.auth.token_ttl_days,
            )),
            recipe_service: Arc::new(RecipeService::new(
                recipe_repo.clone(),
                tag_repo.clone(),
                ingredient_repo.clone(),
                list_repo,
                user_repo.clone(),
                subscription_repo.clone(),
                media.clone(),
            )),
            subscription_service: Arc::new(SubscriptionService::new(
                subscription_repo,
                user_repo,
                recipe_repo,
            )),
            tag_service: Arc::new(TagService::new(tag_repo)),
            ingredient_service: Arc::new(IngredientService::new(ingredient_repo)),
            media,
            site_url: Arc::from(config.server.base_url()),
        }
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Field-keyed validation failure
    pub fn validation(errors: FieldErrors) -> Self {
        Self::with_details("VALIDATION_ERROR", errors.to_string(), errors.to_json())
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" | "CONFLICT" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {}", self.error.message);
        }
        (status, Json(self)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::internal_error(format!("{:#}", err))
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::validation(errors)
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::Validation(errors) => ApiError::validation(errors),
            UserServiceError::Conflict(msg) => ApiError::conflict(msg),
            UserServiceError::NotFound(_) => ApiError::not_found(err.to_string()),
            UserServiceError::InternalError(e) => e.into(),
        }
    }
}

impl From<RecipeServiceError> for ApiError {
    fn from(err: RecipeServiceError) -> Self {
        match err {
            RecipeServiceError::Validation(errors) => ApiError::validation(errors),
            RecipeServiceError::NotFound(_) => ApiError::not_found(err.to_string()),
            RecipeServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            RecipeServiceError::Conflict(msg) => ApiError::conflict(msg),
            RecipeServiceError::InternalError(e) => e.into(),
        }
    }
}

impl From<SubscriptionServiceError> for ApiError {
    fn from(err: SubscriptionServiceError) -> Self {
        match err {
            SubscriptionServiceError::NotFound(_) => ApiError::not_found(err.to_string()),
            SubscriptionServiceError::Conflict(msg) => ApiError::conflict(msg),
            SubscriptionServiceError::InternalError(e) => e.into(),
        }
    }
}

impl From<TagServiceError> for ApiError {
    fn from(err: TagServiceError) -> Self {
        match err {
            TagServiceError::NotFound(_) => ApiError::not_found(err.to_string()),
            TagServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            TagServiceError::InternalError(e) => e.into(),
        }
    }
}

impl From<IngredientServiceError> for ApiError {
    fn from(err: IngredientServiceError) -> Self {
        match err {
            IngredientServiceError::NotFound(_) => ApiError::not_found(err.to_string()),
            IngredientServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            IngredientServiceError::InternalError(e) => e.into(),
        }
    }
}

/// Extract the auth token from `Authorization: Token <key>` or `Bearer <key>`
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    if scheme.eq_ignore_ascii_case("Token") || scheme.eq_ignore_ascii_case("Bearer") {
        Some(token.to_string())
    } else {
        None
    }
}

/// Optional authentication middleware
///
/// Resolves the token to a user when one is presented. Unknown or expired
/// tokens leave the request anonymous; handlers that need a user reject it.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_token(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Ok(None) => tracing::debug!("Ignoring unknown or expired token"),
            Err(e) => tracing::warn!("Session validation failed: {}", e),
        }
    }
    next.run(request).await
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided."))
    }
}

impl<S> OptionalFromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthenticatedUser>().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_token_schemes() {
        assert_eq!(extract_token(&headers_with("Token abc")), Some("abc".to_string()));
        assert_eq!(extract_token(&headers_with("Bearer xyz")), Some("xyz".to_string()));
        assert_eq!(extract_token(&headers_with("token abc")), Some("abc".to_string()));
    }

    #[test]
    fn test_extract_token_rejects_other_schemes() {
        assert_eq!(extract_token(&headers_with("Basic dXNlcjpwYXNz")), None);
        assert_eq!(extract_token(&headers_with("Token")), None);
        assert_eq!(extract_token(&headers_with("Token   ")), None);
        assert_eq!(extract_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_conflict_maps_to_bad_request() {
        assert_eq!(ApiError::conflict("dup").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::forbidden("no").status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::internal_error("boom").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_carries_field_details() {
        let err = ApiError::validation(FieldErrors::single("tags", "Tags must not repeat."));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.error.details,
            Some(serde_json::json!({"tags": ["Tags must not repeat."]}))
        );
    }

    #[test]
    fn test_service_errors_map_to_codes() {
        let err: ApiError = RecipeServiceError::Forbidden("x".to_string()).into();
        assert_eq!(err.error.code, "FORBIDDEN");

        let err: ApiError = SubscriptionServiceError::NotFound(3).into();
        assert_eq!(err.error.code, "NOT_FOUND");

        let err: ApiError = UserServiceError::Conflict("taken".to_string()).into();
        assert_eq!(err.error.code, "CONFLICT");
    }
}
