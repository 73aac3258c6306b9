//! User API endpoints
//!
//! - POST /api/users/ - Register
//! - GET /api/users/ - List users (paginated)
//! - GET /api/users/{id}/ - User profile
//! - GET /api/users/me/ - Current user
//! - POST /api/users/set_password/ - Change password
//! - PUT/DELETE /api/users/me/avatar/ - Upload or remove avatar
//! - GET /api/users/subscriptions/ - Followed authors
//! - POST/DELETE /api/users/{id}/subscribe/, DELETE /api/users/{id}/unsubscribe/

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{StatusCode, Uri},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{json_body, parse_recipes_limit, Page, PaginationQuery};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{
    AvatarResponse, CreatedUserResponse, SubscriptionResponse, UserResponse,
};
use crate::models::CreateUserInput;
use crate::services::FieldErrors;

const REQUIRED: &str = "This field is required.";

/// Registration body. Fields are optional so missing ones become field errors.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

impl RegisterRequest {
    fn into_input(self) -> Result<CreateUserInput, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut take = |field: &str, value: Option<String>| {
            value.unwrap_or_else(|| {
                errors.add(field, REQUIRED);
                String::new()
            })
        };

        let input = CreateUserInput {
            email: take("email", self.email),
            username: take("username", self.username),
            first_name: take("first_name", self.first_name),
            last_name: take("last_name", self.last_name),
            password: take("password", self.password),
        };
        errors.into_result().map(|()| input)
    }
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub new_password: Option<String>,
    pub current_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AvatarRequest {
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecipesLimitQuery {
    pub recipes_limit: Option<String>,
}

/// Build the users router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/", get(list_users).post(register))
        .route("/users/me/", get(current_user))
        .route("/users/me/avatar/", put(set_avatar).delete(delete_avatar))
        .route("/users/set_password/", post(set_password))
        .route("/users/subscriptions/", get(list_subscriptions))
        .route("/users/{id}/", get(get_user))
        .route("/users/{id}/subscribe/", post(subscribe).delete(unsubscribe))
        .route("/users/{id}/unsubscribe/", axum::routing::delete(unsubscribe))
}

/// POST /api/users/ - Register a new account
async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let input = json_body(body)?.into_input()?;
    let user = state.user_service.register(input).await?;
    Ok((StatusCode::CREATED, Json(CreatedUserResponse::from(user))))
}

/// GET /api/users/ - Paginated user list ordered by username
async fn list_users(
    State(state): State<AppState>,
    viewer: Option<AuthenticatedUser>,
    Query(query): Query<PaginationQuery>,
    uri: Uri,
) -> Result<Json<Page<UserResponse>>, ApiError> {
    let paged = state.user_service.list(&query.params()?).await?;
    let viewer = viewer.map(|v| v.0);

    let mut flagged = Vec::with_capacity(paged.items.len());
    for user in &paged.items {
        flagged.push(
            state
                .subscription_service
                .is_subscribed(viewer.as_ref(), user.id)
                .await?,
        );
    }

    let mut flags = flagged.into_iter();
    let media = state.media.clone();
    let page = Page::from_paged(paged, &state.site_url, &uri, |user| {
        UserResponse::new(user, flags.next().unwrap_or(false), &media)
    })?;
    Ok(Json(page))
}

/// GET /api/users/{id}/
async fn get_user(
    State(state): State<AppState>,
    viewer: Option<AuthenticatedUser>,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.user_service.get(id).await?;
    let is_subscribed = state
        .subscription_service
        .is_subscribed(viewer.as_ref().map(|v| &v.0), id)
        .await?;
    Ok(Json(UserResponse::new(user, is_subscribed, &state.media)))
}

/// GET /api/users/me/
async fn current_user(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Json<UserResponse> {
    Json(UserResponse::new(user, false, &state.media))
}

/// POST /api/users/set_password/
async fn set_password(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    body: Result<Json<SetPasswordRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let body = json_body(body)?;

    let mut errors = FieldErrors::new();
    if body.current_password.is_none() {
        errors.add("current_password", REQUIRED);
    }
    if body.new_password.is_none() {
        errors.add("new_password", REQUIRED);
    }
    errors.into_result()?;

    state
        .user_service
        .set_password(
            &user,
            body.current_password.as_deref().unwrap_or_default(),
            body.new_password.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/users/me/avatar/
async fn set_avatar(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    body: Result<Json<AvatarRequest>, JsonRejection>,
) -> Result<Json<AvatarResponse>, ApiError> {
    let data_uri = json_body(body)?
        .avatar
        .ok_or_else(|| FieldErrors::single("avatar", REQUIRED))?;

    let path = state.user_service.set_avatar(&user, &data_uri).await?;
    Ok(Json(AvatarResponse {
        avatar: state.media.url(&path),
    }))
}

/// DELETE /api/users/me/avatar/
async fn delete_avatar(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<StatusCode, ApiError> {
    state.user_service.clear_avatar(&user).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/users/subscriptions/
async fn list_subscriptions(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<PaginationQuery>,
    Query(preview): Query<RecipesLimitQuery>,
    uri: Uri,
) -> Result<Json<Page<SubscriptionResponse>>, ApiError> {
    let params = query.params()?;
    let recipes_limit = parse_recipes_limit(preview.recipes_limit.as_deref());
    let paged = state
        .subscription_service
        .list(&user, &params, recipes_limit)
        .await?;

    let media = state.media.clone();
    let page = Page::from_paged(paged, &state.site_url, &uri, |summary| {
        SubscriptionResponse::new(summary, &media)
    })?;
    Ok(Json(page))
}

/// POST /api/users/{id}/subscribe/
async fn subscribe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    Query(query): Query<RecipesLimitQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let recipes_limit = parse_recipes_limit(query.recipes_limit.as_deref());
    let summary = state
        .subscription_service
        .subscribe(&user, id, recipes_limit)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(SubscriptionResponse::new(summary, &state.media)),
    ))
}

/// DELETE /api/users/{id}/subscribe/ and /api/users/{id}/unsubscribe/
async fn unsubscribe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.subscription_service.unsubscribe(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
