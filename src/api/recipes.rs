//! Recipe API endpoints
//!
//! - GET/POST /api/recipes/
//! - GET/PATCH/DELETE /api/recipes/{id}/
//! - GET /api/recipes/{id}/get-link/
//! - POST/DELETE /api/recipes/{id}/favorite/
//! - POST/DELETE /api/recipes/{id}/shopping_cart/
//! - GET /api/recipes/download_shopping_cart/

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::api::common::{
    default_limit, default_page, json_body, parse_limit, parse_page, Page,
};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{RecipeResponse, RecipeShortResponse, ShortLinkResponse};
use crate::models::{ListParams, RecipeFilter, RecipeList, User};
use crate::services::{render_csv, FieldErrors, RecipeInput, SHOPPING_LIST_FILENAME};

/// Build the recipes router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/recipes/", get(list_recipes).post(create_recipe))
        .route("/recipes/download_shopping_cart/", get(download_shopping_cart))
        .route(
            "/recipes/{id}/",
            get(get_recipe).patch(update_recipe).delete(delete_recipe),
        )
        .route("/recipes/{id}/get-link/", get(get_link))
        .route(
            "/recipes/{id}/favorite/",
            axum::routing::post(add_favorite).delete(remove_favorite),
        )
        .route(
            "/recipes/{id}/shopping_cart/",
            axum::routing::post(add_to_cart).delete(remove_from_cart),
        )
}

fn is_truthy(value: &str) -> bool {
    matches!(value, "1" | "true" | "True")
}

/// Turn the raw query pairs into a listing filter and page parameters.
///
/// `tags` may repeat. `is_favorited` and `is_in_shopping_cart` only apply
/// to authenticated viewers.
fn parse_list_query(
    pairs: &[(String, String)],
    viewer: Option<&User>,
) -> Result<(RecipeFilter, ListParams), ApiError> {
    let mut filter = RecipeFilter::default();
    let mut page = default_page();
    let mut limit = default_limit();

    for (key, value) in pairs {
        match key.as_str() {
            "page" => page = parse_page(value)?,
            "limit" => limit = parse_limit(value),
            "author" => {
                let author_id = value.parse().map_err(|_| {
                    FieldErrors::single("author", "Select a valid choice.")
                })?;
                filter.author_id = Some(author_id);
            }
            "tags" if !value.is_empty() => filter.tags.push(value.clone()),
            "is_favorited" if is_truthy(value) => {
                filter.favorited_by = viewer.map(|user| user.id);
            }
            "is_in_shopping_cart" if is_truthy(value) => {
                filter.in_cart_of = viewer.map(|user| user.id);
            }
            _ => {}
        }
    }

    Ok((filter, ListParams::new(page, limit)))
}

/// GET /api/recipes/
async fn list_recipes(
    State(state): State<AppState>,
    viewer: Option<AuthenticatedUser>,
    Query(pairs): Query<Vec<(String, String)>>,
    uri: Uri,
) -> Result<Json<Page<RecipeResponse>>, ApiError> {
    let viewer = viewer.map(|v| v.0);
    let (filter, params) = parse_list_query(&pairs, viewer.as_ref())?;

    let paged = state
        .recipe_service
        .list(viewer.as_ref(), &filter, &params)
        .await?;

    let media = state.media.clone();
    let page = Page::from_paged(paged, &state.site_url, &uri, |details| {
        RecipeResponse::new(details, &media)
    })?;
    Ok(Json(page))
}

/// POST /api/recipes/
async fn create_recipe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    body: Result<Json<RecipeInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let input = json_body(body)?;
    let details = state.recipe_service.create(&user, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(RecipeResponse::new(details, &state.media)),
    ))
}

/// GET /api/recipes/{id}/
async fn get_recipe(
    State(state): State<AppState>,
    viewer: Option<AuthenticatedUser>,
    Path(id): Path<i64>,
) -> Result<Json<RecipeResponse>, ApiError> {
    let details = state
        .recipe_service
        .get(id, viewer.as_ref().map(|v| &v.0))
        .await?;
    Ok(Json(RecipeResponse::new(details, &state.media)))
}

/// PATCH /api/recipes/{id}/
async fn update_recipe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    body: Result<Json<RecipeInput>, JsonRejection>,
) -> Result<Json<RecipeResponse>, ApiError> {
    let input = json_body(body)?;
    let details = state.recipe_service.update(&user, id, input).await?;
    Ok(Json(RecipeResponse::new(details, &state.media)))
}

/// DELETE /api/recipes/{id}/
async fn delete_recipe(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.recipe_service.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/recipes/{id}/get-link/
async fn get_link(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ShortLinkResponse>, ApiError> {
    let hashcode = state.recipe_service.short_link(id).await?;
    Ok(Json(ShortLinkResponse {
        short_link: format!("{}/s/{}", state.site_url, hashcode),
    }))
}

async fn add_to_list(
    state: &AppState,
    list: RecipeList,
    user: &User,
    id: i64,
) -> Result<(StatusCode, Json<RecipeShortResponse>), ApiError> {
    let recipe = state.recipe_service.add_to_list(list, user, id).await?;
    tracing::info!("User {} added recipe {} to {}", user.id, id, list.label());
    Ok((
        StatusCode::CREATED,
        Json(RecipeShortResponse::new(recipe, &state.media)),
    ))
}

async fn remove_from_list(
    state: &AppState,
    list: RecipeList,
    user: &User,
    id: i64,
) -> Result<StatusCode, ApiError> {
    state.recipe_service.remove_from_list(list, user, id).await?;
    tracing::info!("User {} removed recipe {} from {}", user.id, id, list.label());
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/recipes/{id}/favorite/
async fn add_favorite(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    add_to_list(&state, RecipeList::Favorites, &user, id).await
}

/// DELETE /api/recipes/{id}/favorite/
async fn remove_favorite(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    remove_from_list(&state, RecipeList::Favorites, &user, id).await
}

/// POST /api/recipes/{id}/shopping_cart/
async fn add_to_cart(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    add_to_list(&state, RecipeList::ShoppingCart, &user, id).await
}

/// DELETE /api/recipes/{id}/shopping_cart/
async fn remove_from_cart(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    remove_from_list(&state, RecipeList::ShoppingCart, &user, id).await
}

/// GET /api/recipes/download_shopping_cart/
async fn download_shopping_cart(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let items = state.recipe_service.shopping_list(&user).await?;
    let body = render_csv(&items);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", SHOPPING_LIST_FILENAME),
            ),
        ],
        body,
    ))
}
