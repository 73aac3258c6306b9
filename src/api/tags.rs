//! Tag API endpoints
//!
//! - GET /api/tags/ - All tags (unpaginated)
//! - GET /api/tags/{id}/ - Single tag

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::TagResponse;

/// Build the tags router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tags/", get(list_tags))
        .route("/tags/{id}/", get(get_tag))
}

/// GET /api/tags/
async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<TagResponse>>, ApiError> {
    let tags = state.tag_service.list().await?;
    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

/// GET /api/tags/{id}/
async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TagResponse>, ApiError> {
    let tag = state.tag_service.get(id).await?;
    Ok(Json(tag.into()))
}
