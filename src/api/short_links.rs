//! Short link redirects
//!
//! - GET /s/{hashcode} and /s/{hashcode}/ - 302 to the recipe page

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::api::middleware::{ApiError, AppState};

/// Build the short link router (mounted at the site root)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/s/{hashcode}", get(redirect))
        .route("/s/{hashcode}/", get(redirect))
}

/// GET /s/{hashcode}/
async fn redirect(
    State(state): State<AppState>,
    Path(hashcode): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let recipe_id = state.recipe_service.resolve_short_link(&hashcode).await?;
    let location = format!("{}/recipes/{}", state.site_url, recipe_id);

    tracing::debug!("Short link {} -> {}", hashcode, location);
    Ok((StatusCode::FOUND, [(header::LOCATION, location)]))
}
