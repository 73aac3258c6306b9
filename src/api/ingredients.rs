//! Ingredient API endpoints
//!
//! - GET /api/ingredients/?name=<prefix> - Case-insensitive starts-with search
//! - GET /api/ingredients/{id}/

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::IngredientResponse;

#[derive(Debug, Deserialize)]
pub struct IngredientSearchQuery {
    pub name: Option<String>,
}

/// Build the ingredients router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ingredients/", get(list_ingredients))
        .route("/ingredients/{id}/", get(get_ingredient))
}

/// GET /api/ingredients/
async fn list_ingredients(
    State(state): State<AppState>,
    Query(query): Query<IngredientSearchQuery>,
) -> Result<Json<Vec<IngredientResponse>>, ApiError> {
    let ingredients = state
        .ingredient_service
        .search(query.name.as_deref())
        .await?;
    Ok(Json(ingredients.into_iter().map(IngredientResponse::from).collect()))
}

/// GET /api/ingredients/{id}/
async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<IngredientResponse>, ApiError> {
    let ingredient = state.ingredient_service.get(id).await?;
    Ok(Json(ingredient.into()))
}
