//! Ingredient models
//!
//! Covers the ingredient catalogue, the per-recipe amounts and the
//! aggregated shopping-list rows.

use serde::{Deserialize, Serialize};

/// Maximum length of an ingredient name
pub const INGREDIENT_NAME_MAX_LEN: usize = 128;
/// Maximum length of a measurement unit
pub const MEASUREMENT_UNIT_MAX_LEN: usize = 64;
/// Smallest allowed ingredient amount
pub const AMOUNT_MIN: i32 = 1;
/// Largest allowed ingredient amount
pub const AMOUNT_MAX: i32 = 32000;

/// Catalogue ingredient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

/// Ingredient as read from a fixture file
#[derive(Debug, Clone, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}

/// Requested amount of a catalogue ingredient in a recipe payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientAmount {
    /// Ingredient id
    pub id: i64,
    pub amount: i32,
}

/// Ingredient as attached to a stored recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    /// Ingredient id (not the join row id)
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// One aggregated shopping-list line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}
