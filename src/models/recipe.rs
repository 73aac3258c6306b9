//! Recipe model
//!
//! Besides the stored entity this module holds the write inputs used by the
//! repository and the filter used for listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::IngredientAmount;

/// Maximum length of a recipe name
pub const RECIPE_NAME_MAX_LEN: usize = 256;
/// Shortest allowed cooking time, in minutes
pub const COOKING_TIME_MIN: i32 = 1;
/// Longest allowed cooking time, in minutes
pub const COOKING_TIME_MAX: i32 = 32000;
/// Length of a short-link hashcode
pub const HASHCODE_LEN: usize = 6;

/// Stored recipe.
///
/// `image` is a path relative to the media root. `hashcode` stays empty until
/// the first short-link request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub author_id: i64,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub hashcode: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fully validated data for a new recipe
#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub author_id: i64,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub tag_ids: Vec<i64>,
    pub ingredients: Vec<IngredientAmount>,
}

/// Fully validated update.
///
/// Scalar fields are optional; tags and ingredients always replace the
/// existing set.
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub image: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub tag_ids: Vec<i64>,
    pub ingredients: Vec<IngredientAmount>,
}

/// Listing filter. Empty fields do not restrict the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author_id: Option<i64>,
    /// Tag slugs, any of which must match
    pub tags: Vec<String>,
    /// Only recipes favorited by this user
    pub favorited_by: Option<i64>,
    /// Only recipes in this user's shopping cart
    pub in_cart_of: Option<i64>,
}

impl RecipeFilter {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Per-user recipe collections sharing the same `(user_id, recipe_id)` shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeList {
    Favorites,
    ShoppingCart,
}

impl RecipeList {
    /// Backing table name
    pub fn table(self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "shopping_carts",
        }
    }

    /// Human-readable name used in error messages
    pub fn label(self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "shopping cart",
        }
    }
}

/// Compute the short-link code for a recipe id: the first six hex digits of
/// the MD5 digest of its decimal form.
pub fn hashcode_for(recipe_id: i64) -> String {
    let digest = format!("{:x}", md5::compute(recipe_id.to_string()));
    digest[..HASHCODE_LEN].to_string()
}
