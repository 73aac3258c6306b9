//! Shared API response types
//!
//! Wire representations of users, recipes, tags and ingredients. Image and
//! avatar paths are turned into absolute URLs here.

use serde::{Deserialize, Serialize};

use crate::models::{Ingredient, Recipe, RecipeIngredient, Tag, User};
use crate::services::{AuthorSummary, MediaStorage, RecipeDetails};

// ============================================================================
// Users
// ============================================================================

/// Public user representation
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub avatar: Option<String>,
}

impl UserResponse {
    pub fn new(user: User, is_subscribed: bool, media: &MediaStorage) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
            avatar: user.avatar.map(|path| media.url(&path)),
        }
    }
}

/// Returned by registration
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedUserResponse {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for CreatedUserResponse {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

/// Followed author with a preview of their recipes
#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub recipes: Vec<RecipeShortResponse>,
    pub recipes_count: i64,
}

impl SubscriptionResponse {
    pub fn new(summary: AuthorSummary, media: &MediaStorage) -> Self {
        Self {
            user: UserResponse::new(summary.author, true, media),
            recipes: summary
                .recipes
                .into_iter()
                .map(|recipe| RecipeShortResponse::new(recipe, media))
                .collect(),
            recipes_count: summary.recipes_count,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AvatarResponse {
    pub avatar: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub auth_token: String,
}

// ============================================================================
// Tags and ingredients
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            slug: tag.slug,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngredientResponse {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

impl From<Ingredient> for IngredientResponse {
    fn from(ingredient: Ingredient) -> Self {
        Self {
            id: ingredient.id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        }
    }
}

/// Ingredient line of a recipe
#[derive(Debug, Serialize, Deserialize)]
pub struct RecipeIngredientResponse {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl From<RecipeIngredient> for RecipeIngredientResponse {
    fn from(item: RecipeIngredient) -> Self {
        Self {
            id: item.id,
            name: item.name,
            measurement_unit: item.measurement_unit,
            amount: item.amount,
        }
    }
}

// ============================================================================
// Recipes
// ============================================================================

/// Full recipe representation
#[derive(Debug, Serialize)]
pub struct RecipeResponse {
    pub id: i64,
    pub tags: Vec<TagResponse>,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

impl RecipeResponse {
    pub fn new(details: RecipeDetails, media: &MediaStorage) -> Self {
        let RecipeDetails {
            recipe,
            author,
            author_subscribed,
            tags,
            ingredients,
            is_favorited,
            is_in_shopping_cart,
        } = details;

        Self {
            id: recipe.id,
            tags: tags.into_iter().map(Into::into).collect(),
            author: UserResponse::new(author, author_subscribed, media),
            ingredients: ingredients.into_iter().map(Into::into).collect(),
            is_favorited,
            is_in_shopping_cart,
            name: recipe.name,
            image: media.url(&recipe.image),
            text: recipe.text,
            cooking_time: recipe.cooking_time,
        }
    }
}

/// Short recipe representation used by favorites, cart and subscriptions
#[derive(Debug, Serialize, Deserialize)]
pub struct RecipeShortResponse {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl RecipeShortResponse {
    pub fn new(recipe: Recipe, media: &MediaStorage) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name,
            image: media.url(&recipe.image),
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShortLinkResponse {
    #[serde(rename = "short-link")]
    pub short_link: String,
}
