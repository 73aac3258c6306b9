//! Data models
//!
//! Database entities, write inputs and the pagination containers shared by
//! repositories, services and handlers.

mod ingredient;
mod pagination;
mod recipe;
mod session;
mod subscription;
mod tag;
mod user;

pub use ingredient::{
    Ingredient, IngredientAmount, NewIngredient, RecipeIngredient, ShoppingListItem, AMOUNT_MAX,
    AMOUNT_MIN, INGREDIENT_NAME_MAX_LEN, MEASUREMENT_UNIT_MAX_LEN,
};
pub use pagination::{ListParams, PagedResult, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use recipe::{
    hashcode_for, NewRecipe, Recipe, RecipeChanges, RecipeFilter, RecipeList, COOKING_TIME_MAX,
    COOKING_TIME_MIN, HASHCODE_LEN, RECIPE_NAME_MAX_LEN,
};
pub use session::Session;
pub use subscription::{Subscription, RECIPES_PREVIEW_LIMIT};
pub use tag::{NewTag, Tag, TAG_MAX_LEN};
pub use user::{
    CreateUserInput, User, EMAIL_MAX_LEN, PASSWORD_MIN_LEN, PERSON_NAME_MAX_LEN, USERNAME_MAX_LEN,
};
