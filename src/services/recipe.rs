//! Recipe service
//!
//! Write path validation, author-only edits, favorites and shopping cart
//! toggles, and short links.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;

use crate::db::is_unique_violation;
use crate::db::repositories::{
    IngredientRepository, RecipeListRepository, RecipeRepository, SubscriptionRepository,
    TagRepository, UserRepository,
};
use crate::models::{
    hashcode_for, IngredientAmount, ListParams, NewRecipe, PagedResult, Recipe, RecipeChanges,
    RecipeFilter, RecipeIngredient, RecipeList, ShoppingListItem, Tag, User, AMOUNT_MAX,
    AMOUNT_MIN, COOKING_TIME_MAX, COOKING_TIME_MIN, RECIPE_NAME_MAX_LEN,
};
use crate::services::media::{MediaStorage, RECIPES_FOLDER};
use crate::services::user::media_error;
use crate::services::validation::{check_range, check_text, FieldErrors};

const REQUIRED: &str = "This field is required.";

/// Maximum length of the recipe description
const RECIPE_TEXT_MAX_LEN: usize = 10_000;

/// Error types for recipe service operations
#[derive(Debug, thiserror::Error)]
pub enum RecipeServiceError {
    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Recipe not found: {0}")]
    NotFound(String),

    /// Acting on someone else's recipe
    #[error("{0}")]
    Forbidden(String),

    /// Duplicate or missing favorite/cart entry
    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<FieldErrors> for RecipeServiceError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

/// One `{id, amount}` entry of a recipe payload
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IngredientInput {
    pub id: i64,
    pub amount: i64,
}

/// Recipe payload for create and update.
///
/// Every field is optional at the wire level so that missing values surface
/// as field errors rather than deserialization failures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeInput {
    pub ingredients: Option<Vec<IngredientInput>>,
    pub tags: Option<Vec<i64>>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
}

/// A recipe with everything its full representation needs
#[derive(Debug, Clone)]
pub struct RecipeDetails {
    pub recipe: Recipe,
    pub author: User,
    /// Whether the viewer follows the author
    pub author_subscribed: bool,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// Payload after validation, ready for persistence
#[derive(Debug)]
struct ValidRecipe {
    tag_ids: Vec<i64>,
    ingredients: Vec<IngredientAmount>,
    name: Option<String>,
    text: Option<String>,
    cooking_time: Option<i32>,
}

pub struct RecipeService {
    recipe_repo: Arc<dyn RecipeRepository>,
    tag_repo: Arc<dyn TagRepository>,
    ingredient_repo: Arc<dyn IngredientRepository>,
    list_repo: Arc<dyn RecipeListRepository>,
    user_repo: Arc<dyn UserRepository>,
    subscription_repo: Arc<dyn SubscriptionRepository>,
    media: Arc<MediaStorage>,
}

impl RecipeService {
    pub fn new(
        recipe_repo: Arc<dyn RecipeRepository>,
        tag_repo: Arc<dyn TagRepository>,
        ingredient_repo: Arc<dyn IngredientRepository>,
        list_repo: Arc<dyn RecipeListRepository>,
        user_repo: Arc<dyn UserRepository>,
        subscription_repo: Arc<dyn SubscriptionRepository>,
        media: Arc<MediaStorage>,
    ) -> Self {
        Self {
            recipe_repo,
            tag_repo,
            ingredient_repo,
            list_repo,
            user_repo,
            subscription_repo,
            media,
        }
    }

    /// Create a recipe authored by `author`
    pub async fn create(
        &self,
        author: &User,
        input: RecipeInput,
    ) -> Result<RecipeDetails, RecipeServiceError> {
        let valid = self.validate(&input, true).await?;
        let data_uri = input
            .image
            .as_deref()
            .ok_or_else(|| FieldErrors::single("image", REQUIRED))?;

        let image = self
            .media
            .save_data_uri(RECIPES_FOLDER, data_uri)
            .await
            .map_err(|e| media_error::<RecipeServiceError>("image", e))?;

        let new_recipe = NewRecipe {
            author_id: author.id,
            name: valid.name.unwrap_or_default(),
            image: image.clone(),
            text: valid.text.unwrap_or_default(),
            cooking_time: valid.cooking_time.unwrap_or(COOKING_TIME_MIN),
            tag_ids: valid.tag_ids,
            ingredients: valid.ingredients,
        };

        let recipe = match self.recipe_repo.create(&new_recipe).await {
            Ok(recipe) => recipe,
            Err(e) => {
                self.media.discard(&image).await;
                return Err(write_error(e));
            }
        };

        tracing::info!("User {} created recipe {}", author.id, recipe.id);
        self.details(recipe, Some(author)).await
    }

    /// Update a recipe. Tags and ingredients are mandatory and replace the
    /// existing sets; other fields are kept when omitted.
    pub async fn update(
        &self,
        user: &User,
        id: i64,
        input: RecipeInput,
    ) -> Result<RecipeDetails, RecipeServiceError> {
        let existing = self.require_recipe(id).await?;
        ensure_author(user, &existing)?;

        let valid = self.validate(&input, false).await?;

        let image = match input.image.as_deref() {
            Some(data_uri) => Some(
                self.media
                    .save_data_uri(RECIPES_FOLDER, data_uri)
                    .await
                    .map_err(|e| media_error::<RecipeServiceError>("image", e))?,
            ),
            None => None,
        };

        let changes = RecipeChanges {
            name: valid.name,
            image: image.clone(),
            text: valid.text,
            cooking_time: valid.cooking_time,
            tag_ids: valid.tag_ids,
            ingredients: valid.ingredients,
        };

        let updated = match self.recipe_repo.update(id, &changes).await {
            Ok(Some(recipe)) => recipe,
            Ok(None) => {
                if let Some(path) = &image {
                    self.media.discard(path).await;
                }
                return Err(RecipeServiceError::NotFound(id.to_string()));
            }
            Err(e) => {
                if let Some(path) = &image {
                    self.media.discard(path).await;
                }
                return Err(write_error(e));
            }
        };

        if image.is_some() && existing.image != updated.image {
            self.media.discard(&existing.image).await;
        }

        tracing::info!("User {} updated recipe {}", user.id, id);
        self.details(updated, Some(user)).await
    }

    /// Delete a recipe and its image
    pub async fn delete(&self, user: &User, id: i64) -> Result<(), RecipeServiceError> {
        let recipe = self.require_recipe(id).await?;
        ensure_author(user, &recipe)?;

        self.recipe_repo.delete(id).await?;
        self.media.discard(&recipe.image).await;

        tracing::info!("User {} deleted recipe {}", user.id, id);
        Ok(())
    }

    pub async fn get(
        &self,
        id: i64,
        viewer: Option<&User>,
    ) -> Result<RecipeDetails, RecipeServiceError> {
        let recipe = self.require_recipe(id).await?;
        self.details(recipe, viewer).await
    }

    /// Page through recipes, newest first
    pub async fn list(
        &self,
        viewer: Option<&User>,
        filter: &RecipeFilter,
        params: &ListParams,
    ) -> Result<PagedResult<RecipeDetails>, RecipeServiceError> {
        let (recipes, total) = self.recipe_repo.list(filter, params).await?;

        let mut items = Vec::with_capacity(recipes.len());
        for recipe in recipes {
            items.push(self.details(recipe, viewer).await?);
        }
        Ok(PagedResult::new(items, total, params))
    }

    /// Add a recipe to the user's favorites or shopping cart
    pub async fn add_to_list(
        &self,
        list: RecipeList,
        user: &User,
        recipe_id: i64,
    ) -> Result<Recipe, RecipeServiceError> {
        let recipe = self.require_recipe(recipe_id).await?;
        let already = || {
            RecipeServiceError::Conflict(format!("Recipe is already in {}", list.label()))
        };

        if self.list_repo.contains(list, user.id, recipe_id).await? {
            tracing::debug!("Recipe {} already in {} of {}", recipe_id, list.label(), user.id);
            return Err(already());
        }

        match self.list_repo.add(list, user.id, recipe_id).await {
            Ok(()) => Ok(recipe),
            Err(e) if is_unique_violation(&e) => Err(already()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a recipe from the user's favorites or shopping cart
    pub async fn remove_from_list(
        &self,
        list: RecipeList,
        user: &User,
        recipe_id: i64,
    ) -> Result<(), RecipeServiceError> {
        self.require_recipe(recipe_id).await?;

        if !self.list_repo.remove(list, user.id, recipe_id).await? {
            return Err(RecipeServiceError::Conflict(format!(
                "Recipe is not in {}",
                list.label()
            )));
        }
        Ok(())
    }

    /// Aggregated ingredients of the user's shopping cart
    pub async fn shopping_list(
        &self,
        user: &User,
    ) -> Result<Vec<ShoppingListItem>, RecipeServiceError> {
        Ok(self.list_repo.shopping_list(user.id).await?)
    }

    /// Short-link code of a recipe, assigned on first request
    pub async fn short_link(&self, recipe_id: i64) -> Result<String, RecipeServiceError> {
        let recipe = self.require_recipe(recipe_id).await?;
        if let Some(hashcode) = recipe.hashcode {
            return Ok(hashcode);
        }

        let hashcode = hashcode_for(recipe_id);
        match self.recipe_repo.set_hashcode(recipe_id, &hashcode).await {
            Ok(()) => Ok(hashcode),
            Err(e) if is_unique_violation(&e) => {
                tracing::warn!(
                    "Short link collision: code {} of recipe {} is already taken",
                    hashcode,
                    recipe_id
                );
                Err(RecipeServiceError::InternalError(anyhow::anyhow!(
                    "short link code {} is already assigned to another recipe",
                    hashcode
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Recipe id behind a short-link code
    pub async fn resolve_short_link(&self, hashcode: &str) -> Result<i64, RecipeServiceError> {
        self.recipe_repo
            .get_by_hashcode(hashcode)
            .await?
            .map(|recipe| recipe.id)
            .ok_or_else(|| RecipeServiceError::NotFound(hashcode.to_string()))
    }

    async fn require_recipe(&self, id: i64) -> Result<Recipe, RecipeServiceError> {
        self.recipe_repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| RecipeServiceError::NotFound(id.to_string()))
    }

    async fn details(
        &self,
        recipe: Recipe,
        viewer: Option<&User>,
    ) -> Result<RecipeDetails, RecipeServiceError> {
        let author = self
            .user_repo
            .get_by_id(recipe.author_id)
            .await?
            .ok_or_else(|| {
                anyhow::anyhow!("author {} of recipe {} is missing", recipe.author_id, recipe.id)
            })?;
        let tags = self.tag_repo.get_by_recipe(recipe.id).await?;
        let ingredients = self.recipe_repo.ingredients(recipe.id).await?;

        let (author_subscribed, is_favorited, is_in_shopping_cart) = match viewer {
            Some(viewer) => (
                self.subscription_repo.exists(viewer.id, author.id).await?,
                self.list_repo
                    .contains(RecipeList::Favorites, viewer.id, recipe.id)
                    .await?,
                self.list_repo
                    .contains(RecipeList::ShoppingCart, viewer.id, recipe.id)
                    .await?,
            ),
            None => (false, false, false),
        };

        Ok(RecipeDetails {
            recipe,
            author,
            author_subscribed,
            tags,
            ingredients,
            is_favorited,
            is_in_shopping_cart,
        })
    }

    /// Validate a payload: tag list, then ingredient list, then scalar
    /// fields, then existence of the referenced rows.
    async fn validate(
        &self,
        input: &RecipeInput,
        creating: bool,
    ) -> Result<ValidRecipe, FieldErrors> {
        let tag_ids = check_tags(input.tags.as_deref())?;
        let ingredients = check_ingredients(input.ingredients.as_deref())?;

        let mut errors = FieldErrors::new();
        for (field, value, max_len) in [
            ("name", &input.name, RECIPE_NAME_MAX_LEN),
            ("text", &input.text, RECIPE_TEXT_MAX_LEN),
        ] {
            match value {
                Some(value) => check_text(&mut errors, field, value, max_len),
                None if creating => errors.add(field, REQUIRED),
                None => {}
            }
        }

        match input.cooking_time {
            Some(value) => check_range(
                &mut errors,
                "cooking_time",
                value,
                i64::from(COOKING_TIME_MIN),
                i64::from(COOKING_TIME_MAX),
            ),
            None if creating => errors.add("cooking_time", REQUIRED),
            None => {}
        }

        for item in &ingredients {
            check_range(
                &mut errors,
                "ingredients",
                item.amount,
                i64::from(AMOUNT_MIN),
                i64::from(AMOUNT_MAX),
            );
        }

        if creating && input.image.is_none() {
            errors.add("image", REQUIRED);
        }
        if matches!(input.image.as_deref(), Some(value) if value.trim().is_empty()) {
            errors.add("image", "This field may not be blank.");
        }
        errors.into_result()?;

        let mut errors = FieldErrors::new();
        let known_tags: HashSet<i64> = self
            .tag_repo
            .existing_ids(&tag_ids)
            .await
            .map_err(internal_field_error)?
            .into_iter()
            .collect();
        for id in tag_ids.iter().filter(|id| !known_tags.contains(id)) {
            errors.add("tags", format!("Invalid pk \"{}\" - object does not exist.", id));
        }

        let ingredient_ids: Vec<i64> = ingredients.iter().map(|item| item.id).collect();
        let known_ingredients: HashSet<i64> = self
            .ingredient_repo
            .existing_ids(&ingredient_ids)
            .await
            .map_err(internal_field_error)?
            .into_iter()
            .collect();
        for id in ingredient_ids.iter().filter(|id| !known_ingredients.contains(id)) {
            errors.add(
                "ingredients",
                format!("Invalid pk \"{}\" - object does not exist.", id),
            );
        }
        errors.into_result()?;

        Ok(ValidRecipe {
            tag_ids,
            ingredients: ingredients
                .into_iter()
                .map(|item| IngredientAmount {
                    id: item.id,
                    amount: item.amount as i32,
                })
                .collect(),
            name: input.name.clone(),
            text: input.text.clone(),
            cooking_time: input.cooking_time.map(|v| v as i32),
        })
    }
}

fn ensure_author(user: &User, recipe: &Recipe) -> Result<(), RecipeServiceError> {
    if recipe.author_id != user.id {
        return Err(RecipeServiceError::Forbidden(
            "Only the author can change this recipe".to_string(),
        ));
    }
    Ok(())
}

fn write_error(err: anyhow::Error) -> RecipeServiceError {
    if is_unique_violation(&err) {
        RecipeServiceError::Conflict("Recipe links must be unique".to_string())
    } else {
        RecipeServiceError::InternalError(err)
    }
}

fn internal_field_error(err: anyhow::Error) -> FieldErrors {
    tracing::error!("Failed to check recipe references: {:#}", err);
    FieldErrors::single("non_field_errors", "Failed to check referenced objects.")
}

fn check_tags(tags: Option<&[i64]>) -> Result<Vec<i64>, FieldErrors> {
    let tags = tags.ok_or_else(|| FieldErrors::single("tags", REQUIRED))?;
    if tags.is_empty() {
        return Err(FieldErrors::single("tags", "At least one tag is required."));
    }
    let mut seen = HashSet::new();
    if !tags.iter().all(|id| seen.insert(*id)) {
        return Err(FieldErrors::single("tags", "Tags must not repeat."));
    }
    Ok(tags.to_vec())
}

fn check_ingredients(
    ingredients: Option<&[IngredientInput]>,
) -> Result<Vec<IngredientInput>, FieldErrors> {
    let ingredients = ingredients.ok_or_else(|| FieldErrors::single("ingredients", REQUIRED))?;
    if ingredients.is_empty() {
        return Err(FieldErrors::single(
            "ingredients",
            "At least one ingredient is required.",
        ));
    }
    let mut seen = HashSet::new();
    if !ingredients.iter().all(|item| seen.insert(item.id)) {
        return Err(FieldErrors::single(
            "ingredients",
            "Ingredients must not repeat.",
        ));
    }
    Ok(ingredients.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MediaConfig;
    use crate::db::repositories::{
        SqlxIngredientRepository, SqlxRecipeListRepository, SqlxRecipeRepository,
        SqlxSubscriptionRepository, SqlxTagRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{NewIngredient, NewTag};
    use proptest::prelude::*;

    const PNG_URI: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

    struct Fixture {
        service: RecipeService,
        author: User,
        other: User,
        tag_ids: Vec<i64>,
        ingredient_ids: Vec<i64>,
        media_dir: tempfile::TempDir,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::boxed(pool.clone());
        let mut created = Vec::new();
        for name in ["chef", "guest"] {
            created.push(
                users
                    .create(&User::new(
                        format!("{name}@example.com"),
                        name.to_string(),
                        "F".to_string(),
                        "L".to_string(),
                        "hash".to_string(),
                    ))
                    .await
                    .unwrap(),
            );
        }

        let tags = SqlxTagRepository::boxed(pool.clone());
        tags.insert_missing(&[
            NewTag { name: "Breakfast".to_string(), slug: "breakfast".to_string() },
            NewTag { name: "Dinner".to_string(), slug: "dinner".to_string() },
        ])
        .await
        .unwrap();
        let tag_ids = tags.list().await.unwrap().into_iter().map(|t| t.id).collect();

        let ingredients = SqlxIngredientRepository::boxed(pool.clone());
        ingredients
            .insert_missing(&[
                NewIngredient { name: "egg".to_string(), measurement_unit: "pcs".to_string() },
                NewIngredient { name: "flour".to_string(), measurement_unit: "g".to_string() },
            ])
            .await
            .unwrap();
        let ingredient_ids = ingredients
            .list(None)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();

        let media_dir = tempfile::tempdir().unwrap();
        let media = Arc::new(MediaStorage::new(
            MediaConfig {
                root: media_dir.path().to_path_buf(),
                ..MediaConfig::default()
            },
            "http://localhost",
        ));

        let service = RecipeService::new(
            SqlxRecipeRepository::boxed(pool.clone()),
            tags,
            ingredients,
            SqlxRecipeListRepository::boxed(pool.clone()),
            users,
            SqlxSubscriptionRepository::boxed(pool),
            media,
        );

        let other = created.pop().unwrap();
        let author = created.pop().unwrap();
        Fixture {
            service,
            author,
            other,
            tag_ids,
            ingredient_ids,
            media_dir,
        }
    }

    fn payload(fx: &Fixture) -> RecipeInput {
        RecipeInput {
            ingredients: Some(vec![
                IngredientInput { id: fx.ingredient_ids[0], amount: 2 },
                IngredientInput { id: fx.ingredient_ids[1], amount: 200 },
            ]),
            tags: Some(vec![fx.tag_ids[0]]),
            image: Some(PNG_URI.to_string()),
            name: Some("Pancakes".to_string()),
            text: Some("Mix and fry".to_string()),
            cooking_time: Some(20),
        }
    }

    fn validation(err: RecipeServiceError) -> FieldErrors {
        match err {
            RecipeServiceError::Validation(errors) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_returns_full_details() {
        let fx = setup().await;
        let details = fx.service.create(&fx.author, payload(&fx)).await.unwrap();

        assert_eq!(details.author.id, fx.author.id);
        assert_eq!(details.tags.len(), 1);
        assert_eq!(details.ingredients.len(), 2);
        assert!(fx.media_dir.path().join(&details.recipe.image).exists());
        assert!(!details.is_favorited);
    }

    #[tokio::test]
    async fn test_tag_errors_come_first() {
        let fx = setup().await;
        let mut input = payload(&fx);
        input.tags = Some(vec![fx.tag_ids[0], fx.tag_ids[0]]);
        input.ingredients = Some(vec![]);
        input.cooking_time = Some(0);

        let errors = validation(fx.service.create(&fx.author, input).await.unwrap_err());
        assert!(errors.contains("tags"));
        assert!(!errors.contains("ingredients"));
        assert!(!errors.contains("cooking_time"));
    }

    #[tokio::test]
    async fn test_duplicate_ingredients_rejected() {
        let fx = setup().await;
        let mut input = payload(&fx);
        input.ingredients = Some(vec![
            IngredientInput { id: fx.ingredient_ids[0], amount: 1 },
            IngredientInput { id: fx.ingredient_ids[0], amount: 5 },
        ]);

        let errors = validation(fx.service.create(&fx.author, input).await.unwrap_err());
        assert!(errors.contains("ingredients"));
    }

    #[tokio::test]
    async fn test_unknown_references_rejected() {
        let fx = setup().await;
        let mut input = payload(&fx);
        input.tags = Some(vec![9999]);
        input.ingredients = Some(vec![IngredientInput { id: 8888, amount: 1 }]);

        let errors = validation(fx.service.create(&fx.author, input).await.unwrap_err());
        assert!(errors.contains("tags"));
        assert!(errors.contains("ingredients"));
    }

    #[tokio::test]
    async fn test_update_requires_tags_and_ingredients() {
        let fx = setup().await;
        let created = fx.service.create(&fx.author, payload(&fx)).await.unwrap();

        let mut input = payload(&fx);
        input.tags = None;
        let errors = validation(
            fx.service
                .update(&fx.author, created.recipe.id, input)
                .await
                .unwrap_err(),
        );
        assert!(errors.contains("tags"));

        let mut input = payload(&fx);
        input.ingredients = None;
        let errors = validation(
            fx.service
                .update(&fx.author, created.recipe.id, input)
                .await
                .unwrap_err(),
        );
        assert!(errors.contains("ingredients"));
    }

    #[tokio::test]
    async fn test_partial_update_keeps_fields_and_replaces_links() {
        let fx = setup().await;
        let created = fx.service.create(&fx.author, payload(&fx)).await.unwrap();

        let input = RecipeInput {
            tags: Some(vec![fx.tag_ids[1]]),
            ingredients: Some(vec![IngredientInput { id: fx.ingredient_ids[1], amount: 50 }]),
            ..RecipeInput::default()
        };
        let updated = fx
            .service
            .update(&fx.author, created.recipe.id, input)
            .await
            .unwrap();

        assert_eq!(updated.recipe.name, "Pancakes");
        assert_eq!(updated.recipe.image, created.recipe.image);
        assert_eq!(updated.tags.len(), 1);
        assert_eq!(updated.tags[0].id, fx.tag_ids[1]);
        assert_eq!(updated.ingredients.len(), 1);
        assert_eq!(updated.ingredients[0].amount, 50);
    }

    #[tokio::test]
    async fn test_update_image_replaces_file() {
        let fx = setup().await;
        let created = fx.service.create(&fx.author, payload(&fx)).await.unwrap();

        let updated = fx
            .service
            .update(&fx.author, created.recipe.id, payload(&fx))
            .await
            .unwrap();

        assert_ne!(updated.recipe.image, created.recipe.image);
        assert!(!fx.media_dir.path().join(&created.recipe.image).exists());
        assert!(fx.media_dir.path().join(&updated.recipe.image).exists());
    }

    #[tokio::test]
    async fn test_only_author_may_edit_or_delete() {
        let fx = setup().await;
        let created = fx.service.create(&fx.author, payload(&fx)).await.unwrap();

        let err = fx
            .service
            .update(&fx.other, created.recipe.id, payload(&fx))
            .await
            .unwrap_err();
        assert!(matches!(err, RecipeServiceError::Forbidden(_)));

        let err = fx.service.delete(&fx.other, created.recipe.id).await.unwrap_err();
        assert!(matches!(err, RecipeServiceError::Forbidden(_)));

        fx.service.delete(&fx.author, created.recipe.id).await.unwrap();
        assert!(!fx.media_dir.path().join(&created.recipe.image).exists());
        assert!(matches!(
            fx.service.get(created.recipe.id, None).await,
            Err(RecipeServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_favorite_twice_and_unfavorite_missing() {
        let fx = setup().await;
        let created = fx.service.create(&fx.author, payload(&fx)).await.unwrap();
        let id = created.recipe.id;

        fx.service
            .add_to_list(RecipeList::Favorites, &fx.other, id)
            .await
            .unwrap();
        let err = fx
            .service
            .add_to_list(RecipeList::Favorites, &fx.other, id)
            .await
            .unwrap_err();
        assert!(matches!(err, RecipeServiceError::Conflict(_)));

        let details = fx.service.get(id, Some(&fx.other)).await.unwrap();
        assert!(details.is_favorited);
        assert!(!details.is_in_shopping_cart);

        fx.service
            .remove_from_list(RecipeList::Favorites, &fx.other, id)
            .await
            .unwrap();
        let err = fx
            .service
            .remove_from_list(RecipeList::Favorites, &fx.other, id)
            .await
            .unwrap_err();
        assert!(matches!(err, RecipeServiceError::Conflict(_)));

        let err = fx
            .service
            .add_to_list(RecipeList::ShoppingCart, &fx.other, 9999)
            .await
            .unwrap_err();
        assert!(matches!(err, RecipeServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_short_link_is_stable_and_resolves() {
        let fx = setup().await;
        let created = fx.service.create(&fx.author, payload(&fx)).await.unwrap();

        let first = fx.service.short_link(created.recipe.id).await.unwrap();
        let second = fx.service.short_link(created.recipe.id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first, hashcode_for(created.recipe.id));

        assert_eq!(
            fx.service.resolve_short_link(&first).await.unwrap(),
            created.recipe.id
        );
        assert!(matches!(
            fx.service.resolve_short_link("zzzzzz").await,
            Err(RecipeServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_filters_by_favorites() {
        let fx = setup().await;
        let first = fx.service.create(&fx.author, payload(&fx)).await.unwrap();
        fx.service.create(&fx.author, payload(&fx)).await.unwrap();

        fx.service
            .add_to_list(RecipeList::Favorites, &fx.other, first.recipe.id)
            .await
            .unwrap();

        let filter = RecipeFilter {
            favorited_by: Some(fx.other.id),
            ..RecipeFilter::default()
        };
        let page = fx
            .service
            .list(Some(&fx.other), &filter, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert!(page.items[0].is_favorited);
    }

    proptest! {
        #[test]
        fn prop_cooking_time_bounds(value in -5i64..32_010) {
            let mut errors = FieldErrors::new();
            check_range(
                &mut errors,
                "cooking_time",
                value,
                i64::from(COOKING_TIME_MIN),
                i64::from(COOKING_TIME_MAX),
            );
            let in_bounds = (1..=32_000).contains(&value);
            prop_assert_eq!(errors.is_empty(), in_bounds);
        }

        #[test]
        fn prop_duplicate_tags_always_rejected(ids in proptest::collection::vec(1i64..20, 1..8)) {
            let has_duplicates = ids.iter().collect::<HashSet<_>>().len() != ids.len();
            prop_assert_eq!(check_tags(Some(&ids)).is_err(), has_duplicates);
        }
    }
}
