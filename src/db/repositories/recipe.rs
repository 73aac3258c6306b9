//! Recipe repository
//!
//! Recipes are written together with their ingredient and tag links inside a
//! single transaction. Updates replace both link sets wholesale.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{
    IngredientAmount, ListParams, NewRecipe, Recipe, RecipeChanges, RecipeFilter,
    RecipeIngredient,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySql, MySqlPool, Row, Sqlite, SqlitePool, Transaction};
use std::sync::Arc;

use super::placeholders;

/// Recipe repository trait
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    /// Insert a recipe with its ingredient amounts and tags
    async fn create(&self, recipe: &NewRecipe) -> Result<Recipe>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Recipe>>;

    async fn get_by_hashcode(&self, hashcode: &str) -> Result<Option<Recipe>>;

    /// Apply changes and replace the ingredient and tag links.
    ///
    /// Returns `None` when the recipe does not exist.
    async fn update(&self, id: i64, changes: &RecipeChanges) -> Result<Option<Recipe>>;

    /// Delete a recipe; links cascade
    async fn delete(&self, id: i64) -> Result<()>;

    /// Page through recipes matching `filter`, newest first then by name
    async fn list(&self, filter: &RecipeFilter, params: &ListParams) -> Result<(Vec<Recipe>, i64)>;

    /// Newest recipes of an author, optionally capped
    async fn list_by_author(&self, author_id: i64, limit: Option<i64>) -> Result<Vec<Recipe>>;

    async fn count_by_author(&self, author_id: i64) -> Result<i64>;

    /// Ingredients of a recipe with their amounts, ordered by name
    async fn ingredients(&self, recipe_id: i64) -> Result<Vec<RecipeIngredient>>;

    /// Store the short-link code. Fails with a unique violation if another
    /// recipe already owns it.
    async fn set_hashcode(&self, id: i64, hashcode: &str) -> Result<()>;
}

/// SQLx-based recipe repository implementation
pub struct SqlxRecipeRepository {
    pool: DynDatabasePool,
}

impl SqlxRecipeRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn RecipeRepository> {
        Arc::new(Self::new(pool))
    }
}

const RECIPE_COLUMNS: &str =
    "r.id, r.author_id, r.name, r.image, r.text, r.cooking_time, r.hashcode, r.created_at";

const RECIPE_ORDER: &str = "ORDER BY r.created_at DESC, r.name ASC";

/// Bind value for dynamically built filters
enum FilterArg {
    Int(i64),
    Text(String),
}

/// Build the `WHERE` clause for a listing filter
fn filter_clause(filter: &RecipeFilter) -> (String, Vec<FilterArg>) {
    let mut conditions = Vec::new();
    let mut args = Vec::new();

    if let Some(author_id) = filter.author_id {
        conditions.push("r.author_id = ?".to_string());
        args.push(FilterArg::Int(author_id));
    }
    if !filter.tags.is_empty() {
        conditions.push(format!(
            "EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
             WHERE rt.recipe_id = r.id AND t.slug IN ({}))",
            placeholders(filter.tags.len())
        ));
        args.extend(filter.tags.iter().cloned().map(FilterArg::Text));
    }
    if let Some(user_id) = filter.favorited_by {
        conditions.push(
            "EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ?)"
                .to_string(),
        );
        args.push(FilterArg::Int(user_id));
    }
    if let Some(user_id) = filter.in_cart_of {
        conditions.push(
            "EXISTS (SELECT 1 FROM shopping_carts sc WHERE sc.recipe_id = r.id AND sc.user_id = ?)"
                .to_string(),
        );
        args.push(FilterArg::Int(user_id));
    }

    if conditions.is_empty() {
        (String::new(), args)
    } else {
        (format!("WHERE {}", conditions.join(" AND ")), args)
    }
}

fn ingredient_values(recipe_id: i64, ingredients: &[IngredientAmount]) -> (String, Vec<i64>) {
    let sql = format!(
        "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES {}",
        vec!["(?, ?, ?)"; ingredients.len()].join(", ")
    );
    let args = ingredients
        .iter()
        .flat_map(|item| [recipe_id, item.id, i64::from(item.amount)])
        .collect();
    (sql, args)
}

fn tag_values(recipe_id: i64, tag_ids: &[i64]) -> (String, Vec<i64>) {
    let sql = format!(
        "INSERT INTO recipe_tags (recipe_id, tag_id) VALUES {}",
        vec!["(?, ?)"; tag_ids.len()].join(", ")
    );
    let args = tag_ids.iter().flat_map(|tag_id| [recipe_id, *tag_id]).collect();
    (sql, args)
}

#[async_trait]
impl RecipeRepository for SqlxRecipeRepository {
    async fn create(&self, recipe: &NewRecipe) -> Result<Recipe> {
        let id = match self.pool.backend() {
            Backend::Sqlite(p) => create_recipe_sqlite(p, recipe).await?,
            Backend::Mysql(p) => create_recipe_mysql(p, recipe).await?,
        };
        self.get_by_id(id)
            .await?
            .context("Recipe vanished after insert")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Recipe>> {
        let sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.id = ?");
        match self.pool.backend() {
            Backend::Sqlite(p) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(p)
                    .await
                    .context("Failed to get recipe by ID")?;
                row.as_ref().map(row_to_recipe_sqlite).transpose()
            }
            Backend::Mysql(p) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(p)
                    .await
                    .context("Failed to get recipe by ID")?;
                row.as_ref().map(row_to_recipe_mysql).transpose()
            }
        }
    }

    async fn get_by_hashcode(&self, hashcode: &str) -> Result<Option<Recipe>> {
        let sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.hashcode = ?");
        match self.pool.backend() {
            Backend::Sqlite(p) => {
                let row = sqlx::query(&sql)
                    .bind(hashcode)
                    .fetch_optional(p)
                    .await
                    .context("Failed to get recipe by hashcode")?;
                row.as_ref().map(row_to_recipe_sqlite).transpose()
            }
            Backend::Mysql(p) => {
                let row = sqlx::query(&sql)
                    .bind(hashcode)
                    .fetch_optional(p)
                    .await
                    .context("Failed to get recipe by hashcode")?;
                row.as_ref().map(row_to_recipe_mysql).transpose()
            }
        }
    }

    async fn update(&self, id: i64, changes: &RecipeChanges) -> Result<Option<Recipe>> {
        let updated = match self.pool.backend() {
            Backend::Sqlite(p) => update_recipe_sqlite(p, id, changes).await?,
            Backend::Mysql(p) => update_recipe_mysql(p, id, changes).await?,
        };
        if !updated {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        const SQL: &str = "DELETE FROM recipes WHERE id = ?";
        let result = match self.pool.backend() {
            Backend::Sqlite(p) => sqlx::query(SQL).bind(id).execute(p).await.map(|_| ()),
            Backend::Mysql(p) => sqlx::query(SQL).bind(id).execute(p).await.map(|_| ()),
        };
        result.context("Failed to delete recipe")
    }

    async fn list(&self, filter: &RecipeFilter, params: &ListParams) -> Result<(Vec<Recipe>, i64)> {
        match self.pool.backend() {
            Backend::Sqlite(p) => list_recipes_sqlite(p, filter, params).await,
            Backend::Mysql(p) => list_recipes_mysql(p, filter, params).await,
        }
    }

    async fn list_by_author(&self, author_id: i64, limit: Option<i64>) -> Result<Vec<Recipe>> {
        let limit_clause = if limit.is_some() { " LIMIT ?" } else { "" };
        let sql = format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.author_id = ? {RECIPE_ORDER}{limit_clause}"
        );
        match self.pool.backend() {
            Backend::Sqlite(p) => {
                let mut query = sqlx::query(&sql).bind(author_id);
                if let Some(limit) = limit {
                    query = query.bind(limit);
                }
                query
                    .fetch_all(p)
                    .await
                    .context("Failed to list author recipes")?
                    .iter()
                    .map(row_to_recipe_sqlite)
                    .collect()
            }
            Backend::Mysql(p) => {
                let mut query = sqlx::query(&sql).bind(author_id);
                if let Some(limit) = limit {
                    query = query.bind(limit);
                }
                query
                    .fetch_all(p)
                    .await
                    .context("Failed to list author recipes")?
                    .iter()
                    .map(row_to_recipe_mysql)
                    .collect()
            }
        }
    }

    async fn count_by_author(&self, author_id: i64) -> Result<i64> {
        const SQL: &str = "SELECT COUNT(*) FROM recipes WHERE author_id = ?";
        let result = match self.pool.backend() {
            Backend::Sqlite(p) => sqlx::query_scalar::<_, i64>(SQL).bind(author_id).fetch_one(p).await,
            Backend::Mysql(p) => sqlx::query_scalar::<_, i64>(SQL).bind(author_id).fetch_one(p).await,
        };
        result.context("Failed to count author recipes")
    }

    async fn ingredients(&self, recipe_id: i64) -> Result<Vec<RecipeIngredient>> {
        const SQL: &str = r#"
            SELECT i.id, i.name, i.measurement_unit, ri.amount
            FROM recipe_ingredients ri
            INNER JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.recipe_id = ?
            ORDER BY i.name
        "#;
        match self.pool.backend() {
            Backend::Sqlite(p) => sqlx::query(SQL)
                .bind(recipe_id)
                .fetch_all(p)
                .await
                .context("Failed to get recipe ingredients")?
                .iter()
                .map(|row| {
                    Ok(RecipeIngredient {
                        id: row.try_get("id")?,
                        name: row.try_get("name")?,
                        measurement_unit: row.try_get("measurement_unit")?,
                        amount: row.try_get("amount")?,
                    })
                })
                .collect::<Result<_, sqlx::Error>>()
                .context("Failed to decode recipe ingredients"),
            Backend::Mysql(p) => sqlx::query(SQL)
                .bind(recipe_id)
                .fetch_all(p)
                .await
                .context("Failed to get recipe ingredients")?
                .iter()
                .map(|row| {
                    Ok(RecipeIngredient {
                        id: row.try_get("id")?,
                        name: row.try_get("name")?,
                        measurement_unit: row.try_get("measurement_unit")?,
                        amount: row.try_get("amount")?,
                    })
                })
                .collect::<Result<_, sqlx::Error>>()
                .context("Failed to decode recipe ingredients"),
        }
    }

    async fn set_hashcode(&self, id: i64, hashcode: &str) -> Result<()> {
        const SQL: &str = "UPDATE recipes SET hashcode = ? WHERE id = ?";
        let result = match self.pool.backend() {
            Backend::Sqlite(p) => sqlx::query(SQL).bind(hashcode).bind(id).execute(p).await.map(|_| ()),
            Backend::Mysql(p) => sqlx::query(SQL).bind(hashcode).bind(id).execute(p).await.map(|_| ()),
        };
        result.context("Failed to set recipe hashcode")
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_recipe_sqlite(pool: &SqlitePool, recipe: &NewRecipe) -> Result<i64> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let id = sqlx::query(
        r#"
        INSERT INTO recipes (author_id, name, image, text, cooking_time, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(recipe.author_id)
    .bind(&recipe.name)
    .bind(&recipe.image)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .bind(chrono::Utc::now())
    .execute(&mut *tx)
    .await
    .context("Failed to create recipe")?
    .last_insert_rowid();

    insert_links_sqlite(&mut tx, id, &recipe.tag_ids, &recipe.ingredients).await?;
    tx.commit().await.context("Failed to commit recipe")?;

    Ok(id)
}

async fn update_recipe_sqlite(pool: &SqlitePool, id: i64, changes: &RecipeChanges) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let affected = sqlx::query(
        r#"
        UPDATE recipes SET
            name = COALESCE(?, name),
            image = COALESCE(?, image),
            text = COALESCE(?, text),
            cooking_time = COALESCE(?, cooking_time)
        WHERE id = ?
        "#,
    )
    .bind(&changes.name)
    .bind(&changes.image)
    .bind(&changes.text)
    .bind(changes.cooking_time)
    .bind(id)
    .execute(&mut *tx)
    .await
    .context("Failed to update recipe")?
    .rows_affected();

    if affected == 0 {
        return Ok(false);
    }

    for table in ["recipe_ingredients", "recipe_tags"] {
        sqlx::query(&format!("DELETE FROM {table} WHERE recipe_id = ?"))
            .bind(id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to clear {table}"))?;
    }

    insert_links_sqlite(&mut tx, id, &changes.tag_ids, &changes.ingredients).await?;
    tx.commit().await.context("Failed to commit recipe update")?;

    Ok(true)
}

async fn insert_links_sqlite(
    tx: &mut Transaction<'_, Sqlite>,
    recipe_id: i64,
    tag_ids: &[i64],
    ingredients: &[IngredientAmount],
) -> Result<()> {
    if !ingredients.is_empty() {
        let (sql, args) = ingredient_values(recipe_id, ingredients);
        let mut query = sqlx::query(&sql);
        for arg in args {
            query = query.bind(arg);
        }
        query
            .execute(&mut **tx)
            .await
            .context("Failed to insert recipe ingredients")?;
    }

    if !tag_ids.is_empty() {
        let (sql, args) = tag_values(recipe_id, tag_ids);
        let mut query = sqlx::query(&sql);
        for arg in args {
            query = query.bind(arg);
        }
        query
            .execute(&mut **tx)
            .await
            .context("Failed to insert recipe tags")?;
    }

    Ok(())
}

async fn list_recipes_sqlite(
    pool: &SqlitePool,
    filter: &RecipeFilter,
    params: &ListParams,
) -> Result<(Vec<Recipe>, i64)> {
    let (where_clause, args) = filter_clause(filter);

    let count_sql = format!("SELECT COUNT(*) FROM recipes r {where_clause}");
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_query = match arg {
            FilterArg::Int(v) => count_query.bind(*v),
            FilterArg::Text(v) => count_query.bind(v.clone()),
        };
    }
    let total = count_query
        .fetch_one(pool)
        .await
        .context("Failed to count recipes")?;

    let sql = format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes r {where_clause} {RECIPE_ORDER} LIMIT ? OFFSET ?"
    );
    let mut query = sqlx::query(&sql);
    for arg in &args {
        query = match arg {
            FilterArg::Int(v) => query.bind(*v),
            FilterArg::Text(v) => query.bind(v.clone()),
        };
    }
    let rows = query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list recipes")?;

    let recipes = rows.iter().map(row_to_recipe_sqlite).collect::<Result<_>>()?;
    Ok((recipes, total))
}

fn row_to_recipe_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Recipe> {
    Ok(Recipe {
        id: row.try_get("id")?,
        author_id: row.try_get("author_id")?,
        name: row.try_get("name")?,
        image: row.try_get("image")?,
        text: row.try_get("text")?,
        cooking_time: row.try_get("cooking_time")?,
        hashcode: row.try_get("hashcode")?,
        created_at: row.try_get("created_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_recipe_mysql(pool: &MySqlPool, recipe: &NewRecipe) -> Result<i64> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let id = sqlx::query(
        r#"
        INSERT INTO recipes (author_id, name, image, text, cooking_time, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(recipe.author_id)
    .bind(&recipe.name)
    .bind(&recipe.image)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .bind(chrono::Utc::now())
    .execute(&mut *tx)
    .await
    .context("Failed to create recipe")?
    .last_insert_id() as i64;

    insert_links_mysql(&mut tx, id, &recipe.tag_ids, &recipe.ingredients).await?;
    tx.commit().await.context("Failed to commit recipe")?;

    Ok(id)
}

async fn update_recipe_mysql(pool: &MySqlPool, id: i64, changes: &RecipeChanges) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    // MySQL reports zero affected rows when nothing changed, so check existence first
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM recipes WHERE id = ? FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to lock recipe")?;
    if exists.is_none() {
        return Ok(false);
    }

    sqlx::query(
        r#"
        UPDATE recipes SET
            name = COALESCE(?, name),
            image = COALESCE(?, image),
            text = COALESCE(?, text),
            cooking_time = COALESCE(?, cooking_time)
        WHERE id = ?
        "#,
    )
    .bind(&changes.name)
    .bind(&changes.image)
    .bind(&changes.text)
    .bind(changes.cooking_time)
    .bind(id)
    .execute(&mut *tx)
    .await
    .context("Failed to update recipe")?;

    for table in ["recipe_ingredients", "recipe_tags"] {
        sqlx::query(&format!("DELETE FROM {table} WHERE recipe_id = ?"))
            .bind(id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to clear {table}"))?;
    }

    insert_links_mysql(&mut tx, id, &changes.tag_ids, &changes.ingredients).await?;
    tx.commit().await.context("Failed to commit recipe update")?;

    Ok(true)
}

async fn insert_links_mysql(
    tx: &mut Transaction<'_, MySql>,
    recipe_id: i64,
    tag_ids: &[i64],
    ingredients: &[IngredientAmount],
) -> Result<()> {
    if !ingredients.is_empty() {
        let (sql, args) = ingredient_values(recipe_id, ingredients);
        let mut query = sqlx::query(&sql);
        for arg in args {
            query = query.bind(arg);
        }
        query
            .execute(&mut **tx)
            .await
            .context("Failed to insert recipe ingredients")?;
    }

    if !tag_ids.is_empty() {
        let (sql, args) = tag_values(recipe_id, tag_ids);
        let mut query = sqlx::query(&sql);
        for arg in args {
            query = query.bind(arg);
        }
        query
            .execute(&mut **tx)
            .await
            .context("Failed to insert recipe tags")?;
    }

    Ok(())
}

async fn list_recipes_mysql(
    pool: &MySqlPool,
    filter: &RecipeFilter,
    params: &ListParams,
) -> Result<(Vec<Recipe>, i64)> {
    let (where_clause, args) = filter_clause(filter);

    let count_sql = format!("SELECT COUNT(*) FROM recipes r {where_clause}");
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_query = match arg {
            FilterArg::Int(v) => count_query.bind(*v),
            FilterArg::Text(v) => count_query.bind(v.clone()),
        };
    }
    let total = count_query
        .fetch_one(pool)
        .await
        .context("Failed to count recipes")?;

    let sql = format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes r {where_clause} {RECIPE_ORDER} LIMIT ? OFFSET ?"
    );
    let mut query = sqlx::query(&sql);
    for arg in &args {
        query = match arg {
            FilterArg::Int(v) => query.bind(*v),
            FilterArg::Text(v) => query.bind(v.clone()),
        };
    }
    let rows = query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list recipes")?;

    let recipes = rows.iter().map(row_to_recipe_mysql).collect::<Result<_>>()?;
    Ok((recipes, total))
}

fn row_to_recipe_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Recipe> {
    Ok(Recipe {
        id: row.try_get("id")?,
        author_id: row.try_get("author_id")?,
        name: row.try_get("name")?,
        image: row.try_get("image")?,
        text: row.try_get("text")?,
        cooking_time: row.try_get("cooking_time")?,
        hashcode: row.try_get("hashcode")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        IngredientRepository, SqlxIngredientRepository, SqlxTagRepository, SqlxUserRepository,
        TagRepository, UserRepository,
    };
    use crate::db::{create_test_pool, is_unique_violation, migrations};
    use crate::models::{NewIngredient, NewTag, User};

    struct Fixture {
        repo: SqlxRecipeRepository,
        author_id: i64,
        tag_ids: Vec<i64>,
        ingredient_ids: Vec<i64>,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let author = SqlxUserRepository::new(pool.clone())
            .create(&User::new(
                "chef@example.com".to_string(),
                "chef".to_string(),
                "Chef".to_string(),
                "Cook".to_string(),
                "hash".to_string(),
            ))
            .await
            .unwrap();

        let tags = SqlxTagRepository::new(pool.clone());
        tags.insert_missing(&[
            NewTag { name: "Breakfast".to_string(), slug: "breakfast".to_string() },
            NewTag { name: "Lunch".to_string(), slug: "lunch".to_string() },
        ])
        .await
        .unwrap();
        let tag_ids = tags.list().await.unwrap().into_iter().map(|t| t.id).collect();

        let ingredients = SqlxIngredientRepository::new(pool.clone());
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

        Fixture {
            repo: SqlxRecipeRepository::new(pool),
            author_id: author.id,
            tag_ids,
            ingredient_ids,
        }
    }

    fn new_recipe(fx: &Fixture, name: &str, tag_ids: Vec<i64>) -> NewRecipe {
        NewRecipe {
            author_id: fx.author_id,
            name: name.to_string(),
            image: "recipes/pic.png".to_string(),
            text: "Mix and bake".to_string(),
            cooking_time: 30,
            tag_ids,
            ingredients: vec![
                IngredientAmount { id: fx.ingredient_ids[0], amount: 2 },
                IngredientAmount { id: fx.ingredient_ids[1], amount: 200 },
            ],
        }
    }

    #[tokio::test]
    async fn test_create_persists_links() {
        let fx = setup().await;
        let recipe = fx
            .repo
            .create(&new_recipe(&fx, "Pancakes", fx.tag_ids.clone()))
            .await
            .expect("Failed to create recipe");

        assert_eq!(recipe.name, "Pancakes");
        assert!(recipe.hashcode.is_none());

        let ingredients = fx.repo.ingredients(recipe.id).await.unwrap();
        assert_eq!(ingredients.len(), 2);
        assert_eq!(ingredients[1].name, "flour");
        assert_eq!(ingredients[1].amount, 200);
    }

    #[tokio::test]
    async fn test_create_rolls_back_on_duplicate_ingredient() {
        let fx = setup().await;
        let mut recipe = new_recipe(&fx, "Broken", vec![fx.tag_ids[0]]);
        recipe.ingredients.push(recipe.ingredients[0]);

        let err = fx.repo.create(&recipe).await.unwrap_err();
        assert!(is_unique_violation(&err));

        let (recipes, total) = fx
            .repo
            .list(&RecipeFilter::default(), &ListParams::default())
            .await
            .unwrap();
        assert_eq!(total, 0);
        assert!(recipes.is_empty());
    }

    #[tokio::test]
    async fn test_update_replaces_links() {
        let fx = setup().await;
        let recipe = fx
            .repo
            .create(&new_recipe(&fx, "Omelette", vec![fx.tag_ids[0]]))
            .await
            .unwrap();

        let changes = RecipeChanges {
            cooking_time: Some(5),
            tag_ids: vec![fx.tag_ids[1]],
            ingredients: vec![IngredientAmount { id: fx.ingredient_ids[0], amount: 3 }],
            ..Default::default()
        };
        let updated = fx
            .repo
            .update(recipe.id, &changes)
            .await
            .unwrap()
            .expect("Recipe should exist");

        assert_eq!(updated.name, "Omelette");
        assert_eq!(updated.cooking_time, 5);

        let ingredients = fx.repo.ingredients(recipe.id).await.unwrap();
        assert_eq!(ingredients.len(), 1);
        assert_eq!(ingredients[0].amount, 3);

        assert!(fx.repo.update(recipe.id + 100, &changes).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_by_tag_without_duplicates() {
        let fx = setup().await;
        fx.repo
            .create(&new_recipe(&fx, "Both", fx.tag_ids.clone()))
            .await
            .unwrap();
        fx.repo
            .create(&new_recipe(&fx, "Untagged", vec![]))
            .await
            .unwrap();

        let filter = RecipeFilter {
            tags: vec!["breakfast".to_string(), "lunch".to_string()],
            ..Default::default()
        };
        let (recipes, total) = fx.repo.list(&filter, &ListParams::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(recipes[0].name, "Both");
    }

    #[tokio::test]
    async fn test_list_newest_first_and_paged() {
        let fx = setup().await;
        for name in ["First", "Second", "Third"] {
            fx.repo.create(&new_recipe(&fx, name, vec![])).await.unwrap();
        }

        let (page, total) = fx
            .repo
            .list(&RecipeFilter::default(), &ListParams::new(1, 2))
            .await
            .unwrap();
        assert_eq!(total, 3);
        let names: Vec<_> = page.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Third", "Second"]);

        let preview = fx.repo.list_by_author(fx.author_id, Some(1)).await.unwrap();
        assert_eq!(preview.len(), 1);
        assert_eq!(fx.repo.list_by_author(fx.author_id, None).await.unwrap().len(), 3);
        assert_eq!(fx.repo.count_by_author(fx.author_id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_hashcode_unique() {
        let fx = setup().await;
        let a = fx.repo.create(&new_recipe(&fx, "A", vec![])).await.unwrap();
        let b = fx.repo.create(&new_recipe(&fx, "B", vec![])).await.unwrap();

        fx.repo.set_hashcode(a.id, "abc123").await.unwrap();
        let found = fx.repo.get_by_hashcode("abc123").await.unwrap().unwrap();
        assert_eq!(found.id, a.id);

        let err = fx.repo.set_hashcode(b.id, "abc123").await.unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_delete() {
        let fx = setup().await;
        let recipe = fx.repo.create(&new_recipe(&fx, "Gone", vec![])).await.unwrap();

        fx.repo.delete(recipe.id).await.unwrap();
        assert!(fx.repo.get_by_id(recipe.id).await.unwrap().is_none());
        assert!(fx.repo.ingredients(recipe.id).await.unwrap().is_empty());
    }
}
