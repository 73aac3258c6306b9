//! Favorites and shopping-cart repository
//!
//! Both lists are `(user_id, recipe_id)` tables with a unique pair, so one
//! implementation serves both via [`RecipeList`].

use crate::db::{Backend, DynDatabasePool};
use crate::models::{RecipeList, ShoppingListItem};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// Per-user recipe list repository trait
#[async_trait]
pub trait RecipeListRepository: Send + Sync {
    /// Add a recipe to the list. A duplicate pair fails with a unique violation.
    async fn add(&self, list: RecipeList, user_id: i64, recipe_id: i64) -> Result<()>;

    /// Remove a recipe from the list, returning false if it was not there
    async fn remove(&self, list: RecipeList, user_id: i64, recipe_id: i64) -> Result<bool>;

    async fn contains(&self, list: RecipeList, user_id: i64, recipe_id: i64) -> Result<bool>;

    /// Sum ingredient amounts over every recipe in the user's cart, grouped by
    /// ingredient name and unit, ordered by name
    async fn shopping_list(&self, user_id: i64) -> Result<Vec<ShoppingListItem>>;
}

/// SQLx-based recipe list repository implementation
pub struct SqlxRecipeListRepository {
    pool: DynDatabasePool,
}

impl SqlxRecipeListRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn RecipeListRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl RecipeListRepository for SqlxRecipeListRepository {
    async fn add(&self, list: RecipeList, user_id: i64, recipe_id: i64) -> Result<()> {
        let sql = format!("INSERT INTO {} (user_id, recipe_id) VALUES (?, ?)", list.table());
        let result = match self.pool.backend() {
            Backend::Sqlite(p) => sqlx::query(&sql)
                .bind(user_id)
                .bind(recipe_id)
                .execute(p)
                .await
                .map(|_| ()),
            Backend::Mysql(p) => sqlx::query(&sql)
                .bind(user_id)
                .bind(recipe_id)
                .execute(p)
                .await
                .map(|_| ()),
        };
        result.with_context(|| format!("Failed to add recipe to {}", list.label()))
    }

    async fn remove(&self, list: RecipeList, user_id: i64, recipe_id: i64) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE user_id = ? AND recipe_id = ?", list.table());
        let result = match self.pool.backend() {
            Backend::Sqlite(p) => sqlx::query(&sql)
                .bind(user_id)
                .bind(recipe_id)
                .execute(p)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(p) => sqlx::query(&sql)
                .bind(user_id)
                .bind(recipe_id)
                .execute(p)
                .await
                .map(|r| r.rows_affected()),
        };
        let removed = result.with_context(|| format!("Failed to remove recipe from {}", list.label()))?;
        Ok(removed > 0)
    }

    async fn contains(&self, list: RecipeList, user_id: i64, recipe_id: i64) -> Result<bool> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE user_id = ? AND recipe_id = ?",
            list.table()
        );
        let result = match self.pool.backend() {
            Backend::Sqlite(p) => sqlx::query_scalar::<_, i64>(&sql)
                .bind(user_id)
                .bind(recipe_id)
                .fetch_one(p)
                .await,
            Backend::Mysql(p) => sqlx::query_scalar::<_, i64>(&sql)
                .bind(user_id)
                .bind(recipe_id)
                .fetch_one(p)
                .await,
        };
        let count = result.with_context(|| format!("Failed to check {}", list.label()))?;
        Ok(count > 0)
    }

    async fn shopping_list(&self, user_id: i64) -> Result<Vec<ShoppingListItem>> {
        // SUM over INT yields DECIMAL on MySQL; cast keeps both drivers on BIGINT
        const SQL: &str = r#"
            SELECT i.name AS name, i.measurement_unit AS measurement_unit,
                   CAST(SUM(ri.amount) AS SIGNED) AS total_amount
            FROM shopping_carts sc
            INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
            INNER JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE sc.user_id = ?
            GROUP BY i.name, i.measurement_unit
            ORDER BY i.name
        "#;
        match self.pool.backend() {
            Backend::Sqlite(p) => {
                let rows = sqlx::query(SQL)
                    .bind(user_id)
                    .fetch_all(p)
                    .await
                    .context("Failed to aggregate shopping list")?;
                rows.iter()
                    .map(|row| {
                        Ok(ShoppingListItem {
                            name: row.try_get("name")?,
                            measurement_unit: row.try_get("measurement_unit")?,
                            total_amount: row.try_get("total_amount")?,
                        })
                    })
                    .collect::<Result<_, sqlx::Error>>()
                    .context("Failed to decode shopping list")
            }
            Backend::Mysql(p) => {
                let rows = sqlx::query(SQL)
                    .bind(user_id)
                    .fetch_all(p)
                    .await
                    .context("Failed to aggregate shopping list")?;
                rows.iter()
                    .map(|row| {
                        Ok(ShoppingListItem {
                            name: row.try_get("name")?,
                            measurement_unit: row.try_get("measurement_unit")?,
                            total_amount: row.try_get("total_amount")?,
                        })
                    })
                    .collect::<Result<_, sqlx::Error>>()
                    .context("Failed to decode shopping list")
            }
        }
    }
}
