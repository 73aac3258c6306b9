//! Ingredient repository

use crate::db::{Backend, DynDatabasePool};
use crate::models::{Ingredient, NewIngredient};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use super::{escape_like, placeholders};

/// Ingredient repository trait
#[async_trait]
pub trait IngredientRepository: Send + Sync {
    async fn get_by_id(&self, id: i64) -> Result<Option<Ingredient>>;

    /// List ingredients ordered by name, optionally restricted to names
    /// starting with `prefix` (case-insensitive)
    async fn list(&self, prefix: Option<&str>) -> Result<Vec<Ingredient>>;

    /// Return the subset of `ids` that exist
    async fn existing_ids(&self, ids: &[i64]) -> Result<Vec<i64>>;

    /// Insert ingredients whose name is free; returns how many were added
    async fn insert_missing(&self, ingredients: &[NewIngredient]) -> Result<u64>;
}

/// SQLx-based ingredient repository implementation
pub struct SqlxIngredientRepository {
    pool: DynDatabasePool,
}

impl SqlxIngredientRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn IngredientRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl IngredientRepository for SqlxIngredientRepository {
    async fn get_by_id(&self, id: i64) -> Result<Option<Ingredient>> {
        const SQL: &str = "SELECT id, name, measurement_unit FROM ingredients WHERE id = ?";
        match self.pool.backend() {
            Backend::Sqlite(p) => {
                let row = sqlx::query(SQL)
                    .bind(id)
                    .fetch_optional(p)
                    .await
                    .context("Failed to get ingredient by ID")?;
                row.as_ref().map(row_to_ingredient_sqlite).transpose()
            }
            Backend::Mysql(p) => {
                let row = sqlx::query(SQL)
                    .bind(id)
                    .fetch_optional(p)
                    .await
                    .context("Failed to get ingredient by ID")?;
                row.as_ref().map(row_to_ingredient_mysql).transpose()
            }
        }
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<Ingredient>> {
        match self.pool.backend() {
            Backend::Sqlite(p) => list_ingredients_sqlite(p, prefix).await,
            Backend::Mysql(p) => list_ingredients_mysql(p, prefix).await,
        }
    }

    async fn existing_ids(&self, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT id FROM ingredients WHERE id IN ({})",
            placeholders(ids.len())
        );
        match self.pool.backend() {
            Backend::Sqlite(p) => {
                let mut query = sqlx::query_scalar::<_, i64>(&sql);
                for id in ids {
                    query = query.bind(*id);
                }
                query.fetch_all(p).await.context("Failed to check ingredient ids")
            }
            Backend::Mysql(p) => {
                let mut query = sqlx::query_scalar::<_, i64>(&sql);
                for id in ids {
                    query = query.bind(*id);
                }
                query.fetch_all(p).await.context("Failed to check ingredient ids")
            }
        }
    }

    async fn insert_missing(&self, ingredients: &[NewIngredient]) -> Result<u64> {
        match self.pool.backend() {
            Backend::Sqlite(p) => insert_missing_sqlite(p, ingredients).await,
            Backend::Mysql(p) => insert_missing_mysql(p, ingredients).await,
        }
    }
}

/// `LIKE` pattern matching names that start with `prefix`.
///
/// Matched against `name_lower`, which is folded with `str::to_lowercase` on
/// insert. SQLite's `LOWER` only folds ASCII.
fn prefix_pattern(prefix: &str) -> String {
    format!("{}%", escape_like(&prefix.to_lowercase()))
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn list_ingredients_sqlite(pool: &SqlitePool, prefix: Option<&str>) -> Result<Vec<Ingredient>> {
    let rows = match prefix {
        Some(prefix) => {
            sqlx::query(
                r#"
                SELECT id, name, measurement_unit FROM ingredients
                WHERE name_lower LIKE ? ESCAPE '!'
                ORDER BY name
                "#,
            )
            .bind(prefix_pattern(prefix))
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query("SELECT id, name, measurement_unit FROM ingredients ORDER BY name")
                .fetch_all(pool)
                .await
        }
    }
    .context("Failed to list ingredients")?;

    rows.iter().map(row_to_ingredient_sqlite).collect()
}

async fn insert_missing_sqlite(pool: &SqlitePool, ingredients: &[NewIngredient]) -> Result<u64> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;
    let mut inserted = 0;
    for ingredient in ingredients {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO ingredients (name, name_lower, measurement_unit) VALUES (?, ?, ?)",
        )
        .bind(&ingredient.name)
        .bind(ingredient.name.to_lowercase())
        .bind(&ingredient.measurement_unit)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to insert ingredient {}", ingredient.name))?;
        inserted += result.rows_affected();
    }
    tx.commit().await.context("Failed to commit ingredients")?;
    Ok(inserted)
}

fn row_to_ingredient_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Ingredient> {
    Ok(Ingredient {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        measurement_unit: row.try_get("measurement_unit")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn list_ingredients_mysql(pool: &MySqlPool, prefix: Option<&str>) -> Result<Vec<Ingredient>> {
    let rows = match prefix {
        Some(prefix) => {
            sqlx::query(
                r#"
                SELECT id, name, measurement_unit FROM ingredients
                WHERE name_lower LIKE ? ESCAPE '!'
                ORDER BY name
                "#,
            )
            .bind(prefix_pattern(prefix))
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query("SELECT id, name, measurement_unit FROM ingredients ORDER BY name")
                .fetch_all(pool)
                .await
        }
    }
    .context("Failed to list ingredients")?;

    rows.iter().map(row_to_ingredient_mysql).collect()
}

async fn insert_missing_mysql(pool: &MySqlPool, ingredients: &[NewIngredient]) -> Result<u64> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;
    let mut inserted = 0;
    for ingredient in ingredients {
        let result = sqlx::query(
            "INSERT IGNORE INTO ingredients (name, name_lower, measurement_unit) VALUES (?, ?, ?)",
        )
        .bind(&ingredient.name)
        .bind(ingredient.name.to_lowercase())
        .bind(&ingredient.measurement_unit)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to insert ingredient {}", ingredient.name))?;
        inserted += result.rows_affected();
    }
    tx.commit().await.context("Failed to commit ingredients")?;
    Ok(inserted)
}

fn row_to_ingredient_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Ingredient> {
    Ok(Ingredient {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        measurement_unit: row.try_get("measurement_unit")?,
    })
}
