//! Tag repository
//!
//! Tags are read-only through the API; new ones only arrive through the
//! fixture loader.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{NewTag, Tag};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use super::placeholders;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// List all tags ordered by name
    async fn list(&self) -> Result<Vec<Tag>>;

    /// Return the subset of `ids` that exist
    async fn existing_ids(&self, ids: &[i64]) -> Result<Vec<i64>>;

    /// Tags attached to a recipe, ordered by name
    async fn get_by_recipe(&self, recipe_id: i64) -> Result<Vec<Tag>>;

    /// Insert tags whose name and slug are both free; returns how many were added
    async fn insert_missing(&self, tags: &[NewTag]) -> Result<u64>;
}

/// SQLx-based tag repository implementation
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        const SQL: &str = "SELECT id, name, slug FROM tags WHERE id = ?";
        match self.pool.backend() {
            Backend::Sqlite(p) => {
                let row = sqlx::query(SQL)
                    .bind(id)
                    .fetch_optional(p)
                    .await
                    .context("Failed to get tag by ID")?;
                row.as_ref().map(row_to_tag_sqlite).transpose()
            }
            Backend::Mysql(p) => {
                let row = sqlx::query(SQL)
                    .bind(id)
                    .fetch_optional(p)
                    .await
                    .context("Failed to get tag by ID")?;
                row.as_ref().map(row_to_tag_mysql).transpose()
            }
        }
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        const SQL: &str = "SELECT id, name, slug FROM tags ORDER BY name";
        match self.pool.backend() {
            Backend::Sqlite(p) => sqlx::query(SQL)
                .fetch_all(p)
                .await
                .context("Failed to list tags")?
                .iter()
                .map(row_to_tag_sqlite)
                .collect(),
            Backend::Mysql(p) => sqlx::query(SQL)
                .fetch_all(p)
                .await
                .context("Failed to list tags")?
                .iter()
                .map(row_to_tag_mysql)
                .collect(),
        }
    }

    async fn existing_ids(&self, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT id FROM tags WHERE id IN ({})", placeholders(ids.len()));
        match self.pool.backend() {
            Backend::Sqlite(p) => {
                let mut query = sqlx::query_scalar::<_, i64>(&sql);
                for id in ids {
                    query = query.bind(*id);
                }
                query.fetch_all(p).await.context("Failed to check tag ids")
            }
            Backend::Mysql(p) => {
                let mut query = sqlx::query_scalar::<_, i64>(&sql);
                for id in ids {
                    query = query.bind(*id);
                }
                query.fetch_all(p).await.context("Failed to check tag ids")
            }
        }
    }

    async fn get_by_recipe(&self, recipe_id: i64) -> Result<Vec<Tag>> {
        const SQL: &str = r#"
            SELECT t.id, t.name, t.slug
            FROM tags t
            INNER JOIN recipe_tags rt ON rt.tag_id = t.id
            WHERE rt.recipe_id = ?
            ORDER BY t.name
        "#;
        match self.pool.backend() {
            Backend::Sqlite(p) => sqlx::query(SQL)
                .bind(recipe_id)
                .fetch_all(p)
                .await
                .context("Failed to get recipe tags")?
                .iter()
                .map(row_to_tag_sqlite)
                .collect(),
            Backend::Mysql(p) => sqlx::query(SQL)
                .bind(recipe_id)
                .fetch_all(p)
                .await
                .context("Failed to get recipe tags")?
                .iter()
                .map(row_to_tag_mysql)
                .collect(),
        }
    }

    async fn insert_missing(&self, tags: &[NewTag]) -> Result<u64> {
        match self.pool.backend() {
            Backend::Sqlite(p) => insert_missing_sqlite(p, tags).await,
            Backend::Mysql(p) => insert_missing_mysql(p, tags).await,
        }
    }
}

async fn insert_missing_sqlite(pool: &SqlitePool, tags: &[NewTag]) -> Result<u64> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;
    let mut inserted = 0;
    for tag in tags {
        let result = sqlx::query("INSERT OR IGNORE INTO tags (name, slug) VALUES (?, ?)")
            .bind(&tag.name)
            .bind(&tag.slug)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert tag {}", tag.slug))?;
        inserted += result.rows_affected();
    }
    tx.commit().await.context("Failed to commit tags")?;
    Ok(inserted)
}

async fn insert_missing_mysql(pool: &MySqlPool, tags: &[NewTag]) -> Result<u64> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;
    let mut inserted = 0;
    for tag in tags {
        let result = sqlx::query("INSERT IGNORE INTO tags (name, slug) VALUES (?, ?)")
            .bind(&tag.name)
            .bind(&tag.slug)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert tag {}", tag.slug))?;
        inserted += result.rows_affected();
    }
    tx.commit().await.context("Failed to commit tags")?;
    Ok(inserted)
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Tag> {
    Ok(Tag {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
    })
}

fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Tag> {
    Ok(Tag {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxTagRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxTagRepository::new(pool)
    }

    fn new_tag(name: &str, slug: &str) -> NewTag {
        NewTag {
            name: name.to_string(),
            slug: slug.to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_missing_skips_existing() {
        let repo = setup_test_repo().await;

        let added = repo
            .insert_missing(&[new_tag("Lunch", "lunch"), new_tag("Breakfast", "breakfast")])
            .await
            .unwrap();
        assert_eq!(added, 2);

        let added = repo
            .insert_missing(&[new_tag("Lunch", "lunch"), new_tag("Dinner", "dinner")])
            .await
            .unwrap();
        assert_eq!(added, 1);

        let names: Vec<_> = repo.list().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Breakfast", "Dinner", "Lunch"]);
    }

    #[tokio::test]
    async fn test_get_by_id_and_existing_ids() {
        let repo = setup_test_repo().await;
        repo.insert_missing(&[new_tag("Lunch", "lunch")]).await.unwrap();
        let lunch = repo.list().await.unwrap().remove(0);

        assert_eq!(repo.get_by_id(lunch.id).await.unwrap(), Some(lunch.clone()));
        assert!(repo.get_by_id(lunch.id + 100).await.unwrap().is_none());

        let existing = repo.existing_ids(&[lunch.id, lunch.id + 100]).await.unwrap();
        assert_eq!(existing, vec![lunch.id]);
        assert!(repo.existing_ids(&[]).await.unwrap().is_empty());
    }
}
