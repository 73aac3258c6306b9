//! Subscription repository
//!
//! Follower → author pairs. The pair is unique at the table level; the
//! follower ≠ author rule is enforced by the service.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{ListParams, Subscription, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// Subscription repository trait
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Create a subscription. A duplicate pair fails with a unique violation.
    async fn create(&self, follower_id: i64, author_id: i64) -> Result<Subscription>;

    /// Delete a subscription, returning false if none existed
    async fn delete(&self, follower_id: i64, author_id: i64) -> Result<bool>;

    async fn exists(&self, follower_id: i64, author_id: i64) -> Result<bool>;

    /// Authors followed by `follower_id`, ordered by username, with the total
    async fn list_authors(&self, follower_id: i64, params: &ListParams) -> Result<(Vec<User>, i64)>;
}

/// SQLx-based subscription repository implementation
pub struct SqlxSubscriptionRepository {
    pool: DynDatabasePool,
}

impl SqlxSubscriptionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SubscriptionRepository> {
        Arc::new(Self::new(pool))
    }
}

const AUTHORS_SQL: &str = r#"
    SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.password_hash,
           u.avatar, u.created_at
    FROM subscriptions s
    INNER JOIN users u ON u.id = s.author_id
    WHERE s.follower_id = ?
    ORDER BY u.username
    LIMIT ? OFFSET ?
"#;

#[async_trait]
impl SubscriptionRepository for SqlxSubscriptionRepository {
    async fn create(&self, follower_id: i64, author_id: i64) -> Result<Subscription> {
        const SQL: &str = "INSERT INTO subscriptions (follower_id, author_id) VALUES (?, ?)";
        let id = match self.pool.backend() {
            Backend::Sqlite(p) => sqlx::query(SQL)
                .bind(follower_id)
                .bind(author_id)
                .execute(p)
                .await
                .context("Failed to create subscription")?
                .last_insert_rowid(),
            Backend::Mysql(p) => sqlx::query(SQL)
                .bind(follower_id)
                .bind(author_id)
                .execute(p)
                .await
                .context("Failed to create subscription")?
                .last_insert_id() as i64,
        };
        Ok(Subscription {
            id,
            follower_id,
            author_id,
        })
    }

    async fn delete(&self, follower_id: i64, author_id: i64) -> Result<bool> {
        const SQL: &str = "DELETE FROM subscriptions WHERE follower_id = ? AND author_id = ?";
        let result = match self.pool.backend() {
            Backend::Sqlite(p) => sqlx::query(SQL)
                .bind(follower_id)
                .bind(author_id)
                .execute(p)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(p) => sqlx::query(SQL)
                .bind(follower_id)
                .bind(author_id)
                .execute(p)
                .await
                .map(|r| r.rows_affected()),
        };
        Ok(result.context("Failed to delete subscription")? > 0)
    }

    async fn exists(&self, follower_id: i64, author_id: i64) -> Result<bool> {
        const SQL: &str =
            "SELECT COUNT(*) FROM subscriptions WHERE follower_id = ? AND author_id = ?";
        let result = match self.pool.backend() {
            Backend::Sqlite(p) => sqlx::query_scalar::<_, i64>(SQL)
                .bind(follower_id)
                .bind(author_id)
                .fetch_one(p)
                .await,
            Backend::Mysql(p) => sqlx::query_scalar::<_, i64>(SQL)
                .bind(follower_id)
                .bind(author_id)
                .fetch_one(p)
                .await,
        };
        Ok(result.context("Failed to check subscription")? > 0)
    }

    async fn list_authors(&self, follower_id: i64, params: &ListParams) -> Result<(Vec<User>, i64)> {
        const COUNT_SQL: &str = "SELECT COUNT(*) FROM subscriptions WHERE follower_id = ?";
        match self.pool.backend() {
            Backend::Sqlite(p) => {
                let total: i64 = sqlx::query_scalar(COUNT_SQL)
                    .bind(follower_id)
                    .fetch_one(p)
                    .await
                    .context("Failed to count subscriptions")?;
                let rows = sqlx::query(AUTHORS_SQL)
                    .bind(follower_id)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(p)
                    .await
                    .context("Failed to list subscriptions")?;
                let authors = rows
                    .iter()
                    .map(|row| {
                        Ok(User {
                            id: row.try_get("id")?,
                            email: row.try_get("email")?,
                            username: row.try_get("username")?,
                            first_name: row.try_get("first_name")?,
                            last_name: row.try_get("last_name")?,
                            password_hash: row.try_get("password_hash")?,
                            avatar: row.try_get("avatar")?,
                            created_at: row.try_get("created_at")?,
                        })
                    })
                    .collect::<Result<_, sqlx::Error>>()
                    .context("Failed to decode subscribed authors")?;
                Ok((authors, total))
            }
            Backend::Mysql(p) => {
                let total: i64 = sqlx::query_scalar(COUNT_SQL)
                    .bind(follower_id)
                    .fetch_one(p)
                    .await
                    .context("Failed to count subscriptions")?;
                let rows = sqlx::query(AUTHORS_SQL)
                    .bind(follower_id)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(p)
                    .await
                    .context("Failed to list subscriptions")?;
                let authors = rows
                    .iter()
                    .map(|row| {
                        Ok(User {
                            id: row.try_get("id")?,
                            email: row.try_get("email")?,
                            username: row.try_get("username")?,
                            first_name: row.try_get("first_name")?,
                            last_name: row.try_get("last_name")?,
                            password_hash: row.try_get("password_hash")?,
                            avatar: row.try_get("avatar")?,
                            created_at: row.try_get("created_at")?,
                        })
                    })
                    .collect::<Result<_, sqlx::Error>>()
                    .context("Failed to decode subscribed authors")?;
                Ok((authors, total))
            }
        }
    }
}
