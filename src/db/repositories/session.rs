//! Session repository
//!
//! Persistence for auth tokens.

use crate::db::{Backend, DynDatabasePool};
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &Session) -> Result<()>;

    /// Get session by token
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete all sessions for a user
    async fn delete_by_user(&self, user_id: i64) -> Result<u64>;

    /// Delete expired sessions, returning how many were removed
    async fn delete_expired(&self) -> Result<u64>;
}

/// SQLx-based session repository implementation
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<()> {
        const SQL: &str =
            "INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)";
        let result = match self.pool.backend() {
            Backend::Sqlite(p) => sqlx::query(SQL)
                .bind(&session.id)
                .bind(session.user_id)
                .bind(session.expires_at)
                .bind(session.created_at)
                .execute(p)
                .await
                .map(|_| ()),
            Backend::Mysql(p) => sqlx::query(SQL)
                .bind(&session.id)
                .bind(session.user_id)
                .bind(session.expires_at)
                .bind(session.created_at)
                .execute(p)
                .await
                .map(|_| ()),
        };
        result.context("Failed to create session")
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        const SQL: &str =
            "SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = ?";
        match self.pool.backend() {
            Backend::Sqlite(p) => {
                let row = sqlx::query(SQL)
                    .bind(id)
                    .fetch_optional(p)
                    .await
                    .context("Failed to get session")?;
                row.as_ref().map(row_to_session_sqlite).transpose()
            }
            Backend::Mysql(p) => {
                let row = sqlx::query(SQL)
                    .bind(id)
                    .fetch_optional(p)
                    .await
                    .context("Failed to get session")?;
                row.as_ref().map(row_to_session_mysql).transpose()
            }
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        const SQL: &str = "DELETE FROM sessions WHERE id = ?";
        let result = match self.pool.backend() {
            Backend::Sqlite(p) => sqlx::query(SQL).bind(id).execute(p).await.map(|_| ()),
            Backend::Mysql(p) => sqlx::query(SQL).bind(id).execute(p).await.map(|_| ()),
        };
        result.context("Failed to delete session")
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<u64> {
        const SQL: &str = "DELETE FROM sessions WHERE user_id = ?";
        let result = match self.pool.backend() {
            Backend::Sqlite(p) => sqlx::query(SQL)
                .bind(user_id)
                .execute(p)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(p) => sqlx::query(SQL)
                .bind(user_id)
                .execute(p)
                .await
                .map(|r| r.rows_affected()),
        };
        result.context("Failed to delete user sessions")
    }

    async fn delete_expired(&self) -> Result<u64> {
        const SQL: &str = "DELETE FROM sessions WHERE expires_at < ?";
        let now = Utc::now();
        let result = match self.pool.backend() {
            Backend::Sqlite(p) => sqlx::query(SQL)
                .bind(now)
                .execute(p)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(p) => sqlx::query(SQL)
                .bind(now)
                .execute(p)
                .await
                .map(|r| r.rows_affected()),
        };
        result.context("Failed to delete expired sessions")
    }
}

fn row_to_session_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Session> {
    Ok(Session {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        expires_at: row.try_get("expires_at")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_session_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Session> {
    Ok(Session {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        expires_at: row.try_get("expires_at")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::User;
    use chrono::Duration;

    async fn setup() -> (SqlxSessionRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user = SqlxUserRepository::new(pool.clone())
            .create(&User::new(
                "s@example.com".to_string(),
                "sess".to_string(),
                "S".to_string(),
                "T".to_string(),
                "hash".to_string(),
            ))
            .await
            .expect("Failed to create user");

        (SqlxSessionRepository::new(pool), user.id)
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let (repo, user_id) = setup().await;
        let session = Session::issue(user_id, 7);

        repo.create(&session).await.expect("Failed to create session");

        let stored = repo.get_by_id(&session.id).await.unwrap().expect("Session should exist");
        assert_eq!(stored.user_id, user_id);
        assert!(!stored.is_expired());

        repo.delete(&session.id).await.unwrap();
        assert!(repo.get_by_id(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_by_user() {
        let (repo, user_id) = setup().await;
        repo.create(&Session::issue(user_id, 7)).await.unwrap();
        repo.create(&Session::issue(user_id, 7)).await.unwrap();

        assert_eq!(repo.delete_by_user(user_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_expired_keeps_live_sessions() {
        let (repo, user_id) = setup().await;

        let live = Session::issue(user_id, 7);
        let mut stale = Session::issue(user_id, 7);
        stale.expires_at = Utc::now() - Duration::hours(1);

        repo.create(&live).await.unwrap();
        repo.create(&stale).await.unwrap();

        assert_eq!(repo.delete_expired().await.unwrap(), 1);
        assert!(repo.get_by_id(&live.id).await.unwrap().is_some());
        assert!(repo.get_by_id(&stale.id).await.unwrap().is_none());
    }
}
