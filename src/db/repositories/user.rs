//! User repository
//!
//! Database operations for user accounts.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{ListParams, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user and return it with its id
    async fn create(&self, user: &User) -> Result<User>;

    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// True when either the email or the username is already taken
    async fn exists_by_email_or_username(&self, email: &str, username: &str) -> Result<bool>;

    /// List users ordered by username, with the total count
    async fn list(&self, params: &ListParams) -> Result<(Vec<User>, i64)>;

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()>;

    /// Set or clear the avatar path
    async fn update_avatar(&self, id: i64, avatar: Option<&str>) -> Result<()>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

const USER_COLUMNS: &str =
    "id, email, username, first_name, last_name, password_hash, avatar, created_at";

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let id = match self.pool.backend() {
            Backend::Sqlite(p) => create_user_sqlite(p, user).await?,
            Backend::Mysql(p) => create_user_mysql(p, user).await?,
        };
        Ok(User {
            id,
            ..user.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        match self.pool.backend() {
            Backend::Sqlite(p) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(p)
                    .await
                    .context("Failed to get user by ID")?;
                row.as_ref().map(row_to_user_sqlite).transpose()
            }
            Backend::Mysql(p) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(p)
                    .await
                    .context("Failed to get user by ID")?;
                row.as_ref().map(row_to_user_mysql).transpose()
            }
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
        match self.pool.backend() {
            Backend::Sqlite(p) => {
                let row = sqlx::query(&sql)
                    .bind(email)
                    .fetch_optional(p)
                    .await
                    .context("Failed to get user by email")?;
                row.as_ref().map(row_to_user_sqlite).transpose()
            }
            Backend::Mysql(p) => {
                let row = sqlx::query(&sql)
                    .bind(email)
                    .fetch_optional(p)
                    .await
                    .context("Failed to get user by email")?;
                row.as_ref().map(row_to_user_mysql).transpose()
            }
        }
    }

    async fn exists_by_email_or_username(&self, email: &str, username: &str) -> Result<bool> {
        const SQL: &str =
            "SELECT COUNT(*) AS cnt FROM users WHERE email = ? OR username = ?";
        let count: i64 = match self.pool.backend() {
            Backend::Sqlite(p) => sqlx::query(SQL)
                .bind(email)
                .bind(username)
                .fetch_one(p)
                .await
                .context("Failed to check user existence")?
                .get("cnt"),
            Backend::Mysql(p) => sqlx::query(SQL)
                .bind(email)
                .bind(username)
                .fetch_one(p)
                .await
                .context("Failed to check user existence")?
                .get("cnt"),
        };
        Ok(count > 0)
    }

    async fn list(&self, params: &ListParams) -> Result<(Vec<User>, i64)> {
        match self.pool.backend() {
            Backend::Sqlite(p) => list_users_sqlite(p, params).await,
            Backend::Mysql(p) => list_users_mysql(p, params).await,
        }
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()> {
        const SQL: &str = "UPDATE users SET password_hash = ? WHERE id = ?";
        let result = match self.pool.backend() {
            Backend::Sqlite(p) => sqlx::query(SQL).bind(password_hash).bind(id).execute(p).await.map(|_| ()),
            Backend::Mysql(p) => sqlx::query(SQL).bind(password_hash).bind(id).execute(p).await.map(|_| ()),
        };
        result.context("Failed to update password")
    }

    async fn update_avatar(&self, id: i64, avatar: Option<&str>) -> Result<()> {
        const SQL: &str = "UPDATE users SET avatar = ? WHERE id = ?";
        let result = match self.pool.backend() {
            Backend::Sqlite(p) => sqlx::query(SQL).bind(avatar).bind(id).execute(p).await.map(|_| ()),
            Backend::Mysql(p) => sqlx::query(SQL).bind(avatar).bind(id).execute(p).await.map(|_| ()),
        };
        result.context("Failed to update avatar")
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (email, username, first_name, last_name, password_hash, avatar, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password_hash)
    .bind(&user.avatar)
    .bind(user.created_at)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(result.last_insert_rowid())
}

async fn list_users_sqlite(pool: &SqlitePool, params: &ListParams) -> Result<(Vec<User>, i64)> {
    let total: i64 = sqlx::query("SELECT COUNT(*) AS cnt FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?
        .get("cnt");

    let rows = sqlx::query(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY username LIMIT ? OFFSET ?"
    ))
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(pool)
    .await
    .context("Failed to list users")?;

    let users = rows.iter().map(row_to_user_sqlite).collect::<Result<_>>()?;
    Ok((users, total))
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
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
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (email, username, first_name, last_name, password_hash, avatar, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password_hash)
    .bind(&user.avatar)
    .bind(user.created_at)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(result.last_insert_id() as i64)
}

async fn list_users_mysql(pool: &MySqlPool, params: &ListParams) -> Result<(Vec<User>, i64)> {
    let total: i64 = sqlx::query("SELECT COUNT(*) AS cnt FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?
        .get("cnt");

    let rows = sqlx::query(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY username LIMIT ? OFFSET ?"
    ))
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(pool)
    .await
    .context("Failed to list users")?;

    let users = rows.iter().map(row_to_user_mysql).collect::<Result<_>>()?;
    Ok((users, total))
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, is_unique_violation, migrations};

    async fn setup_test_repo() -> SqlxUserRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxUserRepository::new(pool)
    }

    fn test_user(name: &str) -> User {
        User::new(
            format!("{name}@example.com"),
            name.to_string(),
            "First".to_string(),
            "Last".to_string(),
            "hash".to_string(),
        )
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = setup_test_repo().await;

        let created = repo.create(&test_user("alice")).await.expect("Failed to create");
        assert!(created.id > 0);

        let by_id = repo.get_by_id(created.id).await.unwrap().expect("User should exist");
        assert_eq!(by_id.username, "alice");
        assert!(by_id.avatar.is_none());

        let by_email = repo.get_by_email("alice@example.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(created.id));

        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_unique_violation() {
        let repo = setup_test_repo().await;
        repo.create(&test_user("bob")).await.unwrap();

        let mut dup = test_user("bob");
        dup.email = "other@example.com".to_string();
        let err = repo.create(&dup).await.unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_exists_by_email_or_username() {
        let repo = setup_test_repo().await;
        repo.create(&test_user("carol")).await.unwrap();

        assert!(repo.exists_by_email_or_username("carol@example.com", "x").await.unwrap());
        assert!(repo.exists_by_email_or_username("x@example.com", "carol").await.unwrap());
        assert!(!repo.exists_by_email_or_username("x@example.com", "x").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_ordered_by_username() {
        let repo = setup_test_repo().await;
        for name in ["zed", "amy", "max"] {
            repo.create(&test_user(name)).await.unwrap();
        }

        let (users, total) = repo.list(&ListParams::new(1, 2)).await.unwrap();
        assert_eq!(total, 3);
        let names: Vec<_> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["amy", "max"]);
    }

    #[tokio::test]
    async fn test_update_password_and_avatar() {
        let repo = setup_test_repo().await;
        let user = repo.create(&test_user("dan")).await.unwrap();

        repo.update_password(user.id, "new-hash").await.unwrap();
        repo.update_avatar(user.id, Some("avatars/a.png")).await.unwrap();

        let stored = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "new-hash");
        assert_eq!(stored.avatar.as_deref(), Some("avatars/a.png"));

        repo.update_avatar(user.id, None).await.unwrap();
        let stored = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.avatar.is_none());
    }
}
