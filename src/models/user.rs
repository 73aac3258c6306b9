//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of a username
pub const USERNAME_MAX_LEN: usize = 150;
/// Maximum length of a first or last name
pub const PERSON_NAME_MAX_LEN: usize = 150;
/// Maximum length of an email address
pub const EMAIL_MAX_LEN: usize = 254;
/// Minimum length of a plaintext password
pub const PASSWORD_MIN_LEN: usize = 8;

/// A registered account.
///
/// `avatar` holds a path relative to the media root; the API layer turns it
/// into an absolute URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Password hash (argon2 PHC string)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build an unsaved user. The password must already be hashed.
    pub fn new(
        email: String,
        username: String,
        first_name: String,
        last_name: String,
        password_hash: String,
    ) -> Self {
        Self {
            id: 0,
            email,
            username,
            first_name,
            last_name,
            password_hash,
            avatar: None,
            created_at: Utc::now(),
        }
    }
}

/// Registration payload (before password hashing)
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserInput {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}
