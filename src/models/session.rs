//! Session model
//!
//! A session is the persisted form of an auth token.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Auth token bound to a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Token value presented in the `Authorization` header
    pub id: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Issue a fresh random token for `user_id` valid for `ttl_days`
    pub fn issue(user_id: i64, ttl_days: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().simple().to_string(),
            user_id,
            expires_at: now + Duration::days(ttl_days),
            created_at: now,
        }
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}
