//! Subscription model

use serde::{Deserialize, Serialize};

/// Default number of recipes previewed per followed author
pub const RECIPES_PREVIEW_LIMIT: usize = 3;

/// `follower` follows `author`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub follower_id: i64,
    pub author_id: i64,
}
