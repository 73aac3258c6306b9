//! Tag model

use serde::{Deserialize, Serialize};

/// Maximum length of a tag name and slug
pub const TAG_MAX_LEN: usize = 32;

/// Recipe tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// Tag as read from a fixture file
#[derive(Debug, Clone, Deserialize)]
pub struct NewTag {
    pub name: String,
    pub slug: String,
}
