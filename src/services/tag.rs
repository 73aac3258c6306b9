//! Tag service
//!
//! Tags are read-only through the API; they are seeded by the loader binary.

use crate::db::repositories::TagRepository;
use crate::models::{NewTag, Tag, TAG_MAX_LEN};
use std::sync::Arc;

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    #[error("Tag not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct TagService {
    repo: Arc<dyn TagRepository>,
}

impl TagService {
    pub fn new(repo: Arc<dyn TagRepository>) -> Self {
        Self { repo }
    }

    /// All tags ordered by name
    pub async fn list(&self) -> Result<Vec<Tag>, TagServiceError> {
        Ok(self.repo.list().await?)
    }

    pub async fn get(&self, id: i64) -> Result<Tag, TagServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or(TagServiceError::NotFound(id))
    }

    /// Insert tags whose name and slug are not taken yet.
    ///
    /// Returns the number of rows actually inserted.
    pub async fn import(&self, tags: &[NewTag]) -> Result<u64, TagServiceError> {
        for tag in tags {
            if tag.name.trim().is_empty() || tag.slug.trim().is_empty() {
                return Err(TagServiceError::ValidationError(
                    "Tag name and slug must not be empty".to_string(),
                ));
            }
            if tag.name.chars().count() > TAG_MAX_LEN || tag.slug.chars().count() > TAG_MAX_LEN {
                return Err(TagServiceError::ValidationError(format!(
                    "Tag '{}' exceeds {} characters",
                    tag.name, TAG_MAX_LEN
                )));
            }
        }

        let inserted = self.repo.insert_missing(tags).await?;
        tracing::info!("Imported {} of {} tags", inserted, tags.len());
        Ok(inserted)
    }
}
