//! Subscription service
//!
//! Following authors and listing followed authors with a preview of their
//! recipes.

use std::sync::Arc;

use crate::db::is_unique_violation;
use crate::db::repositories::{RecipeRepository, SubscriptionRepository, UserRepository};
use crate::models::{ListParams, PagedResult, Recipe, User, RECIPES_PREVIEW_LIMIT};

/// Error types for subscription service operations
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionServiceError {
    #[error("User not found: {0}")]
    NotFound(i64),

    /// Self-subscription, duplicates and removing a missing subscription
    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// A followed author with a capped preview of their recipes
#[derive(Debug, Clone)]
pub struct AuthorSummary {
    pub author: User,
    pub recipes: Vec<Recipe>,
    pub recipes_count: i64,
}

pub struct SubscriptionService {
    subscription_repo: Arc<dyn SubscriptionRepository>,
    user_repo: Arc<dyn UserRepository>,
    recipe_repo: Arc<dyn RecipeRepository>,
}

impl SubscriptionService {
    pub fn new(
        subscription_repo: Arc<dyn SubscriptionRepository>,
        user_repo: Arc<dyn UserRepository>,
        recipe_repo: Arc<dyn RecipeRepository>,
    ) -> Self {
        Self {
            subscription_repo,
            user_repo,
            recipe_repo,
        }
    }

    /// Follow `author_id`
    pub async fn subscribe(
        &self,
        follower: &User,
        author_id: i64,
        recipes_limit: Option<usize>,
    ) -> Result<AuthorSummary, SubscriptionServiceError> {
        let author = self.require_user(author_id).await?;
        let duplicate =
            || SubscriptionServiceError::Conflict("Already subscribed to this user".to_string());

        if author.id == follower.id {
            return Err(SubscriptionServiceError::Conflict(
                "You cannot subscribe to yourself".to_string(),
            ));
        }
        if self.subscription_repo.exists(follower.id, author.id).await? {
            tracing::debug!("User {} already follows {}", follower.id, author.id);
            return Err(duplicate());
        }

        match self.subscription_repo.create(follower.id, author.id).await {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Err(duplicate()),
            Err(e) => return Err(e.into()),
        }

        tracing::info!("User {} subscribed to {}", follower.id, author.id);
        self.summary(author, recipes_limit).await
    }

    /// Stop following `author_id`
    pub async fn unsubscribe(
        &self,
        follower: &User,
        author_id: i64,
    ) -> Result<(), SubscriptionServiceError> {
        let author = self.require_user(author_id).await?;

        if !self.subscription_repo.delete(follower.id, author.id).await? {
            return Err(SubscriptionServiceError::Conflict(
                "You are not subscribed to this user".to_string(),
            ));
        }

        tracing::info!("User {} unsubscribed from {}", follower.id, author.id);
        Ok(())
    }

    /// Authors followed by `follower`, ordered by username
    pub async fn list(
        &self,
        follower: &User,
        params: &ListParams,
        recipes_limit: Option<usize>,
    ) -> Result<PagedResult<AuthorSummary>, SubscriptionServiceError> {
        let (authors, total) = self
            .subscription_repo
            .list_authors(follower.id, params)
            .await?;

        let mut items = Vec::with_capacity(authors.len());
        for author in authors {
            items.push(self.summary(author, recipes_limit).await?);
        }
        Ok(PagedResult::new(items, total, params))
    }

    /// Whether `viewer` follows `author_id`; anonymous viewers follow nobody
    pub async fn is_subscribed(
        &self,
        viewer: Option<&User>,
        author_id: i64,
    ) -> Result<bool, SubscriptionServiceError> {
        match viewer {
            Some(viewer) => Ok(self.subscription_repo.exists(viewer.id, author_id).await?),
            None => Ok(false),
        }
    }

    async fn require_user(&self, id: i64) -> Result<User, SubscriptionServiceError> {
        self.user_repo
            .get_by_id(id)
            .await?
            .ok_or(SubscriptionServiceError::NotFound(id))
    }

    async fn summary(
        &self,
        author: User,
        recipes_limit: Option<usize>,
    ) -> Result<AuthorSummary, SubscriptionServiceError> {
        let limit =
            i64::try_from(recipes_limit.unwrap_or(RECIPES_PREVIEW_LIMIT)).unwrap_or(i64::MAX);
        let recipes = self
            .recipe_repo
            .list_by_author(author.id, Some(limit))
            .await?;
        let recipes_count = self.recipe_repo.count_by_author(author.id).await?;

        Ok(AuthorSummary {
            author,
            recipes,
            recipes_count,
        })
    }
}
