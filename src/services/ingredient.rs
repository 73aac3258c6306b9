//! Ingredient service

use crate::db::repositories::IngredientRepository;
use crate::models::{
    Ingredient, NewIngredient, INGREDIENT_NAME_MAX_LEN, MEASUREMENT_UNIT_MAX_LEN,
};
use std::sync::Arc;

/// Error types for ingredient service operations
#[derive(Debug, thiserror::Error)]
pub enum IngredientServiceError {
    #[error("Ingredient not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct IngredientService {
    repo: Arc<dyn IngredientRepository>,
}

impl IngredientService {
    pub fn new(repo: Arc<dyn IngredientRepository>) -> Self {
        Self { repo }
    }

    /// Ingredients ordered by name, optionally restricted to a
    /// case-insensitive name prefix. A blank prefix lists everything.
    pub async fn search(&self, prefix: Option<&str>) -> Result<Vec<Ingredient>, IngredientServiceError> {
        let prefix = prefix.map(str::trim).filter(|p| !p.is_empty());
        Ok(self.repo.list(prefix).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Ingredient, IngredientServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or(IngredientServiceError::NotFound(id))
    }

    /// Bulk insert, skipping names that already exist
    pub async fn import(&self, items: &[NewIngredient]) -> Result<u64, IngredientServiceError> {
        for item in items {
            if item.name.trim().is_empty() || item.measurement_unit.trim().is_empty() {
                return Err(IngredientServiceError::ValidationError(
                    "Ingredient name and measurement unit must not be empty".to_string(),
                ));
            }
            if item.name.chars().count() > INGREDIENT_NAME_MAX_LEN
                || item.measurement_unit.chars().count() > MEASUREMENT_UNIT_MAX_LEN
            {
                return Err(IngredientServiceError::ValidationError(format!(
                    "Ingredient '{}' exceeds the allowed length",
                    item.name
                )));
            }
        }

        let inserted = self.repo.insert_missing(items).await?;
        tracing::info!("Imported {} of {} ingredients", inserted, items.len());
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxIngredientRepository;
    use crate::db::{create_test_pool, migrations};

    async fn seeded_service(names: &[&str]) -> IngredientService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let service = IngredientService::new(SqlxIngredientRepository::boxed(pool));

        let items: Vec<_> = names
            .iter()
            .map(|name| NewIngredient {
                name: name.to_string(),
                measurement_unit: "g".to_string(),
            })
            .collect();
        service.import(&items).await.unwrap();
        service
    }

    #[tokio::test]
    async fn test_search_is_prefix_only() {
        let service = seeded_service(&["Tomato", "Potato", "tofu"]).await;

        let names: Vec<_> = service
            .search(Some("to"))
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["Tomato", "tofu"]);
    }

    #[tokio::test]
    async fn test_blank_search_lists_all() {
        let service = seeded_service(&["b", "a"]).await;
        assert_eq!(service.search(Some("  ")).await.unwrap().len(), 2);
        assert_eq!(service.search(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_import_is_idempotent() {
        let service = seeded_service(&["salt"]).await;
        let again = service
            .import(&[NewIngredient {
                name: "salt".to_string(),
                measurement_unit: "g".to_string(),
            }])
            .await
            .unwrap();
        assert_eq!(again, 0);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let service = seeded_service(&[]).await;
        assert!(matches!(
            service.get(42).await,
            Err(IngredientServiceError::NotFound(42))
        ));
    }
}
