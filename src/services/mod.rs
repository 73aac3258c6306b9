//! Services layer - Business logic
//!
//! Services validate input, enforce ownership and uniqueness rules and
//! coordinate repositories and media storage. Handlers call services only.

pub mod ingredient;
pub mod media;
pub mod password;
pub mod recipe;
pub mod shopping_list;
pub mod subscription;
pub mod tag;
pub mod user;
pub mod validation;

pub use ingredient::{IngredientService, IngredientServiceError};
pub use media::{MediaError, MediaStorage};
pub use password::{hash_password, verify_password};
pub use recipe::{
    IngredientInput, RecipeDetails, RecipeInput, RecipeService, RecipeServiceError,
};
pub use shopping_list::{render_csv, SHOPPING_LIST_FILENAME};
pub use subscription::{AuthorSummary, SubscriptionService, SubscriptionServiceError};
pub use tag::{TagService, TagServiceError};
pub use user::{UserService, UserServiceError};
pub use validation::FieldErrors;
