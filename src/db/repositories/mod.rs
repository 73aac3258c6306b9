//! Database repositories
//!
//! One repository per aggregate. Each exposes an `async_trait` interface and
//! a `Sqlx*` implementation that dispatches on the configured driver.

pub mod ingredient;
pub mod recipe;
pub mod recipe_list;
pub mod session;
pub mod subscription;
pub mod tag;
pub mod user;

pub use ingredient::{IngredientRepository, SqlxIngredientRepository};
pub use recipe::{RecipeRepository, SqlxRecipeRepository};
pub use recipe_list::{RecipeListRepository, SqlxRecipeListRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use subscription::{SqlxSubscriptionRepository, SubscriptionRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use user::{SqlxUserRepository, UserRepository};

/// `?, ?, ?` with `n` placeholders
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Escape `LIKE` wildcards using `!` as the escape character
pub(crate) fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '!' | '%' | '_') {
            escaped.push('!');
        }
        escaped.push(c);
    }
    escaped
}
