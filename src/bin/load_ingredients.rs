//! CLI tool to seed ingredients (and optionally tags) from JSON fixtures.
//!
//! Usage: `load-ingredients <ingredients.json> [--tags <tags.json>]`
//!
//! The ingredient file holds `[{"name": ..., "measurement_unit": ...}]`,
//! the tag file `[{"name": ..., "slug": ...}]`. Existing names are skipped.

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use foodgram::{
    config::Config,
    db::{
        self,
        repositories::{SqlxIngredientRepository, SqlxTagRepository},
    },
    models::{NewIngredient, NewTag},
    services::{IngredientService, TagService},
};

const USAGE: &str = "usage: load-ingredients <ingredients.json> [--tags <tags.json>]";

#[derive(Debug, PartialEq, Eq)]
struct Args {
    ingredients: PathBuf,
    tags: Option<PathBuf>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut ingredients = None;
    let mut tags = None;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--tags" => match args.next() {
                Some(path) => tags = Some(PathBuf::from(path)),
                None => bail!("--tags needs a file\n{}", USAGE),
            },
            "-h" | "--help" => bail!("{}", USAGE),
            other if other.starts_with("--") => bail!("unknown option {}\n{}", other, USAGE),
            other => {
                if ingredients.is_some() {
                    bail!("unexpected argument {}\n{}", other, USAGE);
                }
                ingredients = Some(PathBuf::from(other));
            }
        }
    }

    match ingredients {
        Some(ingredients) => Ok(Args { ingredients, tags }),
        None => bail!("{}", USAGE),
    }
}

fn read_fixture<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foodgram=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    let config = Config::load_with_env(Path::new("config.yml"))?;

    let pool = db::create_pool(&config.database).await?;
    db::migrations::run_migrations(&pool).await?;

    let ingredients: Vec<NewIngredient> = read_fixture(&args.ingredients)?;
    let service = IngredientService::new(SqlxIngredientRepository::boxed(pool.clone()));
    let inserted = service.import(&ingredients).await?;
    println!(
        "Loaded {} ingredients ({} already present)",
        inserted,
        ingredients.len() as u64 - inserted
    );

    if let Some(path) = &args.tags {
        let tags: Vec<NewTag> = read_fixture(path)?;
        let service = TagService::new(SqlxTagRepository::boxed(pool.clone()));
        let inserted = service.import(&tags).await?;
        println!(
            "Loaded {} tags ({} already present)",
            inserted,
            tags.len() as u64 - inserted
        );
    }

    pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Result<Args> {
        parse_args(raw.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_ingredients_only() {
        assert_eq!(
            args(&["data/ingredients.json"]).unwrap(),
            Args {
                ingredients: PathBuf::from("data/ingredients.json"),
                tags: None,
            }
        );
    }

    #[test]
    fn test_parse_with_tags_in_any_order() {
        let parsed = args(&["--tags", "tags.json", "ingredients.json"]).unwrap();
        assert_eq!(parsed.tags, Some(PathBuf::from("tags.json")));
        assert_eq!(parsed.ingredients, PathBuf::from("ingredients.json"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(args(&[]).is_err());
        assert!(args(&["a.json", "b.json"]).is_err());
        assert!(args(&["a.json", "--tags"]).is_err());
        assert!(args(&["--verbose", "a.json"]).is_err());
    }

    #[test]
    fn test_read_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ingredients.json");
        std::fs::write(
            &path,
            r#"[{"name": "salt", "measurement_unit": "g"}, {"name": "milk", "measurement_unit": "ml"}]"#,
        )
        .unwrap();

        let items: Vec<NewIngredient> = read_fixture(&path).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].measurement_unit, "ml");

        assert!(read_fixture::<NewIngredient>(&dir.path().join("missing.json")).is_err());
    }
}
