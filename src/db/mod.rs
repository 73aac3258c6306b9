//! Database layer
//!
//! SQLite (default) and MySQL are supported behind the [`DatabasePool`]
//! trait. Repositories live in [`repositories`]; the schema is created by
//! [`migrations::run_migrations`].

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, is_unique_violation, Backend, DatabasePool, DynDatabasePool,
    MysqlDatabase, SqliteDatabase,
};
