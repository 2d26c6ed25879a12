//! SQLite storage backend for the checkout engine.
//!
//! [`SqliteDatabase`] implements [`crate::traits::Catalog`], [`crate::traits::PriceMappings`] and
//! [`crate::traits::OrderStore`]. The SQL itself lives in the free functions of the [`db`] module.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;

/// The embedded schema migrations. Run them against a fresh pool with `MIGRATOR.run(db.pool())`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./src/sqlite/migrations");
