//! Content backend for a single-tenant school website.
//!
//! Site settings, the home-page carousel and operator accounts live in PostgreSQL when it
//! is reachable at startup and in an embedded SQLite file otherwise. Every store talks to
//! one [`db::Database`] façade, so the SQL is written once with `?` placeholders and
//! translated for whichever backend is active.
//!
//! ```rust,no_run
//! use sitekeeper::prelude::*;
//!
//! # async fn run() -> Result<(), SiteError> {
//! let manager = ConnectionManager::initialize(&DatabaseConfig::embedded("school.db")).await?;
//! let settings = SettingsStore::new(manager.database());
//! let stored = settings.read_all().await?;
//! println!("{} settings on {}", stored.len(), manager.mode());
//! manager.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod accounts;
pub mod auth;
pub mod carousel;
pub mod config;
pub mod contact;
pub mod db;
pub mod error;
pub mod manager;
pub mod pool;
pub mod postgres;
pub mod prelude;
pub mod results;
pub mod schema;
pub mod settings;
pub mod site;
pub mod sqlite;
pub mod storage;
pub mod translation;
pub mod types;
pub mod uploads;

pub use db::Database;
pub use error::{DataAccessError, SiteError, UploadError};
pub use manager::{ConnectionManager, DatabaseConfig};
pub use types::{DatabaseType, RowValues};
