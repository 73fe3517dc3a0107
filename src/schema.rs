use tracing::{debug, info};

use crate::db::Database;
use crate::error::SiteError;

/// One idempotent table definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaStatement {
    pub table: &'static str,
    pub sql: &'static str,
}

pub const POSTGRES_SCHEMA: &[SchemaStatement] = &[
    SchemaStatement {
        table: "settings",
        sql: "CREATE TABLE IF NOT EXISTS settings (
            id SERIAL PRIMARY KEY,
            setting_name TEXT UNIQUE NOT NULL,
            setting_value TEXT
        )",
    },
    SchemaStatement {
        table: "carousel_images",
        sql: "CREATE TABLE IF NOT EXISTS carousel_images (
            id SERIAL PRIMARY KEY,
            image_url TEXT NOT NULL,
            link_url TEXT,
            alt_text TEXT,
            file_name TEXT,
            display_order INTEGER
        )",
    },
    SchemaStatement {
        table: "users",
        sql: "CREATE TABLE IF NOT EXISTS users (
            id SERIAL PRIMARY KEY,
            username TEXT UNIQUE NOT NULL,
            password TEXT NOT NULL
        )",
    },
];

pub const SQLITE_SCHEMA: &[SchemaStatement] = &[
    SchemaStatement {
        table: "settings",
        sql: "CREATE TABLE IF NOT EXISTS settings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            setting_name TEXT UNIQUE NOT NULL,
            setting_value TEXT
        )",
    },
    SchemaStatement {
        table: "carousel_images",
        sql: "CREATE TABLE IF NOT EXISTS carousel_images (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            image_url TEXT NOT NULL,
            link_url TEXT,
            alt_text TEXT,
            file_name TEXT,
            display_order INTEGER
        )",
    },
    SchemaStatement {
        table: "users",
        sql: "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT UNIQUE NOT NULL,
            password TEXT NOT NULL
        )",
    },
];

/// Create any missing tables for the active backend, in order.
///
/// Safe to run on every start; existing tables and rows are left alone.
///
/// # Errors
/// Returns `SiteError::SchemaSync` naming the first table that failed.
pub async fn sync_schema(db: &Database) -> Result<(), SiteError> {
    for statement in db.dialect().schema() {
        db.execute(statement.sql, &[])
            .await
            .map_err(|source| SiteError::SchemaSync {
                table: statement.table,
                source,
            })?;
        debug!(table = statement.table, "table ensured");
    }
    info!(backend = %db.mode(), "schema synchronized");
    Ok(())
}
