use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::db::Database;
use crate::error::{DataAccessError, SiteError};
use crate::pool::{Backend, BackendPool};
use crate::postgres::{PostgresOptions, PostgresPool};
use crate::schema::sync_schema;
use crate::sqlite::SqliteConnection;
use crate::types::DatabaseType;

/// Where to find the primary and fallback databases.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Primary connection string. `None` means the embedded backend is used directly.
    pub database_url: Option<String>,
    /// Embedded database file (or `:memory:`).
    pub sqlite_path: PathBuf,
    pub pool_size: u32,
    pub connect_timeout: Duration,
}

impl DatabaseConfig {
    /// Embedded-only configuration.
    #[must_use]
    pub fn embedded(sqlite_path: impl Into<PathBuf>) -> Self {
        Self {
            database_url: None,
            sqlite_path: sqlite_path.into(),
            pool_size: 8,
            connect_timeout: Duration::from_secs(5),
        }
    }

    #[must_use]
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Owns the single active backend.
///
/// Built once at startup by [`ConnectionManager::initialize`], which tries the primary,
/// falls back to the embedded file, and syncs the schema. [`ConnectionManager::close`]
/// consumes the manager, so a closed backend can never be re-initialized.
pub struct ConnectionManager {
    backend: Arc<dyn Backend>,
    db: Database,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("mode", &self.mode())
            .finish()
    }
}

impl ConnectionManager {
    /// Probe the primary, fall back to the embedded backend, then sync the schema.
    ///
    /// A primary that fails is logged and released; only a fallback or schema failure is
    /// returned.
    ///
    /// # Errors
    /// Returns `SiteError::Connection` when the embedded file cannot be opened, or
    /// `SiteError::SchemaSync` when a table cannot be created. Both are fatal at startup.
    pub async fn initialize(config: &DatabaseConfig) -> Result<Self, SiteError> {
        let primary = match &config.database_url {
            Some(url) => {
                info!("attempting to connect to PostgreSQL");
                let opts = PostgresOptions {
                    url: url.clone(),
                    pool_size: config.pool_size,
                    connect_timeout: config.connect_timeout,
                };
                match connect_primary(&opts).await {
                    Ok(pool) => {
                        info!("connected to PostgreSQL");
                        Some(pool)
                    }
                    Err(e) => {
                        warn!(error = %e, "PostgreSQL connection failed, falling back to SQLite");
                        None
                    }
                }
            }
            None => {
                info!("DATABASE_URL not set, defaulting to SQLite");
                None
            }
        };

        let pool = match primary {
            Some(pool) => BackendPool::Postgres(pool),
            None => BackendPool::Sqlite(open_fallback(config).await?),
        };

        let manager = Self::with_backend(Arc::new(pool));
        sync_schema(&manager.db).await?;
        Ok(manager)
    }

    /// Embedded backend only, schema synced. Used by tools and tests.
    ///
    /// # Errors
    /// Same as [`ConnectionManager::initialize`] for the fallback path.
    pub async fn embedded(sqlite_path: impl Into<PathBuf>) -> Result<Self, SiteError> {
        Self::initialize(&DatabaseConfig::embedded(sqlite_path)).await
    }

    /// Wrap an already-built backend. The schema is not synced.
    #[must_use]
    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        let db = Database::new(Arc::clone(&backend));
        Self { backend, db }
    }

    #[must_use]
    pub fn mode(&self) -> DatabaseType {
        self.db.mode()
    }

    /// Façade handle for the stores. Clones share the backend.
    #[must_use]
    pub fn database(&self) -> Database {
        self.db.clone()
    }

    /// Release the backend's connections.
    ///
    /// # Errors
    /// Returns the backend's error if the embedded file refuses to close.
    pub async fn close(self) -> Result<(), SiteError> {
        let mode = self.mode();
        self.backend.close().await?;
        info!(backend = %mode, "database connection closed");
        Ok(())
    }
}

async fn connect_primary(opts: &PostgresOptions) -> Result<PostgresPool, DataAccessError> {
    let pool = PostgresPool::connect(opts).await?;
    if let Err(e) = pool.probe().await {
        pool.close().await;
        info!("partially established PostgreSQL connections released");
        return Err(e);
    }
    Ok(pool)
}

async fn open_fallback(config: &DatabaseConfig) -> Result<SqliteConnection, SiteError> {
    match SqliteConnection::open(&config.sqlite_path).await {
        Ok(conn) => {
            info!(path = %config.sqlite_path.display(), "connected to the SQLite database (fallback)");
            Ok(conn)
        }
        Err(e) => {
            error!(path = %config.sqlite_path.display(), error = %e, "fatal error connecting to SQLite");
            Err(SiteError::Connection(format!(
                "cannot open SQLite database at {}: {e}",
                config.sqlite_path.display()
            )))
        }
    }
}
