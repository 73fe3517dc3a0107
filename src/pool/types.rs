use async_trait::async_trait;

use super::Backend;
use crate::error::DataAccessError;
use crate::postgres::PostgresPool;
use crate::results::{ExecOutcome, ResultSet};
use crate::sqlite::SqliteConnection;
use crate::translation::{Dialect, dialect_for};
use crate::types::{DatabaseType, RowValues};

/// The one backend that is active for the lifetime of the process.
pub enum BackendPool {
    /// `PostgreSQL` connection pool
    Postgres(PostgresPool),
    /// `SQLite` single shared connection
    Sqlite(SqliteConnection),
}

impl std::fmt::Debug for BackendPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postgres(_) => f.debug_tuple("Postgres").field(&"<bb8 pool>").finish(),
            Self::Sqlite(conn) => f.debug_tuple("Sqlite").field(&conn.path()).finish(),
        }
    }
}

impl BackendPool {
    #[must_use]
    pub fn kind(&self) -> DatabaseType {
        match self {
            Self::Postgres(_) => DatabaseType::Postgres,
            Self::Sqlite(_) => DatabaseType::Sqlite,
        }
    }
}

#[async_trait]
impl Backend for BackendPool {
    fn dialect(&self) -> &'static dyn Dialect {
        dialect_for(self.kind())
    }

    async fn execute(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ExecOutcome, DataAccessError> {
        match self {
            Self::Postgres(pool) => pool.execute(sql, params).await,
            Self::Sqlite(conn) => conn.execute(sql, params).await,
        }
    }

    async fn fetch_all(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, DataAccessError> {
        match self {
            Self::Postgres(pool) => pool.fetch_all(sql, params).await,
            Self::Sqlite(conn) => conn.fetch_all(sql, params).await,
        }
    }

    async fn close(&self) -> Result<(), DataAccessError> {
        match self {
            Self::Postgres(pool) => {
                pool.close().await;
                Ok(())
            }
            Self::Sqlite(conn) => conn.close().await,
        }
    }
}
