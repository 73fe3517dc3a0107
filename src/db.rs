use std::sync::Arc;

use tracing::debug;

use crate::error::DataAccessError;
use crate::pool::Backend;
use crate::results::{DbRow, ExecOutcome, ResultSet};
use crate::translation::Dialect;
use crate::types::{DatabaseType, RowValues};

/// Uniform query façade over whichever backend is active.
///
/// Queries are written once with `?` placeholders; each call is translated by the backend's
/// dialect before it runs. Cloning is cheap and every clone talks to the same backend.
///
/// ```rust,no_run
/// use sitekeeper::prelude::*;
///
/// # async fn demo(db: Database) -> Result<(), DataAccessError> {
/// let row = db
///     .fetch_one(
///         "SELECT id, username FROM users WHERE username = ?",
///         &[RowValues::from("admin")],
///     )
///     .await?;
/// if let Some(row) = row {
///     println!("admin has id {}", row.int("id")?);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Database {
    backend: Arc<dyn Backend>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("mode", &self.mode()).finish()
    }
}

impl Database {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Backend kind this façade talks to.
    #[must_use]
    pub fn mode(&self) -> DatabaseType {
        self.backend.dialect().kind()
    }

    #[must_use]
    pub fn dialect(&self) -> &'static dyn Dialect {
        self.backend.dialect()
    }

    /// Run a statement that changes rows.
    ///
    /// # Errors
    /// Returns the backend's `DataAccessError`; nothing is retried.
    pub async fn execute(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ExecOutcome, DataAccessError> {
        let query = self.dialect().translate(sql, params);
        debug!(backend = %self.mode(), sql = %query.sql, params = query.params.len(), "execute");
        self.backend.execute(&query.sql, query.params).await
    }

    /// First row of a query, or `None` when it matched nothing.
    ///
    /// # Errors
    /// Returns the backend's `DataAccessError`; nothing is retried.
    pub async fn fetch_one(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Option<DbRow>, DataAccessError> {
        let rows = self.fetch_all(sql, params).await?;
        Ok(rows.into_rows().into_iter().next())
    }

    /// Every row of a query, in backend order.
    ///
    /// # Errors
    /// Returns the backend's `DataAccessError`; nothing is retried.
    pub async fn fetch_all(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, DataAccessError> {
        let query = self.dialect().translate(sql, params);
        debug!(backend = %self.mode(), sql = %query.sql, params = query.params.len(), "fetch_all");
        self.backend.fetch_all(&query.sql, query.params).await
    }
}
