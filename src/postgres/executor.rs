use std::sync::{RwLock, RwLockWriteGuard};
use std::time::Duration;

use bb8::Pool;
use tracing::{debug, info, warn};

use super::config::{PgManager, PostgresOptions, build_pool};
use super::params::Params;
use super::query::build_result_set_from_rows;
use crate::error::DataAccessError;
use crate::results::{ExecOutcome, ResultSet};
use crate::translation::{is_insert, with_returning_id};
use crate::types::RowValues;

const DRAIN_POLL: Duration = Duration::from_millis(100);
const DRAIN_LIMIT: Duration = Duration::from_secs(5);

/// Pooled client/server backend.
///
/// The pool sits behind a lock so `close` can take it out while clones of the façade are
/// still alive; later calls then fail with `DataAccessError::Closed`.
pub struct PostgresPool {
    pool: RwLock<Option<Pool<PgManager>>>,
}

impl PostgresPool {
    /// Build the pool. Does not touch the network.
    ///
    /// # Errors
    /// Returns `DataAccessError::Postgres` for a malformed URL or a pool build failure.
    pub async fn connect(opts: &PostgresOptions) -> Result<Self, DataAccessError> {
        let pool = build_pool(opts).await?;
        Ok(Self {
            pool: RwLock::new(Some(pool)),
        })
    }

    fn current(&self) -> Result<Pool<PgManager>, DataAccessError> {
        let guard = match self.pool.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clone().ok_or(DataAccessError::Closed)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Option<Pool<PgManager>>> {
        match self.pool.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Liveness probe: check out a connection and ask the server for its clock.
    ///
    /// # Errors
    /// Returns the pool or driver error when the server is unreachable.
    pub async fn probe(&self) -> Result<(), DataAccessError> {
        let pool = self.current()?;
        let client = pool.get().await?;
        client.simple_query("SELECT NOW()").await?;
        Ok(())
    }

    /// Execute a DML statement.
    ///
    /// INSERTs run through `query` with `RETURNING id` appended so the generated key comes
    /// back with the statement.
    ///
    /// # Errors
    /// Returns errors from checkout, parameter binding, or execution.
    pub async fn execute(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ExecOutcome, DataAccessError> {
        let pool = self.current()?;
        let client = pool.get().await?;
        let converted = Params::convert(params);

        if is_insert(sql) {
            let sql = with_returning_id(sql);
            let rows = client.query(sql.as_ref(), converted.as_refs()).await?;
            let result_set = build_result_set_from_rows(&rows)?;
            let inserted_id = match result_set.first() {
                Some(row) if row.get_column_index("id").is_some() => row.opt_int("id")?,
                _ => None,
            };
            return Ok(ExecOutcome {
                affected: rows.len() as u64,
                inserted_id,
            });
        }

        let affected = client.execute(sql, converted.as_refs()).await?;
        Ok(ExecOutcome {
            affected,
            inserted_id: None,
        })
    }

    /// Execute a SELECT and materialize every row.
    ///
    /// # Errors
    /// Returns errors from checkout, parameter binding, execution, or value extraction.
    pub async fn fetch_all(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, DataAccessError> {
        let pool = self.current()?;
        let client = pool.get().await?;
        let converted = Params::convert(params);
        let rows = client.query(sql, converted.as_refs()).await?;
        build_result_set_from_rows(&rows)
    }

    /// Stop handing out connections, wait (bounded) for checked-out ones to come back, then
    /// drop the pool.
    pub async fn close(&self) {
        let Some(pool) = self.write_guard().take() else {
            debug!("postgres pool already closed");
            return;
        };

        let mut waited = Duration::ZERO;
        loop {
            let state = pool.state();
            if state.connections <= state.idle_connections {
                break;
            }
            if waited >= DRAIN_LIMIT {
                warn!(
                    in_use = state.connections - state.idle_connections,
                    "closing postgres pool with connections still checked out"
                );
                break;
            }
            tokio::time::sleep(DRAIN_POLL).await;
            waited += DRAIN_POLL;
        }

        drop(pool);
        info!("postgres pool closed");
    }
}
