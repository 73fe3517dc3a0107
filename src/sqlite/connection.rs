use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::spawn_blocking;
use tracing::{debug, info};

use super::params::Params;
use super::query::build_result_set;
use crate::error::DataAccessError;
use crate::results::{ExecOutcome, ResultSet};
use crate::translation::is_insert;
use crate::types::RowValues;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared handle to the single embedded connection. `None` once closed.
pub type SharedSqliteConnection = Arc<Mutex<Option<rusqlite::Connection>>>;

/// Embedded backend: one `rusqlite` connection, every call run on the blocking pool.
///
/// The mutex serializes disk access; callers still see an async interface.
pub struct SqliteConnection {
    conn: SharedSqliteConnection,
    path: PathBuf,
}

impl SqliteConnection {
    /// Open (or create) the database file and switch it to WAL.
    ///
    /// # Errors
    /// Returns `DataAccessError::Sqlite` if the file cannot be opened or configured.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, DataAccessError> {
        let path = path.as_ref().to_path_buf();
        let open_path = path.clone();
        let conn = spawn_blocking(move || -> Result<rusqlite::Connection, DataAccessError> {
            let conn = rusqlite::Connection::open(&open_path)?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            debug!(journal_mode = %mode, "sqlite journal mode set");
            Ok(conn)
        })
        .await
        .map_err(|e| DataAccessError::Worker(format!("sqlite spawn_blocking join error: {e}")))??;

        debug!(path = %path.display(), "sqlite database opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            path,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Execute a DML statement; INSERTs that changed rows report `last_insert_rowid`.
    ///
    /// # Errors
    /// Returns `DataAccessError` from preparation or execution, or `Closed`.
    pub async fn execute(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ExecOutcome, DataAccessError> {
        let sql_owned = sql.to_owned();
        let converted = Params::convert(params);
        let insert = is_insert(sql);
        run_blocking(Arc::clone(&self.conn), move |conn| {
            let affected = {
                let mut stmt = conn.prepare_cached(&sql_owned)?;
                stmt.execute(&converted.as_refs()[..])?
            };
            let inserted_id = (insert && affected > 0).then(|| conn.last_insert_rowid());
            Ok(ExecOutcome {
                affected: affected as u64,
                inserted_id,
            })
        })
        .await
    }

    /// Execute a SELECT and materialize every row.
    ///
    /// # Errors
    /// Returns `DataAccessError` from preparation, execution, or extraction, or `Closed`.
    pub async fn fetch_all(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, DataAccessError> {
        let sql_owned = sql.to_owned();
        let converted = Params::convert(params);
        run_blocking(Arc::clone(&self.conn), move |conn| {
            let mut stmt = conn.prepare_cached(&sql_owned)?;
            build_result_set(&mut stmt, &converted.0)
        })
        .await
    }

    /// Close the file handle. Later calls fail with `DataAccessError::Closed`.
    ///
    /// # Errors
    /// Returns `DataAccessError::Sqlite` if `SQLite` refuses to close the handle.
    pub async fn close(&self) -> Result<(), DataAccessError> {
        let handle = Arc::clone(&self.conn);
        let closed = spawn_blocking(move || {
            let mut guard = handle.blocking_lock();
            match guard.take() {
                Some(conn) => conn.close().map(|()| true).map_err(|(conn, e)| {
                    // keep the handle so the caller can retry
                    *guard = Some(conn);
                    DataAccessError::Sqlite(e)
                }),
                None => Ok(false),
            }
        })
        .await
        .map_err(|e| DataAccessError::Worker(format!("sqlite spawn_blocking join error: {e}")))??;

        if closed {
            info!(path = %self.path.display(), "sqlite database closed");
        }
        Ok(())
    }
}

async fn run_blocking<F, R>(conn: SharedSqliteConnection, func: F) -> Result<R, DataAccessError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, DataAccessError> + Send + 'static,
    R: Send + 'static,
{
    spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        match guard.as_mut() {
            Some(conn) => func(conn),
            None => Err(DataAccessError::Closed),
        }
    })
    .await
    .map_err(|e| DataAccessError::Worker(format!("sqlite spawn_blocking join error: {e}")))?
}
