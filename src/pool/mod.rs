pub mod types;

pub use types::BackendPool;

use async_trait::async_trait;

use crate::error::DataAccessError;
use crate::results::{ExecOutcome, ResultSet};
use crate::translation::Dialect;
use crate::types::RowValues;

/// A live database backend.
///
/// SQL arriving here is already in the backend's own dialect; translation happens in the
/// façade. Implemented by [`BackendPool`] and by test doubles.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Dialect the façade must translate templates into before calling this backend.
    fn dialect(&self) -> &'static dyn Dialect;

    /// Run a statement that changes rows.
    async fn execute(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ExecOutcome, DataAccessError>;

    /// Run a query and materialize every row in order.
    async fn fetch_all(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, DataAccessError>;

    /// Release every connection. Calls made afterwards fail with `DataAccessError::Closed`.
    async fn close(&self) -> Result<(), DataAccessError>;
}
