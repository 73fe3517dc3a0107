// PostgreSQL module - the client/server primary backend
//
// - config: connection options and the bb8 manager
// - params: parameter binding for `RowValues`
// - query: result extraction and building
// - executor: the pooled backend itself

pub mod config;
pub mod executor;
pub mod params;
pub mod query;

pub use config::{PgManager, PostgresOptions};
pub use executor::PostgresPool;
pub use params::Params;
pub use query::build_result_set_from_rows;
