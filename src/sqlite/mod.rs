// SQLite module - the embedded fallback backend
//
// - connection: the single shared connection and its blocking-pool executor
// - params: parameter conversion between `RowValues` and SQLite values
// - query: result extraction and building

pub mod connection;
pub mod params;
pub mod query;

pub use connection::{SharedSqliteConnection, SqliteConnection};
pub use query::build_result_set;
