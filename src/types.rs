use std::fmt;

use serde::Serialize;

/// Values that can be stored in a database row or used as query parameters.
///
/// The same enum is used for both backends so store code never branches on driver types:
/// ```rust
/// use sitekeeper::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Null,
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// NULL value
    Null,
}

impl RowValues {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_owned())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<Option<String>> for RowValues {
    fn from(value: Option<String>) -> Self {
        value.map_or(RowValues::Null, RowValues::Text)
    }
}

/// The backend that is active for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// `PostgreSQL`, the client/server primary
    Postgres,
    /// `SQLite`, the embedded fallback
    Sqlite,
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseType::Postgres => f.write_str("postgres"),
            DatabaseType::Sqlite => f.write_str("sqlite"),
        }
    }
}
