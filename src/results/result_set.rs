use std::collections::HashMap;
use std::sync::Arc;

use super::row::{DbRow, index_columns};
use crate::types::RowValues;

/// A result set from a database query
///
/// Rows keep the order the backend returned them in.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<DbRow>,
    /// Column names shared by all rows (to avoid duplicating in each row)
    column_names: Option<Arc<Vec<String>>>,
    column_index_cache: Option<Arc<HashMap<String, usize>>>,
}

impl ResultSet {
    /// Create a new result set with a known capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            column_names: None,
            column_index_cache: None,
        }
    }

    /// Set the column names for this result set (to be shared by all rows)
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_index_cache = Some(Arc::new(index_columns(&column_names)));
        self.column_names = Some(column_names);
    }

    /// Add a row to the result set. Ignored until column names are set.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        if let (Some(column_names), Some(cache)) = (&self.column_names, &self.column_index_cache)
        {
            self.results.push(DbRow {
                column_names: Arc::clone(column_names),
                values: row_values,
                column_index_cache: Arc::clone(cache),
            });
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<&DbRow> {
        self.results.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DbRow> {
        self.results.iter()
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<DbRow> {
        self.results
    }
}

impl IntoIterator for ResultSet {
    type Item = DbRow;
    type IntoIter = std::vec::IntoIter<DbRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a DbRow;
    type IntoIter = std::slice::Iter<'a, DbRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
