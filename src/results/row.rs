use std::collections::HashMap;
use std::sync::Arc;

use crate::error::DataAccessError;
use crate::types::RowValues;

/// A row from a database query result
///
/// Column names and the name-to-index cache are shared by every row of a result set.
#[derive(Debug, Clone)]
pub struct DbRow {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row
    pub values: Vec<RowValues>,
    #[doc(hidden)]
    pub(crate) column_index_cache: Arc<HashMap<String, usize>>,
}

impl DbRow {
    /// Create a new database row, building its own column cache.
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<RowValues>) -> Self {
        let cache = Arc::new(index_columns(&column_names));
        Self {
            column_names,
            values,
            column_index_cache: cache,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.column_index_cache.get(column_name) {
            return Some(idx);
        }
        self.column_names.iter().position(|col| col == column_name)
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    fn require(&self, column_name: &str) -> Result<&RowValues, DataAccessError> {
        self.get(column_name)
            .ok_or_else(|| DataAccessError::Column(format!("missing column `{column_name}`")))
    }

    /// Integer column that must be present and non-NULL.
    ///
    /// # Errors
    /// Returns `DataAccessError::Column` when the column is missing, NULL, or not an integer.
    pub fn int(&self, column_name: &str) -> Result<i64, DataAccessError> {
        self.opt_int(column_name)?.ok_or_else(|| {
            DataAccessError::Column(format!("column `{column_name}` is NULL"))
        })
    }

    /// Nullable integer column.
    ///
    /// # Errors
    /// Returns `DataAccessError::Column` when the column is missing or holds a non-integer.
    pub fn opt_int(&self, column_name: &str) -> Result<Option<i64>, DataAccessError> {
        match self.require(column_name)? {
            RowValues::Int(value) => Ok(Some(*value)),
            RowValues::Null => Ok(None),
            other => Err(DataAccessError::Column(format!(
                "column `{column_name}` is not an integer: {other:?}"
            ))),
        }
    }

    /// Text column that must be present and non-NULL.
    ///
    /// # Errors
    /// Returns `DataAccessError::Column` when the column is missing, NULL, or not text.
    pub fn text(&self, column_name: &str) -> Result<String, DataAccessError> {
        self.opt_text(column_name)?.ok_or_else(|| {
            DataAccessError::Column(format!("column `{column_name}` is NULL"))
        })
    }

    /// Nullable text column.
    ///
    /// # Errors
    /// Returns `DataAccessError::Column` when the column is missing or holds a non-text value.
    pub fn opt_text(&self, column_name: &str) -> Result<Option<String>, DataAccessError> {
        match self.require(column_name)? {
            RowValues::Text(value) => Ok(Some(value.clone())),
            RowValues::Null => Ok(None),
            other => Err(DataAccessError::Column(format!(
                "column `{column_name}` is not text: {other:?}"
            ))),
        }
    }
}

pub(crate) fn index_columns(column_names: &[String]) -> HashMap<String, usize> {
    column_names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> DbRow {
        DbRow::new(
            Arc::new(vec!["id".into(), "link_url".into(), "alt_text".into()]),
            vec![
                RowValues::Int(7),
                RowValues::Null,
                RowValues::Text("Front gate".into()),
            ],
        )
    }

    #[test]
    fn typed_accessors_read_by_name() {
        let row = row();
        assert_eq!(row.int("id").unwrap(), 7);
        assert_eq!(row.opt_text("link_url").unwrap(), None);
        assert_eq!(row.text("alt_text").unwrap(), "Front gate");
        assert_eq!(row.get_by_index(0), Some(&RowValues::Int(7)));
    }

    #[test]
    fn typed_accessors_report_mismatches() {
        let row = row();
        assert!(matches!(row.int("missing"), Err(DataAccessError::Column(_))));
        assert!(matches!(row.text("id"), Err(DataAccessError::Column(_))));
        assert!(matches!(row.text("link_url"), Err(DataAccessError::Column(_))));
    }
}
