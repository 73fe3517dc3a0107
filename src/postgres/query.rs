use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use tokio_postgres::types::Type;

use crate::error::DataAccessError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Extracts a `RowValues` from a `tokio_postgres` Row at the given index.
///
/// # Errors
/// Returns `DataAccessError` if the column cannot be retrieved.
pub fn postgres_extract_value(
    row: &tokio_postgres::Row,
    idx: usize,
) -> Result<RowValues, DataAccessError> {
    let type_info = row
        .columns()
        .get(idx)
        .ok_or_else(|| DataAccessError::Column(format!("no column at index {idx}")))?
        .type_();

    let value = match *type_info {
        Type::INT2 => {
            let val: Option<i16> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v)))
        }
        Type::INT4 => {
            let val: Option<i32> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v)))
        }
        Type::INT8 => {
            let val: Option<i64> = row.try_get(idx)?;
            val.map_or(RowValues::Null, RowValues::Int)
        }
        Type::FLOAT4 => {
            let val: Option<f32> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Float(f64::from(v)))
        }
        Type::FLOAT8 => {
            let val: Option<f64> = row.try_get(idx)?;
            val.map_or(RowValues::Null, RowValues::Float)
        }
        Type::BOOL => {
            let val: Option<bool> = row.try_get(idx)?;
            val.map_or(RowValues::Null, RowValues::Bool)
        }
        Type::TIMESTAMP => {
            let val: Option<NaiveDateTime> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Text(v.to_string()))
        }
        Type::TIMESTAMPTZ => {
            let val: Option<DateTime<Utc>> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Text(v.to_rfc3339()))
        }
        _ => {
            // text, varchar, bpchar, name and anything else readable as a string
            let val: Option<String> = row.try_get(idx)?;
            val.map_or(RowValues::Null, RowValues::Text)
        }
    };
    Ok(value)
}

/// Build a result set from raw Postgres rows
///
/// # Errors
/// Returns errors from result processing.
pub fn build_result_set_from_rows(
    rows: &[tokio_postgres::Row],
) -> Result<ResultSet, DataAccessError> {
    let mut result_set = ResultSet::with_capacity(rows.len());
    if let Some(row) = rows.first() {
        let cols: Vec<String> = row.columns().iter().map(|c| c.name().to_string()).collect();
        result_set.set_column_names(Arc::new(cols));
    }

    for row in rows {
        let col_count = row.columns().len();
        let mut row_values = Vec::with_capacity(col_count);
        for idx in 0..col_count {
            row_values.push(postgres_extract_value(row, idx)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}
