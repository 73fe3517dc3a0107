mod result_set;
mod row;

pub use result_set::ResultSet;
pub use row::DbRow;

/// Outcome of a statement that changes rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    /// Rows changed by the statement.
    pub affected: u64,
    /// Generated key of the inserted row, for INSERT statements.
    pub inserted_id: Option<i64>,
}
