// Domain errors
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DashboardError {
    #[error("table {0} must declare at least one column")]
    NoColumns(String),

    #[error("table {table} declares column {column} more than once")]
    DuplicateColumn { table: String, column: String },

    #[error("row {row} of table {table} has {actual} values, expected {expected}")]
    RowLength {
        table: String,
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("unknown view or table: {0}")]
    UnknownDataSource(String),

    #[error("view {view} must project an ordered subset of the columns of table {table}")]
    InvalidProjection { view: String, table: String },

    #[error("column {0} has no numeric values")]
    NoNumericValues(String),

    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    #[error("unknown chart: {0}")]
    UnknownChart(String),

    #[error("filter {name} is a {kind} filter")]
    FilterKindMismatch { name: String, kind: &'static str },

    #[error("chart {chart} has no row {row}")]
    RowOutOfRange { chart: String, row: usize },

    #[error("a restore is already in progress")]
    RestoreInProgress,
}
