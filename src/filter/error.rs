use thiserror::Error;

/// Rejections of a client filter. All of them are caller mistakes (400).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Invalid column name: {0}")]
    InvalidColumn(String),

    #[error("Raw SQL conditions are not supported")]
    RawSql,

    #[error("Invalid WHERE clause: {0}")]
    InvalidWhereClause(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid operator data: {0}")]
    InvalidOperatorData(String),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("{0} must be non-negative, got {1}")]
    NegativePagination(&'static str, i32),
}
