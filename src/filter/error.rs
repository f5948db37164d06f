use thiserror::Error;

/// Failures while turning a filter document into SQL. Pagination, sort and
/// typed-column values can come from client input; the rest mean a service
/// built a bad document and surface as 500.
#[derive(Error, Debug, PartialEq)]
pub enum FilterError {
    #[error("Table name rejected: {0}")]
    InvalidTableName(String),

    #[error("Column name rejected: {0}")]
    InvalidColumn(String),

    #[error("Malformed filter document: {0}")]
    InvalidWhereClause(String),

    #[error("Unknown filter operator {0}")]
    UnsupportedOperator(String),

    #[error("Bad operand: {0}")]
    InvalidOperatorData(String),

    #[error("{message}")]
    InvalidValue { column: String, message: String },

    #[error("{0}")]
    InvalidLimit(String),

    #[error("{0}")]
    InvalidOffset(String),
}
