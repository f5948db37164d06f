use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::error::FilterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "$eq")] Eq,
    #[serde(rename = "$ne")] Ne,
    #[serde(rename = "$gt")] Gt,
    #[serde(rename = "$gte")] Gte,
    #[serde(rename = "$lt")] Lt,
    #[serde(rename = "$lte")] Lte,

    #[serde(rename = "$like")] Like,
    #[serde(rename = "$ilike")] ILike,

    #[serde(rename = "$in")] In,
    #[serde(rename = "$nin")] NIn,

    #[serde(rename = "$any")] Any,

    #[serde(rename = "$between")] Between,
}

impl FilterOp {
    pub fn parse(op_key: &str) -> Option<Self> {
        Some(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$like" => FilterOp::Like,
            "$ilike" => FilterOp::ILike,
            "$in" => FilterOp::In,
            "$nin" => FilterOp::NIn,
            "$any" => FilterOp::Any,
            "$between" => FilterOp::Between,
            _ => return None,
        })
    }
}

/// Filter document as accepted by `Filter::assign`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterData {
    pub select: Option<Vec<String>>,
    #[serde(rename = "where")]
    pub where_clause: Option<serde_json::Value>,
    pub order: Option<serde_json::Value>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
    /// Include soft-deleted rows (`is_deleted = true`)
    #[serde(default)]
    pub include_deleted: bool,
}

impl FilterData {
    pub fn with_where(where_clause: serde_json::Value) -> Self {
        Self {
            where_clause: Some(where_clause),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterWhereOptions {
    /// Table carries an `is_deleted` column
    pub soft_delete: bool,
    pub include_deleted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}

/// Storage type of a filtered column, taken from the schema naming convention:
/// `id`, `*_id` and `*_ids` hold UUIDs, `*_date` holds dates. Everything else
/// binds with the type of the JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Uuid,
    Date,
    Plain,
}

impl ColumnKind {
    pub fn of(column: &str) -> Self {
        if column == "id" || column.ends_with("_id") || column.ends_with("_ids") {
            ColumnKind::Uuid
        } else if column.ends_with("_date") {
            ColumnKind::Date
        } else {
            ColumnKind::Plain
        }
    }
}

/// A bound placeholder value. The variant decides the Postgres type it is sent as.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Date(NaiveDate),
    Json(Value),
}

impl SqlParam {
    /// Convert a filter value for `column`. Typed columns only accept values
    /// that parse as their type.
    pub fn for_column(column: &str, value: &Value) -> Result<Self, FilterError> {
        let invalid = |message: String| FilterError::InvalidValue { column: column.to_string(), message };
        match (ColumnKind::of(column), value) {
            (_, Value::Array(_)) => Err(invalid(format!("{} takes a single value here", column))),
            (ColumnKind::Uuid, Value::String(s)) => Uuid::parse_str(s.trim())
                .map(SqlParam::Uuid)
                .map_err(|_| invalid(format!("{} must be a valid id", column))),
            (ColumnKind::Uuid, _) => Err(invalid(format!("{} must be a valid id", column))),
            (ColumnKind::Date, Value::String(s)) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map(SqlParam::Date)
                .map_err(|_| invalid(format!("{} must be a YYYY-MM-DD date", column))),
            (ColumnKind::Date, _) => Err(invalid(format!("{} must be a YYYY-MM-DD date", column))),
            (ColumnKind::Plain, Value::Null) => Ok(SqlParam::Null),
            (ColumnKind::Plain, Value::Bool(b)) => Ok(SqlParam::Bool(*b)),
            (ColumnKind::Plain, Value::Number(n)) => Ok(match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => SqlParam::Int(i),
                (None, Some(f)) => SqlParam::Float(f),
                (None, None) => SqlParam::Text(n.to_string()),
            }),
            (ColumnKind::Plain, Value::String(s)) => Ok(SqlParam::Text(s.clone())),
            (ColumnKind::Plain, Value::Object(_)) => Ok(SqlParam::Json(value.clone())),
        }
    }
}

/// Column and table names must be plain identifiers; they are interpolated into SQL
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
