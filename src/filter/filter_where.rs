use serde_json::Value;

use super::error::FilterError;
use super::types::{is_identifier, FilterOp, FilterWhereOptions, SqlParam};

/// Compiles a JSON filter document into a parameterised SQL predicate.
///
/// Keys are ANDed. Plain values mean equality, objects carry operators
/// (`{"venue_id": {"$in": [..]}}`), and `$and`/`$or`/`$not` nest groups.
/// Placeholders are numbered continuously across nested groups, and each
/// value is typed by the column it is compared against.
pub struct FilterWhere {
    param_values: Vec<SqlParam>,
    param_offset: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_offset: starting_param_index,
        }
    }

    pub fn generate(where_data: &Value, starting_param_index: usize, options: &FilterWhereOptions) -> Result<(String, Vec<SqlParam>), FilterError> {
        Self::validate(where_data)?;
        let mut filter_where = Self::new(starting_param_index);

        let mut sql_conditions = Self::soft_delete_conditions(options);
        if let Some(sql) = filter_where.build_group(where_data)? {
            sql_conditions.push(sql);
        }

        let where_clause = if sql_conditions.is_empty() { "1=1".to_string() } else { sql_conditions.join(" AND ") };
        Ok((where_clause, filter_where.param_values))
    }

    pub fn generate_empty(options: &FilterWhereOptions) -> (String, Vec<SqlParam>) {
        let conditions = Self::soft_delete_conditions(options);
        let where_clause = if conditions.is_empty() { "1=1".to_string() } else { conditions.join(" AND ") };
        (where_clause, vec![])
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn soft_delete_conditions(options: &FilterWhereOptions) -> Vec<String> {
        if options.soft_delete && !options.include_deleted {
            vec!["\"is_deleted\" = false".to_string()]
        } else {
            vec![]
        }
    }

    /// Build an AND group. `None` means the group places no constraint.
    fn build_group(&mut self, where_data: &Value) -> Result<Option<String>, FilterError> {
        let obj = match where_data {
            Value::Null => return Ok(None),
            Value::Object(obj) => obj,
            _ => return Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        };

        let mut parts = Vec::new();
        for (key, value) in obj {
            let part = if key.starts_with('$') {
                self.build_logical(key, value)?
            } else {
                self.build_field(key, value)?
            };
            if let Some(sql) = part {
                parts.push(sql);
            }
        }

        Ok(match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(parts.join(" AND ")),
        })
    }

    fn build_logical(&mut self, op: &str, value: &Value) -> Result<Option<String>, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                if arr.is_empty() {
                    return Err(FilterError::InvalidOperatorData(format!("{} requires a non-empty array", op)));
                }

                let params_before = self.param_values.len();
                let mut sql_parts = Vec::new();
                for v in arr {
                    match self.build_group(v)? {
                        Some(sql) => sql_parts.push(format!("({})", sql)),
                        // an unconstrained branch makes the whole $or true
                        None if op == "$or" => {
                            self.param_values.truncate(params_before);
                            return Ok(None);
                        }
                        None => {}
                    }
                }
                if sql_parts.is_empty() {
                    return Ok(None);
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                Ok(Some(format!("({})", sql_parts.join(joiner))))
            }
            "$not" => match self.build_group(value)? {
                Some(sql) => Ok(Some(format!("NOT ({})", sql))),
                None => Ok(Some("1=0".to_string())),
            },
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn build_field(&mut self, field: &str, value: &Value) -> Result<Option<String>, FilterError> {
        if !is_identifier(field) {
            return Err(FilterError::InvalidColumn(format!("Invalid column name format: {}", field)));
        }

        match value {
            Value::Object(obj) if obj.keys().all(|k| k.starts_with('$')) && !obj.is_empty() => {
                let mut parts = Vec::new();
                for (op_key, op_val) in obj {
                    let operator = FilterOp::parse(op_key)
                        .ok_or_else(|| FilterError::UnsupportedOperator(op_key.to_string()))?;
                    parts.push(self.build_condition(field, operator, op_val)?);
                }
                Ok(Some(parts.join(" AND ")))
            }
            // Implicit equality: { field: value }
            _ => Ok(Some(self.build_condition(field, FilterOp::Eq, value)?)),
        }
    }

    fn build_condition(&mut self, column: &str, operator: FilterOp, data: &Value) -> Result<String, FilterError> {
        let quoted_column = format!("\"{}\"", column);
        Ok(match operator {
            FilterOp::Eq => {
                if data.is_null() { format!("{} IS NULL", quoted_column) }
                else { format!("{} = {}", quoted_column, self.param(column, data)?) }
            }
            FilterOp::Ne => {
                if data.is_null() { format!("{} IS NOT NULL", quoted_column) }
                else { format!("{} IS DISTINCT FROM {}", quoted_column, self.param(column, data)?) }
            }
            FilterOp::Gt => format!("{} > {}", quoted_column, self.param(column, data)?),
            FilterOp::Gte => format!("{} >= {}", quoted_column, self.param(column, data)?),
            FilterOp::Lt => format!("{} < {}", quoted_column, self.param(column, data)?),
            FilterOp::Lte => format!("{} <= {}", quoted_column, self.param(column, data)?),
            FilterOp::Like => format!("{} LIKE {}", quoted_column, self.param(column, data)?),
            FilterOp::ILike => format!("{} ILIKE {}", quoted_column, self.param(column, data)?),
            FilterOp::In | FilterOp::NIn => {
                let negate = operator == FilterOp::NIn;
                match data {
                    Value::Array(values) if values.is_empty() => {
                        if negate { "1=1".to_string() } else { "1=0".to_string() }
                    }
                    Value::Array(values) => {
                        let params = self.params(column, values)?;
                        let keyword = if negate { "NOT IN" } else { "IN" };
                        format!("{} {} ({})", quoted_column, keyword, params.join(", "))
                    }
                    other => {
                        let keyword = if negate { "<>" } else { "=" };
                        format!("{} {} {}", quoted_column, keyword, self.param(column, other)?)
                    }
                }
            }
            FilterOp::Any => match data {
                Value::Array(values) if values.is_empty() => "1=0".to_string(),
                Value::Array(values) => {
                    let params = self.params(column, values)?;
                    format!("{} && ARRAY[{}]", quoted_column, params.join(", "))
                }
                other => format!("{} && ARRAY[{}]", quoted_column, self.param(column, other)?),
            },
            FilterOp::Between => match data {
                Value::Array(values) if values.len() == 2 => {
                    let low = self.param(column, &values[0])?;
                    let high = self.param(column, &values[1])?;
                    format!("{} BETWEEN {} AND {}", quoted_column, low, high)
                }
                _ => return Err(FilterError::InvalidOperatorData("$between requires exactly 2 values".to_string())),
            },
        })
    }

    fn param(&mut self, column: &str, value: &Value) -> Result<String, FilterError> {
        self.param_values.push(SqlParam::for_column(column, value)?);
        Ok(format!("${}", self.param_offset + self.param_values.len()))
    }

    fn params(&mut self, column: &str, values: &[Value]) -> Result<Vec<String>, FilterError> {
        values.iter().map(|v| self.param(column, v)).collect()
    }
}
