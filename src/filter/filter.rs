use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{is_identifier, FilterData, FilterOrderInfo, FilterWhereOptions, SqlParam, SqlResult};

pub struct Filter {
    table_name: String,
    select_columns: Vec<String>,
    where_data: Option<Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i32>,
    offset: Option<i32>,
    options: FilterWhereOptions,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        Self::validate_table_name(&table_name)?;
        Ok(Self {
            table_name,
            select_columns: vec![],
            where_data: None,
            order_data: vec![],
            limit: None,
            offset: None,
            options: FilterWhereOptions::default(),
        })
    }

    /// Mark the table as soft-deleting: rows with `is_deleted = true` are hidden unless included
    pub fn soft_delete(&mut self, enabled: bool) -> &mut Self {
        self.options.soft_delete = enabled;
        self
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        self.options.include_deleted = data.include_deleted;
        if let Some(select) = data.select { self.select(select)?; }
        if let Some(where_clause) = data.where_clause { self.where_clause(where_clause)?; }
        if let Some(order) = data.order { self.order(order)?; }
        if let Some(limit) = data.limit { self.limit(limit, data.offset)?; }
        else if let Some(offset) = data.offset { self.offset(offset)?; }
        Ok(self)
    }

    pub fn select(&mut self, columns: Vec<String>) -> Result<&mut Self, FilterError> {
        Self::validate_select_columns(&columns)?;
        self.select_columns = columns;
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(&order_spec)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: i32, offset: Option<i32>) -> Result<&mut Self, FilterError> {
        if limit < 0 { return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string())); }
        if let Some(off) = offset { self.offset(off)?; }

        // Apply max limit from config
        let max_limit = crate::config::CONFIG.filter.max_limit.unwrap_or(i32::MAX);
        let applied_limit = if limit > max_limit {
            if crate::config::CONFIG.filter.debug_logging {
                tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max_limit);
            }
            max_limit
        } else {
            limit
        };

        self.limit = Some(applied_limit);
        Ok(self)
    }

    pub fn offset(&mut self, offset: i32) -> Result<&mut Self, FilterError> {
        if offset < 0 { return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string())); }
        self.offset = Some(offset);
        Ok(self)
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let select_clause = self.build_select_clause();
        let where_result = self.to_where_sql()?;
        let order_clause = FilterOrder::generate(&self.order_data);
        let limit_clause = self.build_limit_clause();

        let query = [
            format!("SELECT {}", select_clause),
            format!("FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_result.query),
            order_clause,
            limit_clause,
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        if crate::config::CONFIG.filter.debug_logging {
            tracing::debug!("Filter SQL: {} ({} params)", query, where_result.params.len());
        }

        Ok(SqlResult { query, params: where_result.params })
    }

    pub fn to_where_sql(&self) -> Result<SqlResult, FilterError> {
        let (query, params) = match self.where_data {
            Some(ref where_data) => FilterWhere::generate(where_data, 0, &self.options)?,
            None => FilterWhere::generate_empty(&self.options),
        };
        Ok(SqlResult { query, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let query = format!("SELECT COUNT(*) as count FROM \"{}\" WHERE {}", self.table_name, where_result.query);
        Ok(SqlResult { query, params: where_result.params })
    }

    /// `UPDATE .. SET is_deleted = true` over the rows the filter matches
    pub fn to_soft_delete_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let query = format!(
            "UPDATE \"{}\" SET \"is_deleted\" = true, \"updated_at\" = now() WHERE {} RETURNING \"id\"",
            self.table_name, where_result.query
        );
        Ok(SqlResult { query, params: where_result.params })
    }

    /// Physical delete over the rows the filter matches
    pub fn to_delete_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let query = format!(
            "DELETE FROM \"{}\" WHERE {} RETURNING \"id\"",
            self.table_name, where_result.query
        );
        Ok(SqlResult { query, params: where_result.params })
    }

    fn validate_table_name(name: &str) -> Result<(), FilterError> {
        if name.is_empty() { return Err(FilterError::InvalidTableName("Table name cannot be empty".to_string())); }
        if !is_identifier(name) {
            return Err(FilterError::InvalidTableName(format!("Invalid table name format: {}", name)));
        }
        Ok(())
    }

    fn validate_select_columns(columns: &[String]) -> Result<(), FilterError> {
        for column in columns {
            if column == "*" { continue; }
            if !is_identifier(column) {
                return Err(FilterError::InvalidColumn(format!("Invalid column name format: {}", column)));
            }
        }
        Ok(())
    }

    fn build_select_clause(&self) -> String {
        if self.select_columns.is_empty() || self.select_columns.iter().any(|c| c == "*") {
            "*".to_string()
        } else {
            self.select_columns.iter().map(|c| format!("\"{}\"", c)).collect::<Vec<_>>().join(", ")
        }
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }
}
