use sqlx::{postgres::{PgArguments, PgRow}, FromRow, PgExecutor, Postgres};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::filter::types::{SqlParam, SqlResult};
use crate::filter::{Filter, FilterData};

type PgQueryAs<'q, O> = sqlx::query::QueryAs<'q, Postgres, O, PgArguments>;

pub struct QueryBuilder<T> {
    table_name: String,
    soft_delete: bool,
    filter: Option<Filter>,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> QueryBuilder<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub fn new(table_name: impl Into<String>, soft_delete: bool) -> Result<Self, DatabaseError> {
        let name = table_name.into();
        // Reuse Filter table name validation
        Filter::new(&name).map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        Ok(Self {
            table_name: name,
            soft_delete,
            filter: None,
            _phantom: std::marker::PhantomData,
        })
    }

    pub fn filter(mut self, filter_data: FilterData) -> Result<Self, DatabaseError> {
        let mut filter = Filter::new(&self.table_name).map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        filter.soft_delete(self.soft_delete);
        filter
            .assign(filter_data)
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        self.filter = Some(filter);
        Ok(self)
    }

    pub async fn select_all<'c>(self, executor: impl PgExecutor<'c>) -> Result<Vec<T>, DatabaseError> {
        let sql_result = self.sql_result(Filter::to_sql)?;
        let rows = bind_all(sqlx::query_as::<_, T>(&sql_result.query), &sql_result.params)
            .fetch_all(executor)
            .await?;
        Ok(rows)
    }

    pub async fn select_optional<'c>(self, executor: impl PgExecutor<'c>) -> Result<Option<T>, DatabaseError> {
        let sql_result = self.sql_result(Filter::to_sql)?;
        let row = bind_all(sqlx::query_as::<_, T>(&sql_result.query), &sql_result.params)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    pub async fn count<'c>(self, executor: impl PgExecutor<'c>) -> Result<i64, DatabaseError> {
        let sql_result = self.sql_result(Filter::to_count_sql)?;
        let (count,) = bind_all(sqlx::query_as::<_, (i64,)>(&sql_result.query), &sql_result.params)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    /// Flag matching rows as deleted; returns the ids that were flipped
    pub async fn soft_delete_matching<'c>(self, executor: impl PgExecutor<'c>) -> Result<Vec<Uuid>, DatabaseError> {
        let sql_result = self.sql_result(Filter::to_soft_delete_sql)?;
        returning_ids(&sql_result, executor).await
    }

    /// Physically remove matching rows; returns the removed ids
    pub async fn delete_matching<'c>(self, executor: impl PgExecutor<'c>) -> Result<Vec<Uuid>, DatabaseError> {
        let sql_result = self.sql_result(Filter::to_delete_sql)?;
        returning_ids(&sql_result, executor).await
    }

    fn sql_result(
        &self,
        render: fn(&Filter) -> Result<SqlResult, crate::filter::FilterError>,
    ) -> Result<SqlResult, DatabaseError> {
        match &self.filter {
            Some(filter) => render(filter).map_err(|e| DatabaseError::QueryError(e.to_string())),
            None => {
                let mut filter = Filter::new(&self.table_name).map_err(|e| DatabaseError::QueryError(e.to_string()))?;
                filter.soft_delete(self.soft_delete);
                render(&filter).map_err(|e| DatabaseError::QueryError(e.to_string()))
            }
        }
    }
}

async fn returning_ids<'c>(sql_result: &SqlResult, executor: impl PgExecutor<'c>) -> Result<Vec<Uuid>, DatabaseError> {
    let rows = bind_all(sqlx::query_as::<_, (Uuid,)>(&sql_result.query), &sql_result.params)
        .fetch_all(executor)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

fn bind_all<'q, O>(mut q: PgQueryAs<'q, O>, params: &'q [SqlParam]) -> PgQueryAs<'q, O>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    for p in params {
        q = bind_param(q, p);
    }
    q
}

fn bind_param<'q, O>(q: PgQueryAs<'q, O>, p: &'q SqlParam) -> PgQueryAs<'q, O>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match p {
        SqlParam::Null => q.bind(None::<String>),
        SqlParam::Bool(b) => q.bind(*b),
        SqlParam::Int(i) => q.bind(*i),
        SqlParam::Float(f) => q.bind(*f),
        SqlParam::Text(s) => q.bind(s.as_str()),
        SqlParam::Uuid(id) => q.bind(*id),
        SqlParam::Date(date) => q.bind(*date),
        SqlParam::Json(v) => q.bind(sqlx::types::Json(v)),
    }
}
