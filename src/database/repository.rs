use sqlx::{postgres::PgRow, FromRow, PgExecutor};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::query_builder::QueryBuilder;
use crate::filter::FilterData;

/// Filter-driven reads and batch deletes over one table.
///
/// Writes that carry entity-specific columns live in the entity services;
/// everything that is "find rows matching a scope" goes through here.
pub struct Repository<T> {
    table_name: &'static str,
    soft_delete: bool,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Repository<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    /// Repository over a table that soft-deletes via `is_deleted`
    pub fn new(table_name: &'static str) -> Self {
        Self {
            table_name,
            soft_delete: true,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Repository over a table whose rows are physically deleted
    pub fn hard_delete(table_name: &'static str) -> Self {
        Self {
            table_name,
            soft_delete: false,
            _phantom: std::marker::PhantomData,
        }
    }

    fn builder(&self, filter_data: FilterData) -> Result<QueryBuilder<T>, DatabaseError> {
        QueryBuilder::<T>::new(self.table_name, self.soft_delete)?.filter(filter_data)
    }

    pub async fn select_any<'c>(&self, executor: impl PgExecutor<'c>, filter_data: FilterData) -> Result<Vec<T>, DatabaseError> {
        self.builder(filter_data)?.select_all(executor).await
    }

    pub async fn select_one<'c>(&self, executor: impl PgExecutor<'c>, filter_data: FilterData) -> Result<Option<T>, DatabaseError> {
        self.builder(filter_data)?.select_optional(executor).await
    }

    pub async fn count<'c>(&self, executor: impl PgExecutor<'c>, filter_data: FilterData) -> Result<i64, DatabaseError> {
        // Pagination never applies to a count
        let filter_data = FilterData { limit: None, offset: None, order: None, select: None, ..filter_data };
        self.builder(filter_data)?.count(executor).await
    }

    /// Page of rows plus the total matching count (pagination ignored for the total)
    pub async fn select_page(&self, pool: &sqlx::PgPool, filter_data: FilterData) -> Result<(Vec<T>, i64), DatabaseError> {
        let total = self.count(pool, filter_data.clone()).await?;
        let rows = self.select_any(pool, filter_data).await?;
        Ok((rows, total))
    }

    /// Soft-delete rows matching the filter (typically scope AND id set)
    pub async fn soft_delete<'c>(&self, executor: impl PgExecutor<'c>, filter_data: FilterData) -> Result<Vec<Uuid>, DatabaseError> {
        if !self.soft_delete {
            return Err(DatabaseError::QueryError(format!("{} does not support soft delete", self.table_name)));
        }
        self.builder(filter_data)?.soft_delete_matching(executor).await
    }

    /// Physically delete rows matching the filter
    pub async fn delete<'c>(&self, executor: impl PgExecutor<'c>, filter_data: FilterData) -> Result<Vec<Uuid>, DatabaseError> {
        self.builder(filter_data)?.delete_matching(executor).await
    }
}
