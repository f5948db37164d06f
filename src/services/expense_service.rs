use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::database::models::{VenueExpense, VenueExpenseView};
use crate::database::{DatabaseError, Repository};
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::Listing;
use crate::scope::{all_of, AuthContext, ListParams, ListSpec, ScopeColumns};
use crate::services::conflict::{ConflictGuard, NaturalKey};
use crate::services::consistency::{ConsistencyService, References};
use crate::services::report::{render_expense_html, report_name, ReportRenderer};
use crate::validation::{AddVenueExpenseRequest, UpdateVenueExpenseRequest, Validate};

pub const EXPENSES: ListSpec = ListSpec {
    table: "venue_expenses",
    columns: ScopeColumns::EXPENSES,
    search_fields: &[],
    sortable: &["month", "year", "created_at", "updated_at"],
    has_active: false,
};

/// `get-venue-expenses` query: the shared list parameters plus the period
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseListQuery {
    #[serde(flatten)]
    pub list: ListParams,
    pub month: Option<String>,
    pub year: Option<String>,
}

impl ExpenseListQuery {
    pub fn period_filter(&self) -> Result<Vec<Value>, ApiError> {
        let mut extra = Vec::new();
        if let Some(month) = self.month.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let month: i16 = month
                .parse()
                .ok()
                .filter(|m| (1..=12).contains(m))
                .ok_or_else(|| ApiError::validation("month", "month must be between 1 and 12"))?;
            extra.push(json!({ "month": month }));
        }
        if let Some(year) = self.year.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let year: i32 = year
                .parse()
                .map_err(|_| ApiError::validation("year", "year must be a number"))?;
            extra.push(json!({ "year": year }));
        }
        Ok(extra)
    }
}

impl Validate for ExpenseListQuery {
    fn validate(&self) -> Result<(), ApiError> {
        self.period_filter().map(|_| ())
    }
}

/// Venue expenses are hard-deleted
pub struct ExpenseService {
    pool: PgPool,
    repo: Repository<VenueExpense>,
}

impl ExpenseService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, repo: Repository::hard_delete("venue_expenses") }
    }

    fn scoped(&self, ctx: &AuthContext, more: Vec<Value>) -> Value {
        let mut parts = vec![ctx.scope().to_filter(EXPENSES.columns)];
        parts.extend(more);
        all_of(parts)
    }

    pub async fn create_one(&self, ctx: &AuthContext, req: AddVenueExpenseRequest) -> Result<VenueExpenseView, ApiError> {
        ctx.require_venue(req.city, req.venue)?;

        ConsistencyService::new(self.pool.clone())
            .verify(&References { city: Some(req.city), venue: Some(req.venue), ..Default::default() })
            .await?;
        ConflictGuard::new(self.pool.clone())
            .ensure_unique(&NaturalKey::Expense { venue: req.venue, month: req.month, year: req.year }, None)
            .await?;

        let expense = sqlx::query_as::<_, VenueExpense>(
            "INSERT INTO venue_expenses (id, city_id, venue_id, month, year, expenses, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(req.city)
        .bind(req.venue)
        .bind(req.month)
        .bind(req.year)
        .bind(Json(&req.expenses))
        .bind(ctx.admin_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        tracing::info!("Expense {} for venue {} ({}/{}) created", expense.id, expense.venue_id, expense.month, expense.year);
        Ok(expense.into())
    }

    pub async fn select_page(&self, ctx: &AuthContext, query: &ExpenseListQuery) -> Result<Listing<VenueExpenseView>, ApiError> {
        let filter = query.list.to_filter(&ctx.scope(), &EXPENSES, query.period_filter()?)?;
        let (rows, total) = self.repo.select_page(&self.pool, filter).await?;
        Ok(Listing { total, rows: rows.into_iter().map(VenueExpenseView::from).collect() })
    }

    pub async fn select_404(&self, ctx: &AuthContext, id: Uuid) -> Result<VenueExpense, ApiError> {
        let filter = FilterData::with_where(self.scoped(ctx, vec![json!({ "id": id })]));
        self.repo
            .select_one(&self.pool, filter)
            .await?
            .ok_or_else(|| ApiError::not_found("Expense not found"))
    }

    pub async fn update_404(&self, ctx: &AuthContext, req: UpdateVenueExpenseRequest) -> Result<VenueExpenseView, ApiError> {
        let existing = self.select_404(ctx, req.id).await?;

        let month = req.month.unwrap_or(existing.month);
        let year = req.year.unwrap_or(existing.year);
        if (month, year) != (existing.month, existing.year) {
            ConflictGuard::new(self.pool.clone())
                .ensure_unique(&NaturalKey::Expense { venue: existing.venue_id, month, year }, Some(existing.id))
                .await?;
        }

        let expense = sqlx::query_as::<_, VenueExpense>(
            "UPDATE venue_expenses SET \
                month = $2, \
                year = $3, \
                expenses = COALESCE($4, expenses), \
                updated_at = now() \
             WHERE id = $1 RETURNING *",
        )
        .bind(existing.id)
        .bind(month)
        .bind(year)
        .bind(req.expenses.as_ref().map(Json))
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?
        .ok_or_else(|| ApiError::not_found("Expense not found"))?;

        tracing::info!("Expense {} updated by {}", expense.id, ctx.admin_id);
        Ok(expense.into())
    }

    pub async fn delete_many(&self, ctx: &AuthContext, ids: &[Uuid]) -> Result<Vec<Uuid>, ApiError> {
        let filter = FilterData::with_where(self.scoped(ctx, vec![json!({ "id": { "$in": ids } })]));
        let removed = self.repo.delete(&self.pool, filter).await?;
        if removed.is_empty() {
            return Err(ApiError::not_found("No matching expenses found"));
        }
        tracing::info!("{} expense(s) deleted by {}", removed.len(), ctx.admin_id);
        Ok(removed)
    }

    /// Render the expense to PDF. Returns the download file name and the bytes.
    pub async fn report(
        &self,
        ctx: &AuthContext,
        renderer: &Arc<dyn ReportRenderer>,
        id: Uuid,
    ) -> Result<(String, Vec<u8>), ApiError> {
        let expense = self.select_404(ctx, id).await?;
        let (venue_name,): (String,) = sqlx::query_as("SELECT name FROM venues WHERE id = $1")
            .bind(expense.venue_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?
            .unwrap_or_else(|| ("Unknown venue".to_string(),));

        let html = render_expense_html(&expense, &venue_name);
        let pdf = renderer.render_pdf(&report_name(&expense), &html).await?;
        let file_name = format!("expense-report-{:04}-{:02}.pdf", expense.year, expense.month);
        Ok((file_name, pdf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_filter_parses_month_and_year() {
        let q = ExpenseListQuery { month: Some("4".into()), year: Some("2024".into()), ..Default::default() };
        assert_eq!(q.period_filter().unwrap(), vec![json!({ "month": 4 }), json!({ "year": 2024 })]);
    }

    #[test]
    fn bad_month_names_the_field() {
        let q = ExpenseListQuery { month: Some("13".into()), ..Default::default() };
        let err = q.validate().unwrap_err();
        assert_eq!(err.to_json()["data"]["field"], "month");
    }

    #[test]
    fn expenses_cannot_filter_on_is_active() {
        let list = ListParams { is_active: Some("true".into()), ..Default::default() };
        let err = list.to_filter(&crate::scope::Scope::Unrestricted, &EXPENSES, vec![]).unwrap_err();
        assert_eq!(err.to_json()["data"]["field"], "is_active");
    }
}
