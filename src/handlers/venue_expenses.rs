// handlers/venue_expenses.rs - monthly venue expense endpoints

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};
use serde_json::{json, Value};

use crate::database::models::{VenueExpense, VenueExpenseView};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Listing};
use crate::scope::{Action, AuthContext, Menu};
use crate::services::expense_service::ExpenseListQuery;
use crate::services::ExpenseService;
use crate::state::AppState;
use crate::validation::{AddVenueExpenseRequest, IdQuery, IdsPayload, UpdateVenueExpenseRequest, ValidJson, ValidQuery};

pub async fn add_venue_expense(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ValidJson(req): ValidJson<AddVenueExpenseRequest>,
) -> ApiResult<VenueExpenseView> {
    ctx.authorize(Menu::Expenses, Action::Add)?;
    let expense = ExpenseService::new(state.pool).create_one(&ctx, req).await?;
    Ok(ApiResponse::success("Venue expense added successfully", expense))
}

/// GET /get-venue-expenses - list parameters plus optional `month`/`year`
pub async fn get_venue_expenses(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ValidQuery(query): ValidQuery<ExpenseListQuery>,
) -> ApiResult<Listing<VenueExpenseView>> {
    ctx.authorize(Menu::Expenses, Action::View)?;
    let listing = ExpenseService::new(state.pool).select_page(&ctx, &query).await?;
    Ok(ApiResponse::success("Venue expenses fetched successfully", listing))
}

pub async fn get_venue_expense(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ValidQuery(query): ValidQuery<IdQuery>,
) -> ApiResult<VenueExpenseView> {
    ctx.authorize(Menu::Expenses, Action::View)?;
    let expense: VenueExpense = ExpenseService::new(state.pool).select_404(&ctx, query.id).await?;
    Ok(ApiResponse::success("Venue expense fetched successfully", expense.into()))
}

pub async fn update_venue_expense(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ValidJson(req): ValidJson<UpdateVenueExpenseRequest>,
) -> ApiResult<VenueExpenseView> {
    ctx.authorize(Menu::Expenses, Action::Update)?;
    let expense = ExpenseService::new(state.pool).update_404(&ctx, req).await?;
    Ok(ApiResponse::success("Venue expense updated successfully", expense))
}

/// Expenses are removed outright, not soft-deleted
pub async fn remove_venue_expenses(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ValidJson(payload): ValidJson<IdsPayload>,
) -> ApiResult<Value> {
    ctx.authorize(Menu::Expenses, Action::Delete)?;
    let removed = ExpenseService::new(state.pool).delete_many(&ctx, &payload.ids).await?;
    Ok(ApiResponse::success("Venue expenses removed successfully", json!({ "ids": removed })))
}

/// GET /download-expense-report?id= - the PDF itself, not the JSON envelope
pub async fn download_expense_report(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ValidQuery(query): ValidQuery<IdQuery>,
) -> Result<Response, ApiError> {
    ctx.authorize(Menu::Expenses, Action::View)?;
    let (file_name, pdf) = ExpenseService::new(state.pool)
        .report(&ctx, &state.reports, query.id)
        .await?;

    tracing::info!("Expense report {} ({} bytes) sent to {}", file_name, pdf.len(), ctx.admin_id);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file_name)),
        ],
        pdf,
    )
        .into_response())
}
