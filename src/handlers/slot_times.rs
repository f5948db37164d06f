// handlers/slot_times.rs - slot time endpoints

use axum::{extract::State, Extension};
use serde_json::{json, Value};

use crate::database::models::SlotTime;
use crate::middleware::{ApiResponse, ApiResult, Listing};
use crate::scope::{Action, AuthContext, ListParams, Menu};
use crate::services::SlotTimeService;
use crate::state::AppState;
use crate::validation::{AddSlotTimeRequest, IdsPayload, UpdateSlotTimeRequest, ValidJson, ValidQuery};

pub async fn add_slot_time(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ValidJson(req): ValidJson<AddSlotTimeRequest>,
) -> ApiResult<SlotTime> {
    ctx.authorize(Menu::SlotTimes, Action::Add)?;
    let slot = SlotTimeService::new(state.pool).create_one(&ctx, req).await?;
    Ok(ApiResponse::success("Slot time added successfully", slot))
}

pub async fn get_slot_times(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ValidQuery(params): ValidQuery<ListParams>,
) -> ApiResult<Listing<SlotTime>> {
    ctx.authorize(Menu::SlotTimes, Action::View)?;
    let listing = SlotTimeService::new(state.pool).select_page(&ctx, &params).await?;
    Ok(ApiResponse::success("Slot times fetched successfully", listing))
}

/// Rejected with 406 while the slot is referenced by upcoming events,
/// academies, memberships or bookings
pub async fn update_slot_time(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ValidJson(req): ValidJson<UpdateSlotTimeRequest>,
) -> ApiResult<SlotTime> {
    ctx.authorize(Menu::SlotTimes, Action::Update)?;
    let slot = SlotTimeService::new(state.pool).update_404(&ctx, req).await?;
    Ok(ApiResponse::success("Slot time updated successfully", slot))
}

pub async fn remove_slot_times(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ValidJson(payload): ValidJson<IdsPayload>,
) -> ApiResult<Value> {
    ctx.authorize(Menu::SlotTimes, Action::Delete)?;
    let removed = SlotTimeService::new(state.pool).delete_many(&ctx, &payload.ids).await?;
    Ok(ApiResponse::success("Slot times removed successfully", json!({ "ids": removed })))
}
