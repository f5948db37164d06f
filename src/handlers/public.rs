// handlers/public.rs - unauthenticated catalogue and availability endpoints

use axum::extract::State;

use crate::database::models::{SlotTime, Venue};
use crate::middleware::{ApiResponse, ApiResult, Listing};
use crate::scope::ListParams;
use crate::services::availability::DaySlot;
use crate::services::{AvailabilityService, VenueService};
use crate::state::AppState;
use crate::validation::{AvailableSlotsQuery, EventSlotsQuery, ValidQuery};

/// GET /venues - active venues, no scope applied
pub async fn venues(State(state): State<AppState>, ValidQuery(params): ValidQuery<ListParams>) -> ApiResult<Listing<Venue>> {
    let listing = VenueService::new(state.pool).select_public(&params).await?;
    Ok(ApiResponse::success("Venues fetched successfully", listing))
}

/// GET /get-available-slots?ground&date
pub async fn get_available_slots(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<AvailableSlotsQuery>,
) -> ApiResult<Vec<DaySlot>> {
    let slots = AvailabilityService::new(state.pool).for_day(query.ground, query.date).await?;
    Ok(ApiResponse::success("Available slots fetched successfully", slots))
}

/// GET /available-slots-for-event?ground&start_date&end_date
pub async fn available_slots_for_event(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<EventSlotsQuery>,
) -> ApiResult<Vec<SlotTime>> {
    let slots = AvailabilityService::new(state.pool)
        .for_event(query.ground, query.start_date, query.end_date)
        .await?;
    Ok(ApiResponse::success("Available slots fetched successfully", slots))
}
