// handlers/venues.rs - venue endpoints, including the multipart update form

use axum::{
    extract::{Multipart, State},
    Extension,
};
use serde_json::{json, Value};

use crate::database::models::{Venue, VenueSummary};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Listing};
use crate::scope::{Action, AuthContext, ListParams, Menu};
use crate::services::media::MediaKind;
use crate::services::venue_service::Upload;
use crate::services::VenueService;
use crate::state::AppState;
use crate::validation::{AddVenueRequest, IdQuery, IdsPayload, UpdateVenueRequest, Validate, ValidJson, ValidQuery};

pub async fn add_venue(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ValidJson(req): ValidJson<AddVenueRequest>,
) -> ApiResult<Venue> {
    ctx.authorize(Menu::Venues, Action::Add)?;
    let venue = VenueService::new(state.pool).create_one(&ctx, req).await?;
    Ok(ApiResponse::success("Venue added successfully", venue))
}

/// POST /update-venue (multipart/form-data)
///
/// Text parts carry the scalar fields, `keep_images`/`keep_videos` list the
/// existing media to retain, and `images`/`videos` file parts are appended.
pub async fn update_venue(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    multipart: Multipart,
) -> ApiResult<Venue> {
    let (req, uploads) = read_update_form(multipart).await?;
    req.validate()?;
    ctx.authorize(Menu::Venues, Action::Update)?;

    let venue = VenueService::new(state.pool)
        .update_404(&ctx, &state.media, req, uploads)
        .await?;
    Ok(ApiResponse::success("Venue updated successfully", venue))
}

pub async fn remove_venues(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ValidJson(payload): ValidJson<IdsPayload>,
) -> ApiResult<Value> {
    ctx.authorize(Menu::Venues, Action::Delete)?;
    let removed = VenueService::new(state.pool).delete_many(&ctx, &payload.ids).await?;
    Ok(ApiResponse::success("Venues removed successfully", json!({ "ids": removed })))
}

pub async fn get_venues(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ValidQuery(params): ValidQuery<ListParams>,
) -> ApiResult<Listing<Venue>> {
    ctx.authorize(Menu::Venues, Action::View)?;
    let listing = VenueService::new(state.pool).select_page(&ctx, &params).await?;
    Ok(ApiResponse::success("Venues fetched successfully", listing))
}

pub async fn get_venue(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ValidQuery(query): ValidQuery<IdQuery>,
) -> ApiResult<Venue> {
    ctx.authorize(Menu::Venues, Action::View)?;
    let venue = VenueService::new(state.pool).select_404(&ctx, query.id).await?;
    Ok(ApiResponse::success("Venue fetched successfully", venue))
}

pub async fn fetch_venues(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Vec<VenueSummary>> {
    let venues = VenueService::new(state.pool).fetch_summaries(&ctx).await?;
    Ok(ApiResponse::success("Venues fetched successfully", venues))
}

async fn read_update_form(mut multipart: Multipart) -> Result<(UpdateVenueRequest, Vec<Upload>), ApiError> {
    let mut req = UpdateVenueRequest::default();
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation("body", e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let kind = match name.as_str() {
            "images" => Some(MediaKind::Image),
            "videos" => Some(MediaKind::Video),
            _ => None,
        };

        match kind {
            Some(kind) => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                // empty file inputs still submit a part
                if file_name.is_empty() {
                    continue;
                }
                kind.accept(&file_name)?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(kind.field(), e.body_text()))?;
                uploads.push(Upload { kind, file_name, bytes: bytes.to_vec() });
            }
            None => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(name.clone(), e.body_text()))?;
                req.set_field(&name, &value)?;
            }
        }
    }

    Ok((req, uploads))
}
