use std::sync::Arc;

use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{Venue, VenueSummary};
use crate::database::{DatabaseError, Repository};
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::Listing;
use crate::scope::{all_of, AuthContext, ListParams, ListSpec, Requester, Scope, ScopeColumns};
use crate::services::consistency::{ConsistencyService, References};
use crate::services::media::{MediaKind, MediaStore};
use crate::validation::{AddVenueRequest, UpdateVenueRequest};

pub const VENUES: ListSpec = ListSpec {
    table: "venues",
    columns: ScopeColumns::VENUES,
    search_fields: &["name", "address"],
    sortable: &["name", "created_at", "updated_at", "is_active"],
    has_active: true,
};

/// One uploaded file from the update form
#[derive(Debug, Clone)]
pub struct Upload {
    pub kind: MediaKind,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Split current media into kept and dropped. `keep = None` keeps everything;
/// paths not already on the venue are ignored.
pub fn partition_media(current: &[String], keep: Option<&[String]>) -> (Vec<String>, Vec<String>) {
    match keep {
        None => (current.to_vec(), vec![]),
        Some(keep) => current.iter().cloned().partition(|path| keep.contains(path)),
    }
}

pub struct VenueService {
    pool: PgPool,
    repo: Repository<Venue>,
}

impl VenueService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, repo: Repository::new("venues") }
    }

    fn scoped(&self, ctx: &AuthContext, more: Vec<Value>) -> Value {
        let mut parts = vec![ctx.scope().to_filter(VENUES.columns)];
        parts.extend(more);
        all_of(parts)
    }

    pub async fn create_one(&self, ctx: &AuthContext, req: AddVenueRequest) -> Result<Venue, ApiError> {
        if matches!(ctx.requester, Requester::VenueSubAdmin { .. }) {
            return Err(ApiError::permission_denied("Sub-admins cannot create venues"));
        }
        ctx.require_city(req.city)?;

        ConsistencyService::new(self.pool.clone())
            .verify(&References { city: Some(req.city), sports: req.sports.clone(), ..Default::default() })
            .await?;

        let venue = sqlx::query_as::<_, Venue>(
            "INSERT INTO venues (id, name, address, city_id, sport_ids, latitude, longitude, venue_type, is_active, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(req.name.trim())
        .bind(req.address.trim())
        .bind(req.city)
        .bind(&req.sports)
        .bind(req.latitude)
        .bind(req.longitude)
        .bind(req.venue_type.as_deref())
        .bind(req.is_active.unwrap_or(true))
        .bind(ctx.admin_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        tracing::info!("Venue {} '{}' created by {}", venue.id, venue.name, ctx.admin_id);
        Ok(venue)
    }

    pub async fn select_page(&self, ctx: &AuthContext, params: &ListParams) -> Result<Listing<Venue>, ApiError> {
        let filter = params.to_filter(&ctx.scope(), &VENUES, vec![])?;
        let (rows, total) = self.repo.select_page(&self.pool, filter).await?;
        Ok(Listing { total, rows })
    }

    /// Unauthenticated listing: active venues only
    pub async fn select_public(&self, params: &ListParams) -> Result<Listing<Venue>, ApiError> {
        let filter = params.to_filter(&Scope::Unrestricted, &VENUES, vec![json!({ "is_active": true })])?;
        let (rows, total) = self.repo.select_page(&self.pool, filter).await?;
        Ok(Listing { total, rows })
    }

    pub async fn select_404(&self, ctx: &AuthContext, id: Uuid) -> Result<Venue, ApiError> {
        let filter = FilterData::with_where(self.scoped(ctx, vec![json!({ "id": id })]));
        self.repo
            .select_one(&self.pool, filter)
            .await?
            .ok_or_else(|| ApiError::not_found("Venue not found"))
    }

    pub async fn update_404(
        &self,
        ctx: &AuthContext,
        media: &Arc<dyn MediaStore>,
        req: UpdateVenueRequest,
        uploads: Vec<Upload>,
    ) -> Result<Venue, ApiError> {
        let id = req.id.ok_or_else(|| ApiError::validation("id", "id is required"))?;
        let existing = self.select_404(ctx, id).await?;

        let city = req.city.unwrap_or(existing.city_id);
        if city != existing.city_id {
            ctx.require_city(city)?;
        }
        ConsistencyService::new(self.pool.clone())
            .verify(&References {
                city: req.city.map(|_| city),
                sports: req.sports.clone().unwrap_or_default(),
                ..Default::default()
            })
            .await?;

        let (mut images, dropped_images) = partition_media(&existing.images, req.keep_images.as_deref());
        let (mut videos, dropped_videos) = partition_media(&existing.videos, req.keep_videos.as_deref());

        let mut stored = Vec::new();
        for upload in &uploads {
            match media.store(existing.id, upload.kind, &upload.file_name, &upload.bytes).await {
                Ok(path) => stored.push((upload.kind, path)),
                Err(e) => {
                    discard(media, stored.iter().map(|(_, p)| p)).await;
                    return Err(e.into());
                }
            }
        }
        for (kind, path) in &stored {
            match kind {
                MediaKind::Image => images.push(path.clone()),
                MediaKind::Video => videos.push(path.clone()),
            }
        }

        let updated = sqlx::query_as::<_, Venue>(
            "UPDATE venues SET \
                name = COALESCE($2, name), \
                address = COALESCE($3, address), \
                city_id = $4, \
                sport_ids = COALESCE($5, sport_ids), \
                latitude = COALESCE($6, latitude), \
                longitude = COALESCE($7, longitude), \
                venue_type = COALESCE($8, venue_type), \
                is_active = COALESCE($9, is_active), \
                images = $10, \
                videos = $11, \
                updated_at = now() \
             WHERE id = $1 AND NOT is_deleted RETURNING *",
        )
        .bind(existing.id)
        .bind(req.name.as_deref().map(str::trim))
        .bind(req.address.as_deref().map(str::trim))
        .bind(city)
        .bind(req.sports.as_ref())
        .bind(req.latitude)
        .bind(req.longitude)
        .bind(req.venue_type.as_deref())
        .bind(req.is_active)
        .bind(&images)
        .bind(&videos)
        .fetch_optional(&self.pool)
        .await;

        let updated = match updated {
            Ok(Some(venue)) => venue,
            Ok(None) => {
                discard(media, stored.iter().map(|(_, p)| p)).await;
                return Err(ApiError::not_found("Venue not found"));
            }
            Err(e) => {
                discard(media, stored.iter().map(|(_, p)| p)).await;
                return Err(DatabaseError::from(e).into());
            }
        };

        discard(media, dropped_images.iter().chain(dropped_videos.iter())).await;
        tracing::info!(
            "Venue {} updated by {} ({} file(s) added)",
            updated.id,
            ctx.admin_id,
            stored.len()
        );
        Ok(updated)
    }

    pub async fn delete_many(&self, ctx: &AuthContext, ids: &[Uuid]) -> Result<Vec<Uuid>, ApiError> {
        let filter = FilterData::with_where(self.scoped(ctx, vec![json!({ "id": { "$in": ids } })]));
        let removed = self.repo.soft_delete(&self.pool, filter).await?;
        if removed.is_empty() {
            return Err(ApiError::not_found("No matching venues found"));
        }
        tracing::info!("{} venue(s) removed by {}", removed.len(), ctx.admin_id);
        Ok(removed)
    }

    pub async fn fetch_summaries(&self, ctx: &AuthContext) -> Result<Vec<VenueSummary>, ApiError> {
        let filter = FilterData {
            select: Some(vec!["id".into(), "name".into(), "city_id".into()]),
            where_clause: Some(self.scoped(ctx, vec![json!({ "is_active": true })])),
            order: Some(json!("name asc")),
            ..Default::default()
        };
        Ok(Repository::<VenueSummary>::new("venues").select_any(&self.pool, filter).await?)
    }
}

/// Best-effort removal; failures are logged, never surfaced
async fn discard<'a>(media: &Arc<dyn MediaStore>, paths: impl Iterator<Item = &'a String>) {
    for path in paths {
        if let Err(e) = media.remove(path).await {
            tracing::warn!("Could not remove media {}: {}", path, e);
        }
    }
}
