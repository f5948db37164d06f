use chrono::Utc;
use serde_json::{json, Value};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::database::models::SlotTime;
use crate::database::{DatabaseError, Repository};
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::Listing;
use crate::scope::{all_of, AuthContext, ListParams, ListSpec, Requester, ScopeColumns};
use crate::services::conflict::{ConflictGuard, NaturalKey};
use crate::services::consistency::{ConsistencyService, References};
use crate::services::usage;
use crate::validation::{AddSlotTimeRequest, UpdateSlotTimeRequest};

pub const SLOT_TIMES: ListSpec = ListSpec {
    table: "slot_times",
    columns: ScopeColumns::SLOT_TIMES,
    search_fields: &["slot"],
    sortable: &["slot", "created_at", "updated_at", "is_active"],
    has_active: true,
};

/// Sub-admins with an explicit ground list may only touch those grounds
pub fn require_ground(ctx: &AuthContext, ground: Uuid) -> Result<(), ApiError> {
    match &ctx.requester {
        Requester::VenueSubAdmin { grounds, .. } if !grounds.is_empty() && !grounds.contains(&ground) => {
            tracing::warn!("Admin {} acted outside scope (ground {})", ctx.admin_id, ground);
            Err(ApiError::permission_denied("Ground is outside your assigned scope"))
        }
        _ => Ok(()),
    }
}

pub struct SlotTimeService {
    pool: PgPool,
    repo: Repository<SlotTime>,
}

impl SlotTimeService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, repo: Repository::new("slot_times") }
    }

    fn scoped(&self, ctx: &AuthContext, more: Vec<Value>) -> Value {
        let mut parts = vec![ctx.scope().to_filter(SLOT_TIMES.columns)];
        parts.extend(more);
        all_of(parts)
    }

    pub async fn create_one(&self, ctx: &AuthContext, req: AddSlotTimeRequest) -> Result<SlotTime, ApiError> {
        ctx.require_venue(req.city, req.venue)?;
        require_ground(ctx, req.ground)?;

        ConsistencyService::new(self.pool.clone())
            .verify(&References {
                city: Some(req.city),
                venue: Some(req.venue),
                ground: Some(req.ground),
                ..Default::default()
            })
            .await?;
        let slot = req.slot.trim();
        ConflictGuard::new(self.pool.clone())
            .ensure_unique(&NaturalKey::Slot { ground: req.ground, slot }, None)
            .await?;

        let created = sqlx::query_as::<_, SlotTime>(
            "INSERT INTO slot_times (id, ground_id, venue_id, city_id, slot, price, is_active, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(req.ground)
        .bind(req.venue)
        .bind(req.city)
        .bind(slot)
        .bind(Json(&req.price))
        .bind(req.is_active.unwrap_or(true))
        .bind(ctx.admin_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        tracing::info!("Slot time {} ({}) created on ground {}", created.id, created.slot, created.ground_id);
        Ok(created)
    }

    pub async fn select_page(&self, ctx: &AuthContext, params: &ListParams) -> Result<Listing<SlotTime>, ApiError> {
        let filter = params.to_filter(&ctx.scope(), &SLOT_TIMES, vec![])?;
        let (rows, total) = self.repo.select_page(&self.pool, filter).await?;
        Ok(Listing { total, rows })
    }

    /// Update under the usage guard: the slot row is locked and its
    /// dependents counted inside the same transaction as the write
    pub async fn update_404(&self, ctx: &AuthContext, req: UpdateSlotTimeRequest) -> Result<SlotTime, ApiError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;

        let existing = self
            .repo
            .select_one(&mut *tx, FilterData::with_where(self.scoped(ctx, vec![json!({ "id": req.id })])))
            .await?
            .ok_or_else(|| ApiError::not_found("Slot time not found"))?;

        // a concurrent remove between the read and the lock leaves nothing to lock
        if usage::lock_unused(&mut tx, &[existing.id], Utc::now().date_naive()).await?.is_empty() {
            return Err(ApiError::not_found("Slot time not found"));
        }

        if let Some(slot) = req.slot.as_deref().map(str::trim) {
            if slot != existing.slot {
                ConflictGuard::new(self.pool.clone())
                    .ensure_unique(&NaturalKey::Slot { ground: existing.ground_id, slot }, Some(existing.id))
                    .await?;
            }
        }

        let updated = sqlx::query_as::<_, SlotTime>(
            "UPDATE slot_times SET \
                slot = COALESCE($2, slot), \
                price = COALESCE($3, price), \
                is_active = COALESCE($4, is_active), \
                updated_at = now() \
             WHERE id = $1 AND NOT is_deleted RETURNING *",
        )
        .bind(existing.id)
        .bind(req.slot.as_deref().map(str::trim))
        .bind(req.price.as_ref().map(Json))
        .bind(req.is_active)
        .fetch_optional(&mut *tx)
        .await
        .map_err(DatabaseError::from)?
        .ok_or_else(|| ApiError::not_found("Slot time not found"))?;

        tx.commit().await.map_err(DatabaseError::from)?;
        tracing::info!("Slot time {} updated by {}", updated.id, ctx.admin_id);
        Ok(updated)
    }

    /// Soft-delete in-scope ids under the usage guard; any blocked slot
    /// aborts the whole batch
    pub async fn delete_many(&self, ctx: &AuthContext, ids: &[Uuid]) -> Result<Vec<Uuid>, ApiError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;

        let in_scope: Vec<Uuid> = self
            .repo
            .select_any(&mut *tx, FilterData::with_where(self.scoped(ctx, vec![json!({ "id": { "$in": ids } })])))
            .await?
            .into_iter()
            .map(|slot| slot.id)
            .collect();
        if in_scope.is_empty() {
            return Err(ApiError::not_found("No matching slot times found"));
        }

        let locked = usage::lock_unused(&mut tx, &in_scope, Utc::now().date_naive()).await?;
        let removed = self
            .repo
            .soft_delete(&mut *tx, FilterData::with_where(json!({ "id": { "$in": locked } })))
            .await?;

        tx.commit().await.map_err(DatabaseError::from)?;
        tracing::info!("{} slot time(s) removed by {}", removed.len(), ctx.admin_id);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ground_list_restricts_only_when_present() {
        let city = Uuid::new_v4();
        let ground = Uuid::new_v4();
        let open = AuthContext {
            admin_id: Uuid::new_v4(),
            requester: Requester::VenueSubAdmin { city, venues: vec![], grounds: vec![] },
            permissions: vec![],
        };
        assert!(require_ground(&open, Uuid::new_v4()).is_ok());

        let pinned = AuthContext {
            requester: Requester::VenueSubAdmin { city, venues: vec![], grounds: vec![ground] },
            ..open
        };
        assert!(require_ground(&pinned, ground).is_ok());
        assert_eq!(require_ground(&pinned, Uuid::new_v4()).unwrap_err().status_code(), 403);
    }
}
