use serde_json::{json, Value};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::database::models::{Role, RoleSummary};
use crate::database::{DatabaseError, Repository};
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::Listing;
use crate::scope::{all_of, AuthContext, ListParams, ListSpec, Requester, ScopeColumns};
use crate::services::conflict::{ConflictGuard, NaturalKey};
use crate::services::consistency::{ConsistencyService, References};
use crate::validation::{AddRoleRequest, UpdateRoleRequest};

pub const ROLES: ListSpec = ListSpec {
    table: "roles",
    columns: ScopeColumns::ROLES,
    search_fields: &["name"],
    sortable: &["name", "created_at", "updated_at", "is_active"],
    has_active: true,
};

/// Roles a tier may see beyond its city/venue scope: city admins never see
/// roles created by a super admin, sub-admins only see sub-admin roles
pub fn role_visibility(requester: &Requester) -> Value {
    match requester {
        Requester::CityAdmin { .. } => json!({ "added_by": { "$ne": "SA" } }),
        Requester::VenueSubAdmin { .. } => json!({ "added_by": "SUB" }),
        Requester::SuperAdmin | Requester::Restricted => json!({}),
    }
}

/// City and venue a new role is pinned to, defaulted and checked against the
/// creator's scope
pub fn role_placement(ctx: &AuthContext, city: Option<Uuid>, venue: Option<Uuid>) -> Result<(Option<Uuid>, Option<Uuid>), ApiError> {
    match &ctx.requester {
        Requester::SuperAdmin => Ok((city, venue)),
        Requester::CityAdmin { city: own } => {
            let city = city.unwrap_or(*own);
            ctx.require_city(city)?;
            Ok((Some(city), venue))
        }
        Requester::VenueSubAdmin { city: own, .. } => {
            let city = city.unwrap_or(*own);
            let venue = venue.ok_or_else(|| ApiError::validation("venue", "venue is required"))?;
            ctx.require_venue(city, venue)?;
            Ok((Some(city), Some(venue)))
        }
        Requester::Restricted => Err(ApiError::permission_denied("Your account has no admin tier")),
    }
}

pub struct RoleService {
    pool: PgPool,
    repo: Repository<Role>,
}

impl RoleService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, repo: Repository::new("roles") }
    }

    fn scoped(&self, ctx: &AuthContext, more: Vec<Value>) -> Value {
        let mut parts = vec![ctx.scope().to_filter(ROLES.columns), role_visibility(&ctx.requester)];
        parts.extend(more);
        all_of(parts)
    }

    pub async fn create_one(&self, ctx: &AuthContext, req: AddRoleRequest) -> Result<Role, ApiError> {
        let (city, venue) = role_placement(ctx, req.city, req.venue)?;
        let tier = ctx.requester.tier().ok_or_else(|| ApiError::permission_denied("Your account has no admin tier"))?;

        ConsistencyService::new(self.pool.clone())
            .verify(&References { city, venue, ..Default::default() })
            .await?;
        ConflictGuard::new(self.pool.clone())
            .ensure_unique(&NaturalKey::Role { name: &req.name, city, venue }, None)
            .await?;

        let role = sqlx::query_as::<_, Role>(
            "INSERT INTO roles (id, name, city_id, venue_id, permissions, added_by, is_active, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(req.name.trim())
        .bind(city)
        .bind(venue)
        .bind(Json(&req.permissions))
        .bind(tier.as_str())
        .bind(req.is_active.unwrap_or(true))
        .bind(ctx.admin_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        tracing::info!("Role {} '{}' created by {}", role.id, role.name, ctx.admin_id);
        Ok(role)
    }

    pub async fn select_page(&self, ctx: &AuthContext, params: &ListParams) -> Result<Listing<Role>, ApiError> {
        let filter = params.to_filter(&ctx.scope(), &ROLES, vec![role_visibility(&ctx.requester)])?;
        let (rows, total) = self.repo.select_page(&self.pool, filter).await?;
        Ok(Listing { total, rows })
    }

    pub async fn select_404(&self, ctx: &AuthContext, id: Uuid) -> Result<Role, ApiError> {
        let filter = FilterData::with_where(self.scoped(ctx, vec![json!({ "id": id })]));
        self.repo
            .select_one(&self.pool, filter)
            .await?
            .ok_or_else(|| ApiError::not_found("Role not found"))
    }

    pub async fn update_404(&self, ctx: &AuthContext, req: UpdateRoleRequest) -> Result<Role, ApiError> {
        let existing = self.select_404(ctx, req.id).await?;

        if let Some(name) = &req.name {
            if !name.trim().eq_ignore_ascii_case(&existing.name) {
                ConflictGuard::new(self.pool.clone())
                    .ensure_unique(
                        &NaturalKey::Role { name, city: existing.city_id, venue: existing.venue_id },
                        Some(existing.id),
                    )
                    .await?;
            }
        }

        let role = sqlx::query_as::<_, Role>(
            "UPDATE roles SET \
                name = COALESCE($2, name), \
                permissions = COALESCE($3, permissions), \
                is_active = COALESCE($4, is_active), \
                updated_at = now() \
             WHERE id = $1 AND NOT is_deleted RETURNING *",
        )
        .bind(existing.id)
        .bind(req.name.as_deref().map(str::trim))
        .bind(req.permissions.as_ref().map(Json))
        .bind(req.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?
        .ok_or_else(|| ApiError::not_found("Role not found"))?;

        tracing::info!("Role {} updated by {}", role.id, ctx.admin_id);
        Ok(role)
    }

    /// Soft-delete the ids that fall inside the requester's scope
    pub async fn delete_many(&self, ctx: &AuthContext, ids: &[Uuid]) -> Result<Vec<Uuid>, ApiError> {
        let filter = FilterData::with_where(self.scoped(ctx, vec![json!({ "id": { "$in": ids } })]));
        let removed = self.repo.soft_delete(&self.pool, filter).await?;
        if removed.is_empty() {
            return Err(ApiError::not_found("No matching roles found"));
        }
        tracing::info!("{} role(s) removed by {}", removed.len(), ctx.admin_id);
        Ok(removed)
    }

    /// Active roles as id/name pairs for pickers
    pub async fn fetch_summaries(&self, ctx: &AuthContext) -> Result<Vec<RoleSummary>, ApiError> {
        let filter = FilterData {
            select: Some(vec!["id".into(), "name".into()]),
            where_clause: Some(self.scoped(ctx, vec![json!({ "is_active": true })])),
            order: Some(json!("name asc")),
            ..Default::default()
        };
        Ok(Repository::<RoleSummary>::new("roles").select_any(&self.pool, filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(requester: Requester) -> AuthContext {
        AuthContext { admin_id: Uuid::new_v4(), requester, permissions: vec![] }
    }

    #[test]
    fn visibility_by_tier() {
        let city = Uuid::new_v4();
        assert_eq!(role_visibility(&Requester::SuperAdmin), json!({}));
        assert_eq!(role_visibility(&Requester::CityAdmin { city }), json!({ "added_by": { "$ne": "SA" } }));
        assert_eq!(
            role_visibility(&Requester::VenueSubAdmin { city, venues: vec![], grounds: vec![] }),
            json!({ "added_by": "SUB" })
        );
    }

    #[test]
    fn city_admin_roles_default_to_own_city() {
        let city = Uuid::new_v4();
        let c = ctx(Requester::CityAdmin { city });
        assert_eq!(role_placement(&c, None, None).unwrap(), (Some(city), None));
        assert_eq!(role_placement(&c, Some(Uuid::new_v4()), None).unwrap_err().status_code(), 403);
    }

    #[test]
    fn sub_admin_roles_need_an_assigned_venue() {
        let city = Uuid::new_v4();
        let venue = Uuid::new_v4();
        let c = ctx(Requester::VenueSubAdmin { city, venues: vec![venue], grounds: vec![] });
        assert_eq!(role_placement(&c, None, Some(venue)).unwrap(), (Some(city), Some(venue)));
        assert_eq!(role_placement(&c, None, None).unwrap_err().status_code(), 406);
        assert_eq!(role_placement(&c, None, Some(Uuid::new_v4())).unwrap_err().status_code(), 403);
    }

    #[test]
    fn restricted_cannot_create() {
        assert_eq!(role_placement(&ctx(Requester::Restricted), None, None).unwrap_err().status_code(), 403);
    }
}
