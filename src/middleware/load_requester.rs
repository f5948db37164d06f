use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde_json::json;

use super::auth::AuthToken;
use crate::database::models::{AdminUser, Role};
use crate::database::Repository;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::scope::{AuthContext, Requester, RoleDescriptor};
use crate::state::AppState;

/// Loads the admin behind the token, resolves its tier once and inserts the
/// resulting [`AuthContext`] for handlers.
///
/// Runs after [`super::jwt_auth_middleware`]. Unknown, deleted or inactive
/// admins are rejected with 401.
pub async fn load_requester_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .extensions()
        .get::<AuthToken>()
        .copied()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required"))?;

    let admin = Repository::<AdminUser>::new("admin_users")
        .select_one(&state.pool, FilterData::with_where(json!({ "id": token.admin_id })))
        .await?
        .ok_or_else(|| {
            tracing::warn!("Token for unknown or deleted admin {}", token.admin_id);
            ApiError::unauthorized("Admin account not found")
        })?;

    if !admin.is_active {
        tracing::warn!("Inactive admin {} attempted access", admin.id);
        return Err(ApiError::unauthorized("Admin account is inactive"));
    }

    let permissions = match admin.role_id {
        Some(role_id) => Repository::<Role>::new("roles")
            .select_one(&state.pool, FilterData::with_where(json!({ "id": role_id, "is_active": true })))
            .await?
            .map(|role| role.permissions)
            .unwrap_or_default(),
        None => vec![],
    };

    let requester = Requester::resolve(&RoleDescriptor::from(&admin));
    tracing::debug!("Admin {} resolved as {:?}", admin.id, requester);

    request.extensions_mut().insert(AuthContext {
        admin_id: admin.id,
        requester,
        permissions,
    });
    Ok(next.run(request).await)
}
