// handlers/roles.rs - role management endpoints

use axum::{extract::State, Extension};
use serde_json::{json, Value};

use crate::database::models::{Role, RoleSummary};
use crate::middleware::{ApiResponse, ApiResult, Listing};
use crate::scope::{Action, AuthContext, ListParams, Menu};
use crate::services::RoleService;
use crate::state::AppState;
use crate::validation::{AddRoleRequest, IdQuery, IdsPayload, UpdateRoleRequest, ValidJson, ValidQuery};

/// POST /add-role
pub async fn add_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ValidJson(req): ValidJson<AddRoleRequest>,
) -> ApiResult<Role> {
    ctx.authorize(Menu::Roles, Action::Add)?;
    let role = RoleService::new(state.pool).create_one(&ctx, req).await?;
    Ok(ApiResponse::success("Role added successfully", role))
}

/// GET /get-all-roles
pub async fn get_all_roles(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ValidQuery(params): ValidQuery<ListParams>,
) -> ApiResult<Listing<Role>> {
    ctx.authorize(Menu::Roles, Action::View)?;
    let listing = RoleService::new(state.pool).select_page(&ctx, &params).await?;
    Ok(ApiResponse::success("Roles fetched successfully", listing))
}

/// GET /get-role?id=
pub async fn get_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ValidQuery(query): ValidQuery<IdQuery>,
) -> ApiResult<Role> {
    ctx.authorize(Menu::Roles, Action::View)?;
    let role = RoleService::new(state.pool).select_404(&ctx, query.id).await?;
    Ok(ApiResponse::success("Role fetched successfully", role))
}

/// POST /update-role
pub async fn update_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ValidJson(req): ValidJson<UpdateRoleRequest>,
) -> ApiResult<Role> {
    ctx.authorize(Menu::Roles, Action::Update)?;
    let role = RoleService::new(state.pool).update_404(&ctx, req).await?;
    Ok(ApiResponse::success("Role updated successfully", role))
}

/// POST /remove-roles
pub async fn remove_roles(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ValidJson(payload): ValidJson<IdsPayload>,
) -> ApiResult<Value> {
    ctx.authorize(Menu::Roles, Action::Delete)?;
    let removed = RoleService::new(state.pool).delete_many(&ctx, &payload.ids).await?;
    Ok(ApiResponse::success("Roles removed successfully", json!({ "ids": removed })))
}

/// GET /fetch-roles - any authenticated admin; used by role pickers
pub async fn fetch_roles(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Vec<RoleSummary>> {
    let roles = RoleService::new(state.pool).fetch_summaries(&ctx).await?;
    Ok(ApiResponse::success("Roles fetched successfully", roles))
}
