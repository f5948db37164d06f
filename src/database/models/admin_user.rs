use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// The authenticated actor as stored. Carries both the legacy boolean tier
/// flags and the `added_by` tier tag; `Requester::resolve` collapses them.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AdminUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role_id: Option<Uuid>,
    pub is_super_admin: bool,
    pub is_admin: bool,
    pub is_subadmin: bool,
    pub added_by: Option<String>,
    pub city_id: Option<Uuid>,
    pub venue_ids: Vec<Uuid>,
    pub ground_ids: Vec<Uuid>,
    pub is_active: bool,
    pub is_deleted: bool,
}
