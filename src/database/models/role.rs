use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Per-menu access flags carried by a role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub menu: String,
    #[serde(default)]
    pub add: bool,
    #[serde(default)]
    pub view: bool,
    #[serde(default)]
    pub update: bool,
    #[serde(default)]
    pub delete: bool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub city_id: Option<Uuid>,
    pub venue_id: Option<Uuid>,
    #[sqlx(json)]
    pub permissions: Vec<Permission>,
    /// Tier of the admin that created the role: `SA`, `AD` or `SUB`
    pub added_by: String,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Picker-sized projection for `/fetch-roles`
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RoleSummary {
    pub id: Uuid,
    pub name: String,
}
