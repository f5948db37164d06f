use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Venue {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub city_id: Uuid,
    pub sport_ids: Vec<Uuid>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub images: Vec<String>,
    pub videos: Vec<String>,
    pub venue_type: Option<String>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct VenueSummary {
    pub id: Uuid,
    pub name: String,
    pub city_id: Uuid,
}
