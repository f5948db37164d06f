use sqlx::FromRow;
use uuid::Uuid;

/// Minimal view of a referenced row (city, venue, ground, sport) used by the
/// consistency checks. `parent_id` is the row's own city/venue reference.
#[derive(Debug, Clone, FromRow)]
pub struct ReferenceRow {
    pub id: Uuid,
    pub is_active: bool,
    pub is_deleted: bool,
    pub parent_id: Option<Uuid>,
}
