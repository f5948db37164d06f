use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{Role, SlotTime, VenueExpense};
use crate::database::Repository;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::scope::list_params::escape_like;

/// Natural keys checked before a create or a key-changing update
#[derive(Debug, Clone, PartialEq)]
pub enum NaturalKey<'a> {
    Role { name: &'a str, city: Option<Uuid>, venue: Option<Uuid> },
    Slot { ground: Uuid, slot: &'a str },
    Expense { venue: Uuid, month: i16, year: i32 },
}

impl NaturalKey<'_> {
    /// Filter matching other live records with the same key
    pub fn to_filter(&self, exclude: Option<Uuid>) -> Value {
        let mut doc = match self {
            // ILIKE without wildcards is a case-insensitive equality
            NaturalKey::Role { name, city, venue } => json!({
                "name": { "$ilike": escape_like(name.trim()) },
                "city_id": city,
                "venue_id": venue,
            }),
            NaturalKey::Slot { ground, slot } => json!({ "ground_id": ground, "slot": slot.trim() }),
            NaturalKey::Expense { venue, month, year } => json!({ "venue_id": venue, "month": month, "year": year }),
        };
        if let (Some(id), Some(map)) = (exclude, doc.as_object_mut()) {
            map.insert("id".to_string(), json!({ "$ne": id }));
        }
        doc
    }

    fn message(&self) -> &'static str {
        match self {
            NaturalKey::Role { .. } => "Role already exists",
            NaturalKey::Slot { .. } => "Slot already exists",
            NaturalKey::Expense { .. } => "Expense already exists for this month",
        }
    }
}

/// Pre-check for duplicates. The partial unique indexes still decide races;
/// their violations map to the same 409.
pub struct ConflictGuard {
    pool: PgPool,
}

impl ConflictGuard {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_unique(&self, key: &NaturalKey<'_>, exclude: Option<Uuid>) -> Result<(), ApiError> {
        let filter = FilterData::with_where(key.to_filter(exclude));
        let existing = match key {
            NaturalKey::Role { .. } => Repository::<Role>::new("roles").count(&self.pool, filter).await?,
            NaturalKey::Slot { .. } => Repository::<SlotTime>::new("slot_times").count(&self.pool, filter).await?,
            NaturalKey::Expense { .. } => {
                Repository::<VenueExpense>::hard_delete("venue_expenses").count(&self.pool, filter).await?
            }
        };
        if existing > 0 {
            tracing::debug!("Conflict on {:?}", key);
            return Err(ApiError::conflict(key.message()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Filter, SqlParam};

    #[test]
    fn role_key_is_case_insensitive_and_null_aware() {
        let key = NaturalKey::Role { name: "Ground_Staff", city: None, venue: None };
        let mut filter = Filter::new("roles").unwrap();
        filter.soft_delete(true);
        filter.where_clause(key.to_filter(None)).unwrap();
        let sql = filter.to_where_sql().unwrap();
        assert!(sql.query.contains("\"city_id\" IS NULL"));
        assert!(sql.query.contains("\"venue_id\" IS NULL"));
        assert!(sql.query.contains("\"name\" ILIKE $1"));
        assert_eq!(sql.params, vec![SqlParam::Text("Ground\\_Staff".to_string())]);
    }

    #[test]
    fn update_excludes_the_record_itself() {
        let id = Uuid::new_v4();
        let key = NaturalKey::Slot { ground: Uuid::new_v4(), slot: "06:00-07:00" };
        let doc = key.to_filter(Some(id));
        assert_eq!(doc["id"], json!({ "$ne": id }));
    }

    #[test]
    fn messages_match_the_unique_index_mapping() {
        let key = NaturalKey::Expense { venue: Uuid::new_v4(), month: 4, year: 2024 };
        assert_eq!(key.message(), "Expense already exists for this month");
    }
}
