use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::SlotTime;
use crate::database::DatabaseError;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DaySlot {
    pub id: Uuid,
    pub slot: String,
    pub price: Decimal,
    pub is_available: bool,
}

/// Slots of one day with that weekday's price. A slot is taken when it has a
/// booking on the day or an upcoming event covering the day.
pub fn day_availability(slots: &[SlotTime], date: NaiveDate, booked: &HashSet<Uuid>, in_events: &HashSet<Uuid>) -> Vec<DaySlot> {
    let weekday = date.weekday();
    slots
        .iter()
        .map(|s| DaySlot {
            id: s.id,
            slot: s.slot.clone(),
            price: s.price.for_weekday(weekday),
            is_available: !booked.contains(&s.id) && !in_events.contains(&s.id),
        })
        .collect()
}

/// Slots free for a whole date range
pub fn range_availability(slots: Vec<SlotTime>, blocked: &HashSet<Uuid>) -> Vec<SlotTime> {
    slots.into_iter().filter(|s| !blocked.contains(&s.id)).collect()
}

const GROUND_SLOTS: &str = "SELECT * FROM slot_times WHERE ground_id = $1 AND is_active AND NOT is_deleted ORDER BY slot";

const BOOKED_BETWEEN: &str = "SELECT DISTINCT slot_time_id FROM slot_bookings \
     WHERE ground_id = $1 AND booking_date BETWEEN $2 AND $3 AND status = 'booked' AND is_active AND NOT is_deleted";

// Events are matched by the slots they hold, not by their (optional) ground
const EVENT_SLOTS_BETWEEN: &str = "SELECT DISTINCT unnest(slot_time_ids) FROM events \
     WHERE slot_time_ids && ARRAY(SELECT id FROM slot_times WHERE ground_id = $1) \
       AND start_date <= $3 AND end_date >= $2 AND status = 'upcoming' AND is_active AND NOT is_deleted";

const ACADEMY_SLOTS: &str = "SELECT DISTINCT unnest(slot_time_ids) FROM academies \
     WHERE slot_time_ids && $1 AND is_active AND NOT is_deleted";

const MEMBERSHIP_SLOTS: &str = "SELECT DISTINCT unnest(slot_time_ids) FROM memberships \
     WHERE slot_time_ids && $1 AND is_active AND NOT is_deleted";

pub struct AvailabilityService {
    pool: PgPool,
}

impl AvailabilityService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn for_day(&self, ground: Uuid, date: NaiveDate) -> Result<Vec<DaySlot>, DatabaseError> {
        let slots = self.ground_slots(ground).await?;
        let booked = self.ids(BOOKED_BETWEEN, ground, date, date).await?;
        let in_events = self.ids(EVENT_SLOTS_BETWEEN, ground, date, date).await?;
        Ok(day_availability(&slots, date, &booked, &in_events))
    }

    pub async fn for_event(&self, ground: Uuid, start: NaiveDate, end: NaiveDate) -> Result<Vec<SlotTime>, DatabaseError> {
        let slots = self.ground_slots(ground).await?;
        let slot_ids: Vec<Uuid> = slots.iter().map(|s| s.id).collect();

        let mut blocked = self.ids(BOOKED_BETWEEN, ground, start, end).await?;
        blocked.extend(self.ids(EVENT_SLOTS_BETWEEN, ground, start, end).await?);
        for sql in [ACADEMY_SLOTS, MEMBERSHIP_SLOTS] {
            let rows: Vec<(Uuid,)> = sqlx::query_as(sql).bind(&slot_ids).fetch_all(&self.pool).await?;
            blocked.extend(rows.into_iter().map(|(id,)| id));
        }

        tracing::debug!("Ground {} has {} of {} slots blocked between {} and {}", ground, blocked.len(), slots.len(), start, end);
        Ok(range_availability(slots, &blocked))
    }

    async fn ground_slots(&self, ground: Uuid) -> Result<Vec<SlotTime>, DatabaseError> {
        Ok(sqlx::query_as::<_, SlotTime>(GROUND_SLOTS).bind(ground).fetch_all(&self.pool).await?)
    }

    async fn ids(&self, sql: &str, ground: Uuid, start: NaiveDate, end: NaiveDate) -> Result<HashSet<Uuid>, DatabaseError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(sql)
            .bind(ground)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
