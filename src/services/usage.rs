use chrono::NaiveDate;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::database::DatabaseError;
use crate::error::ApiError;

/// Records that keep a slot time from being changed or removed, in the
/// order they are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependent {
    UpcomingEvent,
    Academy,
    Membership,
    UpcomingBooking,
}

impl Dependent {
    pub fn message(&self) -> &'static str {
        match self {
            Dependent::UpcomingEvent => "Slot time is in use by an upcoming event",
            Dependent::Academy => "Slot time is assigned to an active academy",
            Dependent::Membership => "Slot time is assigned to an active membership",
            Dependent::UpcomingBooking => "Slot time has upcoming bookings",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageCounts {
    pub events: i64,
    pub academies: i64,
    pub memberships: i64,
    pub bookings: i64,
}

impl UsageCounts {
    pub fn first_blocking(&self) -> Option<Dependent> {
        [
            (self.events, Dependent::UpcomingEvent),
            (self.academies, Dependent::Academy),
            (self.memberships, Dependent::Membership),
            (self.bookings, Dependent::UpcomingBooking),
        ]
        .into_iter()
        .find(|(count, _)| *count > 0)
        .map(|(_, dependent)| dependent)
    }
}

const LOCK_SLOTS: &str = "SELECT id FROM slot_times WHERE id = ANY($1) AND NOT is_deleted FOR UPDATE";

const COUNT_EVENTS: &str = "SELECT COUNT(*) FROM events \
     WHERE slot_time_ids && $1 AND status = 'upcoming' AND is_active AND NOT is_deleted";

const COUNT_ACADEMIES: &str = "SELECT COUNT(*) FROM academies WHERE slot_time_ids && $1 AND is_active AND NOT is_deleted";

const COUNT_MEMBERSHIPS: &str = "SELECT COUNT(*) FROM memberships WHERE slot_time_ids && $1 AND is_active AND NOT is_deleted";

const COUNT_BOOKINGS: &str = "SELECT COUNT(*) FROM slot_bookings \
     WHERE slot_time_id = ANY($1) AND status = 'booked' AND booking_date >= $2 AND is_active AND NOT is_deleted";

/// Lock the slot rows, then refuse if anything still depends on them.
///
/// Must run on the transaction that performs the mutation so the lock is
/// held until commit. Returns the ids that were found and locked.
pub async fn lock_unused(conn: &mut PgConnection, slot_ids: &[Uuid], today: NaiveDate) -> Result<Vec<Uuid>, ApiError> {
    let locked: Vec<(Uuid,)> = sqlx::query_as(LOCK_SLOTS)
        .bind(slot_ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(DatabaseError::from)?;
    let locked: Vec<Uuid> = locked.into_iter().map(|(id,)| id).collect();
    if locked.is_empty() {
        return Ok(locked);
    }

    let counts = UsageCounts {
        events: count(conn, COUNT_EVENTS, &locked, None).await?,
        academies: count(conn, COUNT_ACADEMIES, &locked, None).await?,
        memberships: count(conn, COUNT_MEMBERSHIPS, &locked, None).await?,
        bookings: count(conn, COUNT_BOOKINGS, &locked, Some(today)).await?,
    };

    if let Some(dependent) = counts.first_blocking() {
        tracing::info!("Slot time change refused: {:?} ({:?})", dependent, counts);
        return Err(ApiError::unprocessable(dependent.message()));
    }
    Ok(locked)
}

async fn count(conn: &mut PgConnection, sql: &str, ids: &[Uuid], today: Option<NaiveDate>) -> Result<i64, ApiError> {
    let mut query = sqlx::query_as::<_, (i64,)>(sql).bind(ids);
    if let Some(day) = today {
        query = query.bind(day);
    }
    let (n,) = query.fetch_one(&mut *conn).await.map_err(DatabaseError::from)?;
    Ok(n)
}
