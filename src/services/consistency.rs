use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::ReferenceRow;
use crate::database::DatabaseError;
use crate::error::ApiError;

/// Kinds of row a mutation may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    City,
    Venue,
    Ground,
    Sport,
}

impl RefKind {
    fn label(&self) -> &'static str {
        match self {
            RefKind::City => "City",
            RefKind::Venue => "Venue",
            RefKind::Ground => "Ground",
            RefKind::Sport => "Sport",
        }
    }

    fn parent_label(&self) -> &'static str {
        match self {
            RefKind::Venue => "city",
            RefKind::Ground => "venue",
            RefKind::City | RefKind::Sport => "parent",
        }
    }

    fn lookup_sql(&self) -> &'static str {
        match self {
            RefKind::City => "SELECT id, is_active, is_deleted, NULL::uuid AS parent_id FROM cities WHERE id = $1",
            RefKind::Sport => "SELECT id, is_active, is_deleted, NULL::uuid AS parent_id FROM sports WHERE id = $1",
            RefKind::Venue => "SELECT id, is_active, is_deleted, city_id AS parent_id FROM venues WHERE id = $1",
            RefKind::Ground => "SELECT id, is_active, is_deleted, venue_id AS parent_id FROM grounds WHERE id = $1",
        }
    }
}

/// Check one fetched reference: existence, then active, then not deleted,
/// then parent match. The first failure wins.
pub fn verify_reference(
    kind: RefKind,
    row: Option<&ReferenceRow>,
    expected_parent: Option<Uuid>,
) -> Result<(), ApiError> {
    let row = row.ok_or_else(|| ApiError::unprocessable(format!("{} not found", kind.label())))?;
    if !row.is_active {
        return Err(ApiError::unprocessable(format!("{} is inactive", kind.label())));
    }
    if row.is_deleted {
        return Err(ApiError::unprocessable(format!("{} has been deleted", kind.label())));
    }
    if let Some(parent) = expected_parent {
        if row.parent_id != Some(parent) {
            return Err(ApiError::unprocessable(format!(
                "{} does not belong to the selected {}",
                kind.label(),
                kind.parent_label()
            )));
        }
    }
    Ok(())
}

/// The references one mutation carries
#[derive(Debug, Clone, Default)]
pub struct References {
    pub city: Option<Uuid>,
    pub venue: Option<Uuid>,
    pub ground: Option<Uuid>,
    pub sports: Vec<Uuid>,
}

pub struct ConsistencyService {
    pool: PgPool,
}

impl ConsistencyService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Verify city, then venue (within city), then ground (within venue), then sports
    pub async fn verify(&self, refs: &References) -> Result<(), ApiError> {
        if let Some(city) = refs.city {
            self.check(RefKind::City, city, None).await?;
        }
        if let Some(venue) = refs.venue {
            self.check(RefKind::Venue, venue, refs.city).await?;
        }
        if let Some(ground) = refs.ground {
            self.check(RefKind::Ground, ground, refs.venue).await?;
        }
        for sport in &refs.sports {
            self.check(RefKind::Sport, *sport, None).await?;
        }
        Ok(())
    }

    async fn check(&self, kind: RefKind, id: Uuid, expected_parent: Option<Uuid>) -> Result<(), ApiError> {
        let row = sqlx::query_as::<_, ReferenceRow>(kind.lookup_sql())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        verify_reference(kind, row.as_ref(), expected_parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(active: bool, deleted: bool, parent: Option<Uuid>) -> ReferenceRow {
        ReferenceRow { id: Uuid::new_v4(), is_active: active, is_deleted: deleted, parent_id: parent }
    }

    fn message(result: Result<(), ApiError>) -> String {
        result.unwrap_err().message().to_string()
    }

    #[test]
    fn missing_reference_is_reported_first() {
        assert_eq!(message(verify_reference(RefKind::Ground, None, None)), "Ground not found");
    }

    #[test]
    fn active_is_checked_before_deleted() {
        let r = row(false, true, None);
        assert_eq!(message(verify_reference(RefKind::Venue, Some(&r), None)), "Venue is inactive");
        let r = row(true, true, None);
        assert_eq!(message(verify_reference(RefKind::Venue, Some(&r), None)), "Venue has been deleted");
    }

    #[test]
    fn parent_mismatch_names_the_relationship() {
        let venue = Uuid::new_v4();
        let r = row(true, false, Some(Uuid::new_v4()));
        let err = verify_reference(RefKind::Ground, Some(&r), Some(venue)).unwrap_err();
        assert_eq!(err.status_code(), 406);
        assert_eq!(err.message(), "Ground does not belong to the selected venue");

        let r = row(true, false, Some(venue));
        assert!(verify_reference(RefKind::Ground, Some(&r), Some(venue)).is_ok());
    }
}
