//! Requester resolution and the scope-filter pipeline.
//!
//! Every listing and mutation goes through the same three steps: the
//! authenticated admin is resolved into a [`Requester`], the requester yields a
//! [`Scope`], and the scope is rendered into a filter document for one
//! entity's column layout. [`ListParams`] then layers request parameters on
//! top, always ANDed so they can narrow but never widen the scope.

pub mod list_params;
pub mod permission;
pub mod requester;

use serde_json::{json, Map, Value};
use uuid::Uuid;

pub use list_params::{ListParams, ListSpec};
pub use permission::{Action, AuthContext, Menu};
pub use requester::{CreatorTier, Requester, RoleDescriptor};

/// Which column of an entity carries each scope dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeColumns {
    pub city: &'static str,
    pub venue: &'static str,
    pub ground: Option<&'static str>,
}

impl ScopeColumns {
    pub const ROLES: ScopeColumns = ScopeColumns { city: "city_id", venue: "venue_id", ground: None };
    /// A venue is its own venue reference
    pub const VENUES: ScopeColumns = ScopeColumns { city: "city_id", venue: "id", ground: None };
    pub const SLOT_TIMES: ScopeColumns = ScopeColumns { city: "city_id", venue: "venue_id", ground: Some("ground_id") };
    pub const EXPENSES: ScopeColumns = ScopeColumns { city: "city_id", venue: "venue_id", ground: None };
}

/// Data-access restriction derived from a requester
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Unrestricted,
    City(Uuid),
    Venues { city: Uuid, venues: Vec<Uuid>, grounds: Vec<Uuid> },
    /// Matches no rows
    Nothing,
}

impl Scope {
    pub fn for_requester(requester: &Requester) -> Self {
        match requester {
            Requester::SuperAdmin => Scope::Unrestricted,
            Requester::CityAdmin { city } => Scope::City(*city),
            Requester::VenueSubAdmin { city, venues, grounds } => Scope::Venues {
                city: *city,
                venues: venues.clone(),
                grounds: grounds.clone(),
            },
            Requester::Restricted => Scope::Nothing,
        }
    }

    /// Render the scope as a filter document over `columns`
    pub fn to_filter(&self, columns: ScopeColumns) -> Value {
        match self {
            Scope::Unrestricted => json!({}),
            Scope::City(city) => json!({ columns.city: city }),
            Scope::Venues { city, venues, grounds } => {
                let mut doc = Map::new();
                doc.insert(columns.city.to_string(), json!(city));
                doc.insert(columns.venue.to_string(), json!({ "$in": venues }));
                if let Some(ground_col) = columns.ground {
                    if !grounds.is_empty() {
                        doc.insert(ground_col.to_string(), json!({ "$in": grounds }));
                    }
                }
                Value::Object(doc)
            }
            Scope::Nothing => json!({ "id": { "$in": [] } }),
        }
    }
}

/// AND a list of filter documents together, dropping empty ones
pub fn all_of(parts: Vec<Value>) -> Value {
    let mut parts: Vec<Value> = parts
        .into_iter()
        .filter(|p| !matches!(p, Value::Object(m) if m.is_empty()) && !p.is_null())
        .collect();
    match parts.len() {
        0 => json!({}),
        1 => parts.remove(0),
        _ => json!({ "$and": parts }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Filter, FilterData};

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn super_admin_is_unrestricted() {
        let scope = Scope::for_requester(&Requester::SuperAdmin);
        assert_eq!(scope.to_filter(ScopeColumns::VENUES), json!({}));
    }

    #[test]
    fn city_admin_pins_the_city_column() {
        let city = Uuid::new_v4();
        let scope = Scope::for_requester(&Requester::CityAdmin { city });
        assert_eq!(scope.to_filter(ScopeColumns::SLOT_TIMES), json!({ "city_id": city }));
    }

    #[test]
    fn sub_admin_uses_entity_venue_column() {
        let city = Uuid::new_v4();
        let venues = ids(2);
        let scope = Scope::Venues { city, venues: venues.clone(), grounds: vec![] };

        assert_eq!(
            scope.to_filter(ScopeColumns::VENUES),
            json!({ "city_id": city, "id": { "$in": venues } })
        );
        assert_eq!(
            scope.to_filter(ScopeColumns::EXPENSES),
            json!({ "city_id": city, "venue_id": { "$in": venues } })
        );
    }

    #[test]
    fn ground_restriction_only_where_a_ground_column_exists() {
        let city = Uuid::new_v4();
        let grounds = ids(1);
        let scope = Scope::Venues { city, venues: ids(1), grounds: grounds.clone() };

        let slots = scope.to_filter(ScopeColumns::SLOT_TIMES);
        assert_eq!(slots["ground_id"], json!({ "$in": grounds }));

        let roles = scope.to_filter(ScopeColumns::ROLES);
        assert!(roles.get("ground_id").is_none());
    }

    #[test]
    fn restricted_matches_nothing() {
        let doc = Scope::for_requester(&Requester::Restricted).to_filter(ScopeColumns::ROLES);
        let mut filter = Filter::new("roles").unwrap();
        filter.assign(FilterData::with_where(doc)).unwrap();
        assert!(filter.to_where_sql().unwrap().query.contains("1=0"));
    }

    #[test]
    fn all_of_skips_empty_documents() {
        assert_eq!(all_of(vec![json!({}), json!({})]), json!({}));
        assert_eq!(all_of(vec![json!({}), json!({ "a": 1 })]), json!({ "a": 1 }));
        assert_eq!(
            all_of(vec![json!({ "a": 1 }), json!({ "b": 2 })]),
            json!({ "$and": [{ "a": 1 }, { "b": 2 }] })
        );
    }
}
