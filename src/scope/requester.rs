use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::AdminUser;

/// Tier tag stored on admins (`added_by`) and on the roles they create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreatorTier {
    #[serde(rename = "SA")]
    SuperAdmin,
    #[serde(rename = "AD")]
    Admin,
    #[serde(rename = "SUB")]
    SubAdmin,
}

impl CreatorTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreatorTier::SuperAdmin => "SA",
            CreatorTier::Admin => "AD",
            CreatorTier::SubAdmin => "SUB",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "SA" => Some(CreatorTier::SuperAdmin),
            "AD" => Some(CreatorTier::Admin),
            "SUB" => Some(CreatorTier::SubAdmin),
            _ => None,
        }
    }
}

/// Raw role attributes of an admin, before resolution
#[derive(Debug, Clone, Default)]
pub struct RoleDescriptor {
    pub is_super_admin: bool,
    pub is_admin: bool,
    pub is_subadmin: bool,
    pub added_by: Option<String>,
    pub city: Option<Uuid>,
    pub venues: Vec<Uuid>,
    pub grounds: Vec<Uuid>,
}

impl From<&AdminUser> for RoleDescriptor {
    fn from(user: &AdminUser) -> Self {
        Self {
            is_super_admin: user.is_super_admin,
            is_admin: user.is_admin,
            is_subadmin: user.is_subadmin,
            added_by: user.added_by.clone(),
            city: user.city_id,
            venues: user.venue_ids.clone(),
            grounds: user.ground_ids.clone(),
        }
    }
}

/// Who is asking, resolved once per request. Each variant carries exactly
/// the attributes its tier is scoped by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requester {
    SuperAdmin,
    CityAdmin {
        city: Uuid,
    },
    VenueSubAdmin {
        city: Uuid,
        venues: Vec<Uuid>,
        grounds: Vec<Uuid>,
    },
    /// No recognised tier, or a tier missing the city it is scoped by
    Restricted,
}

impl Requester {
    /// Collapse the legacy flags and the tier tag into one variant.
    ///
    /// Within a tier the boolean flag and the tag are ORed; across tiers the
    /// highest matching one wins (SA > AD > SUB).
    pub fn resolve(descriptor: &RoleDescriptor) -> Self {
        let tag = descriptor.added_by.as_deref().and_then(CreatorTier::parse);

        let flag_tier = if descriptor.is_super_admin {
            Some(CreatorTier::SuperAdmin)
        } else if descriptor.is_admin {
            Some(CreatorTier::Admin)
        } else if descriptor.is_subadmin {
            Some(CreatorTier::SubAdmin)
        } else {
            None
        };

        if let (Some(flags), Some(tag)) = (flag_tier, tag) {
            if flags != tag {
                tracing::warn!(
                    "Admin tier flags ({}) disagree with added_by tag ({}); using the higher tier",
                    flags.as_str(),
                    tag.as_str()
                );
            }
        }

        let is = |tier: CreatorTier| {
            tag == Some(tier)
                || match tier {
                    CreatorTier::SuperAdmin => descriptor.is_super_admin,
                    CreatorTier::Admin => descriptor.is_admin,
                    CreatorTier::SubAdmin => descriptor.is_subadmin,
                }
        };

        if is(CreatorTier::SuperAdmin) {
            return Requester::SuperAdmin;
        }
        if is(CreatorTier::Admin) {
            return match descriptor.city {
                Some(city) => Requester::CityAdmin { city },
                None => Requester::Restricted,
            };
        }
        if is(CreatorTier::SubAdmin) {
            return match descriptor.city {
                Some(city) => Requester::VenueSubAdmin {
                    city,
                    venues: descriptor.venues.clone(),
                    grounds: descriptor.grounds.clone(),
                },
                None => Requester::Restricted,
            };
        }
        Requester::Restricted
    }

    pub fn tier(&self) -> Option<CreatorTier> {
        match self {
            Requester::SuperAdmin => Some(CreatorTier::SuperAdmin),
            Requester::CityAdmin { .. } => Some(CreatorTier::Admin),
            Requester::VenueSubAdmin { .. } => Some(CreatorTier::SubAdmin),
            Requester::Restricted => None,
        }
    }

    pub fn is_super_admin(&self) -> bool {
        matches!(self, Requester::SuperAdmin)
    }

    /// The city this requester is pinned to, if any
    pub fn city(&self) -> Option<Uuid> {
        match self {
            Requester::CityAdmin { city } | Requester::VenueSubAdmin { city, .. } => Some(*city),
            _ => None,
        }
    }

    pub fn can_access_city(&self, city: Uuid) -> bool {
        match self {
            Requester::SuperAdmin => true,
            Requester::CityAdmin { city: own } | Requester::VenueSubAdmin { city: own, .. } => *own == city,
            Requester::Restricted => false,
        }
    }

    pub fn can_access_venue(&self, city: Uuid, venue: Uuid) -> bool {
        match self {
            Requester::SuperAdmin => true,
            Requester::CityAdmin { city: own } => *own == city,
            Requester::VenueSubAdmin { city: own, venues, .. } => *own == city && venues.contains(&venue),
            Requester::Restricted => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city() -> Uuid {
        Uuid::parse_str("6f1c3a52-0000-4000-8000-000000000001").unwrap()
    }

    #[test]
    fn flag_or_tag_selects_super_admin() {
        let by_flag = RoleDescriptor { is_super_admin: true, ..Default::default() };
        let by_tag = RoleDescriptor { added_by: Some("SA".into()), ..Default::default() };
        assert_eq!(Requester::resolve(&by_flag), Requester::SuperAdmin);
        assert_eq!(Requester::resolve(&by_tag), Requester::SuperAdmin);
    }

    #[test]
    fn city_admin_needs_a_city() {
        let with_city = RoleDescriptor { is_admin: true, city: Some(city()), ..Default::default() };
        assert_eq!(Requester::resolve(&with_city), Requester::CityAdmin { city: city() });

        let without_city = RoleDescriptor { added_by: Some("AD".into()), ..Default::default() };
        assert_eq!(Requester::resolve(&without_city), Requester::Restricted);
    }

    #[test]
    fn sub_admin_carries_venue_and_ground_sets() {
        let venue = Uuid::new_v4();
        let ground = Uuid::new_v4();
        let d = RoleDescriptor {
            added_by: Some("sub".into()),
            city: Some(city()),
            venues: vec![venue],
            grounds: vec![ground],
            ..Default::default()
        };
        assert_eq!(
            Requester::resolve(&d),
            Requester::VenueSubAdmin { city: city(), venues: vec![venue], grounds: vec![ground] }
        );
    }

    #[test]
    fn conflicting_signals_take_the_higher_tier() {
        // subadmin flag but AD tag: AD wins
        let d = RoleDescriptor {
            is_subadmin: true,
            added_by: Some("AD".into()),
            city: Some(city()),
            ..Default::default()
        };
        assert_eq!(Requester::resolve(&d), Requester::CityAdmin { city: city() });
    }

    #[test]
    fn nothing_set_is_restricted() {
        assert_eq!(Requester::resolve(&RoleDescriptor::default()), Requester::Restricted);
        let unknown_tag = RoleDescriptor { added_by: Some("ROOT".into()), ..Default::default() };
        assert_eq!(Requester::resolve(&unknown_tag), Requester::Restricted);
    }

    #[test]
    fn venue_access_checks_city_and_set() {
        let venue = Uuid::new_v4();
        let sub = Requester::VenueSubAdmin { city: city(), venues: vec![venue], grounds: vec![] };
        assert!(sub.can_access_venue(city(), venue));
        assert!(!sub.can_access_venue(city(), Uuid::new_v4()));
        assert!(!sub.can_access_venue(Uuid::new_v4(), venue));
        assert!(Requester::SuperAdmin.can_access_venue(Uuid::new_v4(), Uuid::new_v4()));
        assert!(!Requester::Restricted.can_access_city(city()));
    }
}
