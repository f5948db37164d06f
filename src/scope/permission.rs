use uuid::Uuid;

use super::{Requester, Scope};
use crate::database::models::Permission;
use crate::error::ApiError;

/// Admin menus that carry permission flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Menu {
    Roles,
    Venues,
    SlotTimes,
    Expenses,
}

impl Menu {
    pub const ALL: [Menu; 4] = [Menu::Roles, Menu::Venues, Menu::SlotTimes, Menu::Expenses];

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str().eq_ignore_ascii_case(name.trim()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Menu::Roles => "Roles",
            Menu::Venues => "Venues",
            Menu::SlotTimes => "Slot_Times",
            Menu::Expenses => "Expenses",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Add,
    View,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Add => "add",
            Action::View => "view",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    fn granted_by(&self, permission: &Permission) -> bool {
        match self {
            Action::Add => permission.add,
            Action::View => permission.view,
            Action::Update => permission.update,
            Action::Delete => permission.delete,
        }
    }
}

/// Per-request authentication context, inserted into request extensions by
/// the requester middleware.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub admin_id: Uuid,
    pub requester: Requester,
    /// Flags of the admin's role; empty when no role is assigned
    pub permissions: Vec<Permission>,
}

impl AuthContext {
    pub fn scope(&self) -> Scope {
        Scope::for_requester(&self.requester)
    }

    /// Super admins hold every permission; everyone else needs the flag on their role
    pub fn authorize(&self, menu: Menu, action: Action) -> Result<(), ApiError> {
        if self.requester.is_super_admin() {
            return Ok(());
        }

        let granted = self
            .permissions
            .iter()
            .any(|p| p.menu.eq_ignore_ascii_case(menu.as_str()) && action.granted_by(p));

        if granted {
            Ok(())
        } else {
            tracing::warn!(
                "Admin {} denied {} on {}",
                self.admin_id,
                action.as_str(),
                menu.as_str()
            );
            Err(ApiError::permission_denied(format!(
                "You do not have permission to {} {}",
                action.as_str(),
                menu.as_str().replace('_', " ").to_lowercase()
            )))
        }
    }

    /// 403 unless the requester may act on records of this city/venue
    pub fn require_venue(&self, city: Uuid, venue: Uuid) -> Result<(), ApiError> {
        if self.requester.can_access_venue(city, venue) {
            Ok(())
        } else {
            tracing::warn!("Admin {} acted outside scope (city {}, venue {})", self.admin_id, city, venue);
            Err(ApiError::permission_denied("Venue is outside your assigned scope"))
        }
    }

    pub fn require_city(&self, city: Uuid) -> Result<(), ApiError> {
        if self.requester.can_access_city(city) {
            Ok(())
        } else {
            tracing::warn!("Admin {} acted outside scope (city {})", self.admin_id, city);
            Err(ApiError::permission_denied("City is outside your assigned scope"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(requester: Requester, permissions: Vec<Permission>) -> AuthContext {
        AuthContext { admin_id: Uuid::new_v4(), requester, permissions }
    }

    #[test]
    fn super_admin_needs_no_flags() {
        let c = ctx(Requester::SuperAdmin, vec![]);
        assert!(c.authorize(Menu::Expenses, Action::Delete).is_ok());
    }

    #[test]
    fn flag_must_match_menu_and_action() {
        let city = Uuid::new_v4();
        let c = ctx(
            Requester::CityAdmin { city },
            vec![Permission { menu: "slot_times".into(), view: true, ..Default::default() }],
        );
        assert!(c.authorize(Menu::SlotTimes, Action::View).is_ok());

        let err = c.authorize(Menu::SlotTimes, Action::Update).unwrap_err();
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.message(), "You do not have permission to update slot times");

        assert!(c.authorize(Menu::Venues, Action::View).is_err());
    }

    #[test]
    fn scope_checks_reject_foreign_venues() {
        let city = Uuid::new_v4();
        let venue = Uuid::new_v4();
        let c = ctx(Requester::VenueSubAdmin { city, venues: vec![venue], grounds: vec![] }, vec![]);
        assert!(c.require_venue(city, venue).is_ok());
        assert_eq!(c.require_venue(city, Uuid::new_v4()).unwrap_err().status_code(), 403);
        assert_eq!(c.require_city(Uuid::new_v4()).unwrap_err().status_code(), 403);
    }
}
