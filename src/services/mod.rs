pub mod availability;
pub mod conflict;
pub mod consistency;
pub mod expense_service;
pub mod media;
pub mod report;
pub mod role_service;
pub mod slot_time_service;
pub mod usage;
pub mod venue_service;

pub use availability::AvailabilityService;
pub use expense_service::ExpenseService;
pub use media::{LocalMediaStore, MediaStore};
pub use report::{ChromeRenderer, ReportRenderer};
pub use role_service::RoleService;
pub use slot_time_service::SlotTimeService;
pub use venue_service::VenueService;
