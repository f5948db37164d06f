pub mod admin_user;
pub mod reference;
pub mod role;
pub mod slot_time;
pub mod venue;
pub mod venue_expense;

pub use admin_user::AdminUser;
pub use reference::ReferenceRow;
pub use role::{Permission, Role, RoleSummary};
pub use slot_time::{SlotTime, WeekdayPrices};
pub use venue::{Venue, VenueSummary};
pub use venue_expense::{ExpenseItem, VenueExpense, VenueExpenseView};
