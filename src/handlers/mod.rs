// handlers/mod.rs - one module per resource; public endpoints need no token,
// everything else runs behind JWT authentication and requester loading

pub mod public;
pub mod roles;
pub mod slot_times;
pub mod system;
pub mod venue_expenses;
pub mod venues;
