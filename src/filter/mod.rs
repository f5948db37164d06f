//! JSON filter documents (`{"city_id": .., "$or": [..]}`) compiled into
//! parameterized PostgreSQL `WHERE`/`ORDER BY`/`LIMIT` clauses.

pub mod error;
pub mod filter;
pub mod filter_order;
pub mod filter_where;
pub mod types;

pub use error::FilterError;
pub use filter::Filter;
pub use types::*;
