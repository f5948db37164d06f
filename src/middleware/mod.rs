pub mod auth;
pub mod load_requester;
pub mod response;

pub use auth::{jwt_auth_middleware, AuthToken};
pub use load_requester::load_requester_middleware;
pub use response::{ApiResponse, ApiResult, Listing};
