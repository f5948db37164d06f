pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod scope;
pub mod services;
pub mod state;
pub mod validation;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{public, roles, slot_times, system, venue_expenses, venues};
use crate::middleware::{jwt_auth_middleware, load_requester_middleware};
use crate::state::AppState;

/// Upload parts per update-venue request the body limit leaves room for
const MAX_UPLOAD_PARTS: usize = 10;

/// Full application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .route("/venues", get(public::venues))
        .route("/get-available-slots", get(public::get_available_slots))
        .route("/available-slots-for-event", get(public::available_slots_for_event))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    let upload_limit = config::config().storage.max_upload_bytes.saturating_mul(MAX_UPLOAD_PARTS);

    Router::new()
        // Roles
        .route("/add-role", post(roles::add_role))
        .route("/get-all-roles", get(roles::get_all_roles))
        .route("/get-role", get(roles::get_role))
        .route("/update-role", post(roles::update_role))
        .route("/remove-roles", post(roles::remove_roles))
        .route("/fetch-roles", get(roles::fetch_roles))
        // Venues
        .route("/add-venue", post(venues::add_venue))
        .route(
            "/update-venue",
            post(venues::update_venue).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/remove-venues", post(venues::remove_venues))
        .route("/get-venues", get(venues::get_venues))
        .route("/get-venue", get(venues::get_venue))
        .route("/fetch-venues", get(venues::fetch_venues))
        // Slot times
        .route("/add-slot-time", post(slot_times::add_slot_time))
        .route("/update-slot-time", post(slot_times::update_slot_time))
        .route("/remove-slot-times", post(slot_times::remove_slot_times))
        .route("/get-slot-times", get(slot_times::get_slot_times))
        // Venue expenses
        .route("/add-venue-expense", post(venue_expenses::add_venue_expense))
        .route("/get-venue-expenses", get(venue_expenses::get_venue_expenses))
        .route("/get-venue-expense", get(venue_expenses::get_venue_expense))
        .route("/update-venue-expense", post(venue_expenses::update_venue_expense))
        .route("/remove-venue-expenses", post(venue_expenses::remove_venue_expenses))
        .route("/download-expense-report", get(venue_expenses::download_expense_report))
        // Token check runs first, then the admin is loaded
        .route_layer(from_fn_with_state(state, load_requester_middleware))
        .route_layer(from_fn(jwt_auth_middleware))
}

fn cors_layer() -> CorsLayer {
    let security = &config::config().security;
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.is_empty() || security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
