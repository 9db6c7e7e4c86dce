use axum::{Router, routing::{get, post, put}, middleware};
use crate::handlers::address::{list_addresses, create_address, update_address, set_default_address, delete_address};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/addresses", get(list_addresses).post(create_address))
        .route("/addresses/{id}", put(update_address).delete(delete_address))
        .route("/addresses/{id}/default", post(set_default_address))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
}
