use axum::{Router, routing::{get, post, put}, middleware};
use crate::handlers::cart::{get_cart, add_item, update_item, remove_item, clear_cart};
use crate::handlers::checkout::checkout;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/cart", get(get_cart).delete(clear_cart))
        .route("/cart/items", post(add_item))
        .route("/cart/items/{product_id}", put(update_item).delete(remove_item))
        .route("/checkout", post(checkout))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
}
