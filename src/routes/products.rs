use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use crate::handlers::product::{
    get_products, get_product, create_product, update_product, adjust_stock, delete_product,
};
use crate::middleware::auth::{optional_auth, require_auth};
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    // Anonymous browsing; a valid admin token unlocks inactive products.
    let open = Router::new()
        .route("/products", get(get_products))
        .route("/products/{id}", get(get_product))
        .layer(middleware::from_fn_with_state(state.clone(), optional_auth));

    let protected = Router::new()
        .route("/products", post(create_product))
        .route("/products/{id}", put(update_product).delete(delete_product))
        .route("/products/{id}/stock", patch(adjust_stock))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    open.merge(protected)
}
