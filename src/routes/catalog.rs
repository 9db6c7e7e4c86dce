use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use crate::handlers::catalog::{
    list_brands, get_brand, create_brand, update_brand, delete_brand,
    list_categories, get_category, create_category, update_category, delete_category,
};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    let open = Router::new()
        .route("/brands", get(list_brands))
        .route("/brands/{id}", get(get_brand))
        .route("/categories", get(list_categories))
        .route("/categories/{id}", get(get_category));

    let protected = Router::new()
        .route("/brands", post(create_brand))
        .route("/brands/{id}", put(update_brand).delete(delete_brand))
        .route("/categories", post(create_category))
        .route("/categories/{id}", put(update_category).delete(delete_category))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    open.merge(protected)
}
