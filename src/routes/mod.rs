pub mod addresses;
pub mod affiliates;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod products;
pub mod users;

use axum::Router;
use crate::state::AppState;

pub fn create_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(users::routes(state))
        .merge(catalog::routes(state))
        .merge(products::routes(state))
        .merge(addresses::routes(state))
        .merge(cart::routes(state))
        .merge(orders::routes(state))
        .merge(affiliates::routes(state))
}
