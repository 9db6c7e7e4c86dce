use axum::{Router, routing::{get, patch, post}, middleware};
use crate::handlers::order::{list_orders, get_order, update_order_status, cancel_order};
use crate::handlers::invoice::{list_invoices, get_invoice, get_order_invoice, mark_invoice_paid};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/status", patch(update_order_status))
        .route("/orders/{id}/cancel", post(cancel_order))
        .route("/orders/{id}/invoice", get(get_order_invoice))
        .route("/invoices", get(list_invoices))
        .route("/invoices/{id}", get(get_invoice))
        .route("/invoices/{id}/pay", post(mark_invoice_paid))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
}
