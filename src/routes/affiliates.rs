use axum::{Router, routing::{get, patch, post}, middleware};
use crate::handlers::affiliate::{list_affiliates, get_my_affiliate, list_my_customers, get_affiliate, update_affiliate};
use crate::handlers::commission::{list_commissions, commission_summary, pay_commission};
use crate::handlers::customer::{list_customers, get_customer, assign_affiliate};
use crate::handlers::dashboard::{admin_dashboard, affiliate_dashboard};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/affiliates", get(list_affiliates))
        .route("/affiliates/me", get(get_my_affiliate))
        .route("/affiliates/me/customers", get(list_my_customers))
        .route("/affiliates/{id}", get(get_affiliate).patch(update_affiliate))
        .route("/customers", get(list_customers))
        .route("/customers/{id}", get(get_customer))
        .route("/customers/{id}/affiliate", patch(assign_affiliate))
        .route("/commissions", get(list_commissions))
        .route("/commissions/summary", get(commission_summary))
        .route("/commissions/{id}/pay", post(pay_commission))
        .route("/dashboard/admin", get(admin_dashboard))
        .route("/dashboard/affiliate", get(affiliate_dashboard))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
}
