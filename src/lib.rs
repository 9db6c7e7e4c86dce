// src/lib.rs
pub mod routes;
pub mod handlers;
pub mod models;
pub mod database;
pub mod middleware;
pub mod services;
pub mod state;
pub mod dtos;
pub mod error;
pub mod auth;
pub mod config;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Full application: the API under `/api` plus banner and health check.
pub fn build_app(app_state: AppState) -> Router {
    let api = routes::create_router(&app_state);

    Router::new()
        .route("/", get(|| async { "Affiliate Shop API" }))
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

async fn health_check() -> &'static str {
    "OK"
}
