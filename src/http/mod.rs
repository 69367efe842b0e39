//! HTTP transport (C10): the request orchestrator that ties the services
//! together behind axum. The teacher's own transport is NATS request/reply;
//! this is the HTTP equivalent, enriched from
//! `seanchatmangpt-knhk`'s `State`/`Json`/`Path` extractor style.

pub mod schedule;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use crate::services::cancellation::ScheduleLockRegistry;
use crate::services::routing::TravelProvider;

/// Shared application state handed to every handler via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub provider: Option<Arc<dyn TravelProvider>>,
    pub locks: ScheduleLockRegistry,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/schedule/generate", post(schedule::generate))
        .route("/api/v1/schedule/preview", post(schedule::preview))
        .route("/api/v1/schedule/capacity/:date", get(schedule::capacity))
        .route("/api/v1/schedule/insert-emergency", post(schedule::insert_emergency))
        .route("/api/v1/schedule/re-optimize/:date", post(schedule::re_optimize))
        .route("/api/v1/schedule/clear", post(schedule::clear))
        .route("/api/v1/schedule/clear/recent", get(schedule::recent))
        .route("/api/v1/schedule/clear/:audit_id/restore", post(schedule::restore))
        .route("/api/v1/schedule/clear/:audit_id", get(schedule::detail))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
