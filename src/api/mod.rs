pub mod errors;
pub mod models;
pub mod routes;

use std::sync::Arc;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use crate::db::Database;
use crate::queue::{ActiveRuns, JobSource};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub queue: Arc<dyn JobSource>,
    pub active: ActiveRuns,
}

impl AppState {
    pub fn new(db: Database, queue: Arc<dyn JobSource>, active: ActiveRuns) -> Self {
        Self { db, queue, active }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(routes::health::health_check))
        .route("/api/campaigns", post(routes::campaigns::create_campaign).get(routes::campaigns::list_campaigns))
        .route("/api/campaigns/:id", get(routes::campaigns::get_campaign))
        .route("/api/campaigns/:id/cancel", post(routes::campaigns::cancel_campaign))
        .route("/api/campaigns/:id/findings", get(routes::findings::list_findings))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
