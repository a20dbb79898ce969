//! HTTP API: prospect admin, campaign triggers, org/user admin and webhooks.

mod admin;
mod error;
mod marketing;
mod prospects;
mod webhooks;

use std::sync::Arc;

use axum::http::{header, Method};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use outreach_core::Database;
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::sequencer::Sequencer;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub sequencer: Sequencer,
    pub settings: Arc<Settings>,
}

pub fn create_router(state: AppState) -> Router {
    let webhook_cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let webhook_routes = Router::new()
        .route(
            "/api/webhooks/scheduling",
            get(webhooks::scheduling_status).post(webhooks::scheduling),
        )
        .route(
            "/api/calendly-webhook",
            get(webhooks::scheduling_status).post(webhooks::scheduling),
        )
        .route("/api/webhooks/payment", post(webhooks::payment))
        .layer(webhook_cors);

    Router::new()
        .route("/health", get(health))
        .route(
            "/api/prospects",
            get(prospects::list).post(prospects::create),
        )
        .route("/api/prospects/metrics", get(prospects::metrics))
        .route("/api/prospects/import", post(prospects::import))
        .route("/api/prospects/export", get(prospects::export))
        .route("/api/prospects/bulk-delete", post(prospects::bulk_delete))
        .route(
            "/api/prospects/{email}",
            get(prospects::get)
                .patch(prospects::update)
                .delete(prospects::delete),
        )
        .route("/api/prospects/{email}/flags", post(prospects::toggle_flag))
        .route(
            "/api/marketing/send-next",
            get(marketing::send_next_status).post(marketing::send_next),
        )
        .route(
            "/api/marketing/send-campaign",
            get(marketing::campaign_status).post(marketing::send_campaign),
        )
        .route(
            "/api/organizations",
            get(admin::list_organizations).post(admin::create_organization),
        )
        .route(
            "/api/organizations/{id}/status",
            patch(admin::update_organization_status),
        )
        .route("/api/users", get(admin::list_users).post(admin::create_user))
        .merge(webhook_routes)
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
