//! Vault API - REST server
//!
//! Thin HTTP front door over the record store. Handlers translate
//! `VaultError` into status codes and never see key material.

pub mod error;
pub mod handlers;
pub mod state;

use axum::{
    routing::{get, post},
    Json, Router,
};
use handlers::{agents, health};
use state::AppState;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

/// OpenAPI document
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        agents::create_agent,
        agents::search_agents,
        agents::list_topics,
        agents::agent_exists,
    ),
    components(schemas(
        health::HealthResponse,
        agents::CreateAgentRequest,
        agents::CreateAgentResponse,
        agents::AgentSummary,
        agents::TopicsResponse,
        agents::ExistsResponse,
        error::ApiError,
    )),
    tags(
        (name = "agents", description = "Encrypted agent records"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/agents", post(agents::create_agent))
        .route("/agents/search/:intent", get(agents::search_agents))
        .route("/agents/topics", get(agents::list_topics))
        .route("/agents/exists", get(agents::agent_exists))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
