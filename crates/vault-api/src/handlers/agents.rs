//! Agent record handlers
//!
//! Author: hephaex@gmail.com

use crate::error::{ApiError, AppError};
use crate::state::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use vault_core::AgentDescriptor;

/// Agent registration body
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAgentRequest {
    /// Agent name (stored encrypted)
    #[schema(example = "Weather Agent")]
    pub name: String,

    /// What the agent does (stored encrypted)
    #[schema(example = "Reports forecasts")]
    pub description: String,

    /// Ordered topic tags used for similarity search
    #[schema(example = json!(["weather", "forecast"]))]
    pub topics: Vec<String>,

    /// Output format tag
    #[serde(default)]
    #[schema(example = "json")]
    pub output_format: String,

    /// Whether the agent is active
    #[serde(default = "default_true")]
    #[schema(default = true)]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl From<CreateAgentRequest> for AgentDescriptor {
    fn from(req: CreateAgentRequest) -> Self {
        AgentDescriptor::new(req.name, req.description, req.topics)
            .with_output_format(req.output_format)
            .with_active(req.is_active)
    }
}

/// Agent registration result
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateAgentResponse {
    pub message: String,
    /// Backend-assigned record id
    pub id: String,
}

/// Decrypted search hit
#[derive(Debug, Serialize, ToSchema)]
pub struct AgentSummary {
    pub name: String,
    pub description: String,
    pub output_format: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopicsResponse {
    pub topics: Vec<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExistsQuery {
    /// Plaintext agent name
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ExistsResponse {
    pub exists: bool,
}

/// Register an agent
#[utoipa::path(
    post,
    path = "/agents",
    tag = "agents",
    request_body = CreateAgentRequest,
    responses(
        (status = 201, description = "Agent stored", body = CreateAgentResponse),
        (status = 400, description = "Invalid agent data", body = ApiError),
        (status = 503, description = "Backend, model or key unavailable", body = ApiError)
    )
)]
pub async fn create_agent(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateAgentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let receipt = state.store.insert(&req.into()).await?;

    // The rebuild keeps running after the handle is dropped
    drop(receipt.index_refresh);

    Ok((
        StatusCode::CREATED,
        Json(CreateAgentResponse {
            message: "Data inserted successfully".to_string(),
            id: receipt.id,
        }),
    ))
}

/// Find agents matching an intent
#[utoipa::path(
    get,
    path = "/agents/search/{intent}",
    tag = "agents",
    params(("intent" = String, Path, description = "Query topic")),
    responses(
        (status = 200, description = "Nearest agents first", body = [AgentSummary]),
        (status = 503, description = "Backend, model or key unavailable", body = ApiError)
    )
)]
pub async fn search_agents(
    State(state): State<Arc<AppState>>,
    Path(intent): Path<String>,
) -> Result<Json<Vec<AgentSummary>>, AppError> {
    let matches = state.store.search(&[intent]).await?;

    Ok(Json(
        matches
            .into_iter()
            .map(|m| AgentSummary {
                name: m.name,
                description: m.description,
                output_format: m.output_format,
            })
            .collect(),
    ))
}

/// List every distinct topic
#[utoipa::path(
    get,
    path = "/agents/topics",
    tag = "agents",
    responses(
        (status = 200, description = "Sorted distinct topics", body = TopicsResponse),
        (status = 503, description = "Backend unavailable", body = ApiError)
    )
)]
pub async fn list_topics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TopicsResponse>, AppError> {
    let topics = state.store.list_topics().await?;
    Ok(Json(TopicsResponse {
        topics: topics.into_iter().collect(),
    }))
}

/// Check whether an agent name is registered
#[utoipa::path(
    get,
    path = "/agents/exists",
    tag = "agents",
    params(ExistsQuery),
    responses(
        (status = 200, description = "Existence result", body = ExistsResponse),
        (status = 400, description = "Missing name", body = ApiError),
        (status = 503, description = "Backend or key unavailable", body = ApiError)
    )
)]
pub async fn agent_exists(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ExistsQuery>, QueryRejection>,
) -> Result<Json<ExistsResponse>, AppError> {
    let Query(query) = query?;
    let exists = state.store.exists(&query.name).await?;
    Ok(Json(ExistsResponse { exists }))
}
