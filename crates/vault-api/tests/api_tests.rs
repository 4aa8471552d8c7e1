//! API integration tests
//!
//! The router runs over the in-memory backend and a stub embedding model.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};
use tower::ServiceExt;
use vault_api::{create_router, state::AppState};
use vault_core::{AppConfig, Result, VectorConfig};
use vault_crypto::{FieldCipher, NameLookup, RsaPrivateKey, RsaPublicKey};
use vault_store::{agent_schema, RecordStore};
use vault_vector::{CollectionManager, EmbeddingClient, MemoryBackend, TopicEmbedder};

fn private_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("key generation"))
}

struct StubEmbedding;

#[async_trait]
impl EmbeddingClient for StubEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; 384];
        for (i, byte) in text.bytes().enumerate() {
            vector[(byte as usize * (i + 1)) % 384] += 1.0;
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        384
    }
}

fn app_with(backend: Arc<MemoryBackend>, cipher: FieldCipher) -> Router {
    let manager = CollectionManager::new(backend, agent_schema(&VectorConfig::default()));
    let embedder = TopicEmbedder::new(Arc::new(StubEmbedding), 384);
    let store = RecordStore::new(manager, embedder, cipher)
        .with_name_lookup(NameLookup::new("test-lookup-secret").unwrap());

    create_router(Arc::new(AppState::new(AppConfig::default(), store)))
}

fn app() -> Router {
    app_with(
        Arc::new(MemoryBackend::new()),
        FieldCipher::new(None, Some(private_key().clone())),
    )
}

/// Helper to create a test request
fn create_json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()));
    (status, json)
}

fn weather_agent() -> Value {
    json!({
        "name": "Weather Agent",
        "description": "Reports forecasts",
        "topics": ["weather", "forecast"],
        "output_format": "json"
    })
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let (status, json) = send(&app(), create_json_request("GET", "/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_openapi_document() {
    let (status, json) = send(
        &app(),
        create_json_request("GET", "/api-docs/openapi.json", None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/agents"].is_object());
    assert!(json["paths"]["/agents/search/{intent}"].is_object());
}

// =============================================================================
// Agent API Tests
// =============================================================================

#[tokio::test]
async fn test_create_then_search() {
    let app = app();

    let (status, json) = send(
        &app,
        create_json_request("POST", "/agents", Some(weather_agent())),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["message"], "Data inserted successfully");
    assert!(json["id"].is_string());

    let (status, json) = send(
        &app,
        create_json_request("GET", "/agents/search/weather", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!([{
            "name": "Weather Agent",
            "description": "Reports forecasts",
            "output_format": "json"
        }])
    );
}

#[tokio::test]
async fn test_list_topics() {
    let app = app();

    for (name, topics) in [("A", json!(["a", "b"])), ("B", json!(["b", "c"]))] {
        let body = json!({"name": name, "description": "d", "topics": topics});
        let (status, _) = send(&app, create_json_request("POST", "/agents", Some(body))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, json) = send(&app, create_json_request("GET", "/agents/topics", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["topics"], json!(["a", "b", "c"]));
}

#[tokio::test]
async fn test_exists() {
    let app = app();
    send(
        &app,
        create_json_request("POST", "/agents", Some(weather_agent())),
    )
    .await;

    let (status, json) = send(
        &app,
        create_json_request("GET", "/agents/exists?name=Weather%20Agent", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["exists"], true);

    let (_, json) = send(
        &app,
        create_json_request("GET", "/agents/exists?name=Nobody", None),
    )
    .await;
    assert_eq!(json["exists"], false);
}

// =============================================================================
// Error Mapping Tests
// =============================================================================

#[tokio::test]
async fn test_invalid_agent_is_bad_request() {
    let body = json!({
        "name": "Weather Agent",
        "description": "x".repeat(801),
        "topics": ["weather"]
    });

    let (status, json) = send(&app(), create_json_request("POST", "/agents", Some(body))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_oversized_name_is_bad_request() {
    let body = json!({
        "name": "n".repeat(191),
        "description": "d",
        "topics": ["t"]
    });

    let (status, _) = send(&app(), create_json_request("POST", "/agents", Some(body))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_without_private_key_is_unavailable() {
    let app = app_with(
        Arc::new(MemoryBackend::new()),
        FieldCipher::encrypt_only(RsaPublicKey::from(private_key())),
    );

    let (status, json) = send(
        &app,
        create_json_request("GET", "/agents/search/weather", None),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "KEY_UNAVAILABLE");
}

#[tokio::test]
async fn test_backend_outage_is_unavailable() {
    let backend = Arc::new(MemoryBackend::new());
    backend.set_available(false);
    let app = app_with(backend, FieldCipher::new(None, Some(private_key().clone())));

    let (status, json) = send(&app, create_json_request("GET", "/agents/topics", None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "BACKEND_UNAVAILABLE");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let (status, json) = send(
        &app(),
        create_json_request("POST", "/agents", Some(json!({"name": "only"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert!(json["details"].is_string());
}

#[tokio::test]
async fn test_unparseable_body_is_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/agents")
        .header("Content-Type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, json) = send(&app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_exists_without_name_is_bad_request() {
    let (status, json) = send(&app(), create_json_request("GET", "/agents/exists", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
}
