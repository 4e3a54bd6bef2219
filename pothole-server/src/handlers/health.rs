//! Health check handlers
//!
//! Provides the service index plus health and readiness endpoints for
//! monitoring and orchestration.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Service index response
#[derive(Serialize, ToSchema)]
pub struct RootResponse {
    #[schema(example = "Pothole Detection API")]
    pub message: &'static str,
    /// Server version from Cargo.toml
    #[schema(example = "0.1.0")]
    pub version: &'static str,
    /// Available endpoints, "METHOD /path" => description
    pub endpoints: Vec<EndpointInfo>,
}

/// One entry of the endpoint listing
#[derive(Serialize, ToSchema)]
pub struct EndpointInfo {
    #[schema(example = "POST /potholes")]
    pub route: &'static str,
    #[schema(example = "Report a new pothole")]
    pub description: &'static str,
}

const ENDPOINTS: &[(&str, &str)] = &[
    ("POST /potholes", "Report a new pothole"),
    ("GET /potholes", "List all potholes"),
    ("GET /potholes/{id}", "Get a pothole by id"),
    ("DELETE /potholes/{id}", "Delete a pothole and its image"),
    ("POST /detect", "Detect a pothole in an uploaded image"),
    ("GET /detection-stats", "Count saved detection images"),
    ("GET /detected_potholes/{file}", "Annotated detection images"),
    ("GET /health", "Health check"),
    ("GET /ready", "Readiness probe"),
    ("GET /swagger-ui", "API documentation"),
];

/// GET / - Service index
#[utoipa::path(
    get,
    path = "/",
    tag = "Health",
    responses((status = 200, description = "Service name, version and endpoints", body = RootResponse))
)]
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Pothole Detection API",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: ENDPOINTS
            .iter()
            .map(|&(route, description)| EndpointInfo { route, description })
            .collect(),
    })
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status: "healthy" or "degraded"
    #[schema(example = "healthy")]
    pub status: &'static str,
    /// Server version from Cargo.toml
    #[schema(example = "0.1.0")]
    pub version: &'static str,
    /// Whether the record file is readable
    pub storage_available: bool,
    /// Whether the detection model has been loaded yet
    pub model_loaded: bool,
    /// Number of stored potholes, when readable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pothole_count: Option<usize>,
    /// Service name
    #[schema(example = "pothole-server")]
    pub service: &'static str,
}

/// GET /health - Health check endpoint
///
/// Returns JSON with service status, version, storage availability and
/// whether the model is loaded. A model that is not loaded yet is not a
/// failure; it loads on the first detection.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service health", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let pothole_count = state.store.count().await.ok();
    let storage_available = pothole_count.is_some();

    let status = if storage_available {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        storage_available,
        model_loaded: state.detector.is_model_loaded(),
        pothole_count,
        service: "pothole-server",
    })
}

/// Readiness response for Kubernetes
#[derive(Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Whether the service is ready to accept traffic
    pub ready: bool,
    /// Optional message explaining status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// GET /ready - Kubernetes readiness probe
///
/// Returns 200 when the record store can be read, 503 otherwise.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ready", body = ReadyResponse),
        (status = 503, description = "Record store unavailable", body = ReadyResponse)
    )
)]
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    match state.store.count().await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                message: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse {
                    ready: false,
                    message: Some("record store unavailable"),
                }),
            )
        }
    }
}
