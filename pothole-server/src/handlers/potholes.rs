//! Pothole record handlers
//!
//! Handles creation, listing, lookup and deletion of pothole records.

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};
use pothole_core::{spawn_notification, NewPothole, PotholeRecord};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::validate_new_pothole;

/// Request body for reporting a pothole
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePotholeRequest {
    /// Latitude in decimal degrees
    #[schema(example = 37.774929)]
    pub latitude: f64,
    /// Longitude in decimal degrees
    #[schema(example = -122.419418)]
    pub longitude: f64,
    /// Capture time, stored verbatim
    #[schema(example = "2025-12-29T15:30:00Z")]
    pub timestamp: String,
    /// Detection confidence in [0, 1], when reported from a detection
    #[serde(default)]
    #[schema(example = 0.85)]
    pub confidence: Option<f64>,
    /// Annotated image returned by /detect
    #[serde(default)]
    #[schema(example = "detected_potholes/pothole_20251229_153000_0.85.jpg")]
    pub image_path: Option<String>,
}

impl From<CreatePotholeRequest> for NewPothole {
    fn from(req: CreatePotholeRequest) -> Self {
        NewPothole {
            latitude: req.latitude,
            longitude: req.longitude,
            timestamp: req.timestamp,
            confidence: req.confidence,
            image_path: req.image_path,
        }
    }
}

/// A stored pothole
#[derive(Debug, Serialize, ToSchema)]
pub struct PotholeResponse {
    /// Store-assigned identifier
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 37.774929)]
    pub latitude: f64,
    #[schema(example = -122.419418)]
    pub longitude: f64,
    #[schema(example = "2025-12-29T15:30:00Z")]
    pub timestamp: String,
    #[schema(example = 0.85)]
    pub confidence: Option<f64>,
    #[schema(example = "detected_potholes/pothole_20251229_153000_0.85.jpg")]
    pub image_path: Option<String>,
}

impl From<PotholeRecord> for PotholeResponse {
    fn from(record: PotholeRecord) -> Self {
        Self {
            id: record.id,
            latitude: record.latitude,
            longitude: record.longitude,
            timestamp: record.timestamp,
            confidence: record.confidence,
            image_path: record.image_path,
        }
    }
}

/// Response for a successful delete
#[derive(Debug, Serialize, ToSchema)]
pub struct DeletePotholeResponse {
    #[schema(example = "Pothole #1 deleted successfully")]
    pub message: String,
    #[schema(example = 1)]
    pub deleted_id: u64,
    /// Records left in the store
    #[schema(example = 4)]
    pub remaining_count: usize,
}

fn pothole_id(path: Result<Path<u64>, PathRejection>) -> Result<u64, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|e| ApiError::bad_request(format!("Invalid pothole id: {}", e.body_text())))
}

/// Report a pothole
///
/// Assigns the next identifier and appends the record. Records that carry a
/// detection confidence also trigger an alert in the background.
#[utoipa::path(
    post,
    path = "/potholes",
    tag = "Potholes",
    request_body = CreatePotholeRequest,
    responses(
        (status = 201, description = "Pothole recorded", body = PotholeResponse),
        (status = 400, description = "Invalid JSON, missing timestamp or image outside the images directory"),
        (status = 500, description = "Failed to save the record")
    )
)]
pub async fn create_pothole_handler(
    State(state): State<AppState>,
    body: Result<Json<CreatePotholeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PotholeResponse>), ApiError> {
    let Json(request) =
        body.map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e.body_text())))?;

    let candidate = NewPothole::from(request);
    validate_new_pothole(&candidate, state.store.images_dir())?;

    let record = state.store.create(candidate).await?;
    spawn_notification(state.notifier.clone(), &record);

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// List all potholes
///
/// Returns every readable record in insertion order.
#[utoipa::path(
    get,
    path = "/potholes",
    tag = "Potholes",
    responses(
        (status = 200, description = "All recorded potholes", body = Vec<PotholeResponse>),
        (status = 500, description = "Failed to read the records")
    )
)]
pub async fn list_potholes_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<PotholeResponse>>, ApiError> {
    let records = state.store.list_all().await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// Get a pothole by id
#[utoipa::path(
    get,
    path = "/potholes/{id}",
    tag = "Potholes",
    params(("id" = u64, Path, description = "Pothole identifier")),
    responses(
        (status = 200, description = "The pothole", body = PotholeResponse),
        (status = 404, description = "No pothole with this id")
    )
)]
pub async fn get_pothole_handler(
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<PotholeResponse>, ApiError> {
    let id = pothole_id(path)?;
    let record = state.store.get_by_id(id).await?;
    Ok(Json(record.into()))
}

/// Delete a pothole
///
/// Removes the record and, best effort, its annotated image.
#[utoipa::path(
    delete,
    path = "/potholes/{id}",
    tag = "Potholes",
    params(("id" = u64, Path, description = "Pothole identifier")),
    responses(
        (status = 200, description = "Pothole deleted", body = DeletePotholeResponse),
        (status = 404, description = "No pothole with this id"),
        (status = 500, description = "Failed to rewrite the records")
    )
)]
pub async fn delete_pothole_handler(
    State(state): State<AppState>,
    path: Result<Path<u64>, PathRejection>,
) -> Result<Json<DeletePotholeResponse>, ApiError> {
    let id = pothole_id(path)?;
    let deletion = state.store.delete_by_id(id).await?;

    Ok(Json(DeletePotholeResponse {
        message: format!("Pothole #{} deleted successfully", deletion.record.id),
        deleted_id: deletion.record.id,
        remaining_count: deletion.remaining_count,
    }))
}
