//! Detection handlers
//!
//! Handles POST /detect (run the model on an uploaded image) and
//! GET /detection-stats.

use axum::{
    extract::{Multipart, State},
    Json,
};
use pothole_core::{DetectionOutcome, DetectionStats};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::multipart::MultipartFields;
use crate::state::AppState;

/// URL prefix under which annotated images are served
pub const IMAGES_ROUTE: &str = "/detected_potholes";

/// Response for a detection request
#[derive(Debug, Serialize, ToSchema)]
pub struct DetectResponse {
    /// Whether a pothole was found at or above the confidence threshold
    #[schema(example = true)]
    pub detected: bool,
    /// Confidence of the accepted detection, 0.0 otherwise
    #[schema(example = 0.87)]
    pub confidence: f64,
    /// Bounding box `[x1, y1, x2, y2]` in pixels
    #[schema(value_type = Option<Vec<f64>>, example = json!([120.0, 340.0, 410.0, 520.0]))]
    pub bbox: Option<[f64; 4]>,
    /// Name of the saved annotated image
    #[schema(example = "pothole_20251229_153000_0.87.jpg")]
    pub image_filename: Option<String>,
    /// Path of the saved annotated image, suitable for POST /potholes
    #[schema(example = "detected_potholes/pothole_20251229_153000_0.87.jpg")]
    pub image_path: Option<String>,
    /// URL serving the annotated image
    #[schema(example = "/detected_potholes/pothole_20251229_153000_0.87.jpg")]
    pub image_url: Option<String>,
    /// Human-readable summary
    #[schema(example = "Pothole detected with 87.0% confidence!")]
    pub message: String,
}

impl From<DetectionOutcome> for DetectResponse {
    fn from(outcome: DetectionOutcome) -> Self {
        let message = outcome.message();
        let image_url = outcome
            .image_filename
            .as_ref()
            .map(|name| format!("{IMAGES_ROUTE}/{name}"));
        Self {
            detected: outcome.detected,
            confidence: outcome.confidence,
            bbox: outcome.bbox,
            image_filename: outcome.image_filename,
            image_path: outcome.image_path,
            image_url,
            message,
        }
    }
}

/// Saved detection image statistics
#[derive(Debug, Serialize, ToSchema)]
pub struct DetectionStatsResponse {
    /// Number of annotated images on disk
    #[schema(example = 12)]
    pub total_detections: usize,
    #[schema(example = "detected_potholes")]
    pub images_directory: String,
    /// Set when the directory could not be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<DetectionStats> for DetectionStatsResponse {
    fn from(stats: DetectionStats) -> Self {
        Self {
            total_detections: stats.total_detections,
            images_directory: stats.images_directory,
            error: stats.error,
        }
    }
}

/// Detect a pothole in an image
///
/// Accepts multipart/form-data with:
/// - **file** (required): The image to analyze (image/* or application/octet-stream)
///
/// Only the most confident detection is considered. When it meets the
/// confidence threshold, an annotated copy of the image is saved and its
/// location returned.
#[utoipa::path(
    post,
    path = "/detect",
    tag = "Detection",
    request_body(
        content_type = "multipart/form-data",
        description = "Image to analyze"
    ),
    responses(
        (status = 200, description = "Detection completed", body = DetectResponse),
        (status = 400, description = "Missing file, unsupported type or file too large"),
        (status = 500, description = "Model unavailable or inference failed")
    )
)]
pub async fn detect_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<DetectResponse>, ApiError> {
    let fields = MultipartFields::parse(&mut multipart, state.max_file_size).await?;
    let file = fields.into_file()?;

    tracing::debug!(
        bytes = file.data.len(),
        file_name = file.file_name.as_deref().unwrap_or("-"),
        content_type = file.content_type.as_deref().unwrap_or("-"),
        "Running detection"
    );

    let outcome = state.detector.detect(file.data).await?;
    Ok(Json(outcome.into()))
}

/// Detection statistics
///
/// Counts the annotated images saved so far.
#[utoipa::path(
    get,
    path = "/detection-stats",
    tag = "Detection",
    responses(
        (status = 200, description = "Saved image statistics", body = DetectionStatsResponse)
    )
)]
pub async fn detection_stats_handler(State(state): State<AppState>) -> Json<DetectionStatsResponse> {
    Json(state.detector.stats().await.into())
}
