//! Pothole detection adapter.
//!
//! Wraps an external object-detection model behind [`InferenceModel`] and
//! normalizes its output into a single [`DetectionOutcome`]:
//!
//! - Only the first detection is considered. Models return detections sorted
//!   by descending confidence, so the first one is the best.
//! - A detection is accepted when its confidence is at least the configured
//!   threshold. Accepted detections get an annotated JPEG written to the
//!   images directory.
//! - Rejections write nothing.
//!
//! ## Model lifecycle
//!
//! The model is produced by a [`ModelLoader`] the first time it is needed and
//! reused afterwards. Concurrent first requests wait on the same load.
//!
//! ```no_run
//! use std::sync::Arc;
//! use pothole_core::detect::{DetectionAdapter, DetectorConfig, MockLoader, MockModel};
//!
//! # async fn example() -> pothole_core::Result<()> {
//! let loader = MockLoader::new(MockModel::single(0.87));
//! let adapter = DetectionAdapter::new(Arc::new(loader), DetectorConfig::default());
//! let image = std::fs::read("road.jpg").unwrap();
//! let outcome = adapter.detect(image).await?;
//! println!("{}", outcome.message());
//! # Ok(())
//! # }
//! ```

mod annotate;
mod mock;
#[cfg(feature = "remote")]
mod remote;

pub use annotate::{draw_box, image_filename, save_annotated, SavedImage};
pub use mock::{MockBehavior, MockLoader, MockModel};
#[cfg(feature = "remote")]
pub use remote::{RemoteModel, RemoteModelConfig, RemoteModelLoader};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::error::{PotholeError, Result};
use crate::record::NewPothole;

/// Default minimum confidence for accepting a detection.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Default limit for model loading and a single inference.
pub const DEFAULT_INFERENCE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default directory for annotated detection images.
pub const DEFAULT_IMAGES_DIR: &str = "detected_potholes";

/// A single object found by the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Pixel coordinates `[x1, y1, x2, y2]`
    pub bbox: [f64; 4],
    /// Model class index
    #[serde(default, alias = "class")]
    pub class_id: u32,
}

/// Object-detection model contract.
///
/// Implementations return detections sorted by descending confidence and may
/// omit anything below `confidence_threshold`.
#[async_trait]
pub trait InferenceModel: Send + Sync {
    async fn infer(&self, image_bytes: &[u8], confidence_threshold: f64)
        -> Result<Vec<Detection>>;
}

/// Produces the model on first use.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn InferenceModel>>;

    /// Human-readable backend description for logs.
    fn describe(&self) -> String;
}

/// Loader used when no inference backend is configured. Every load fails.
pub struct UnconfiguredLoader;

#[async_trait]
impl ModelLoader for UnconfiguredLoader {
    async fn load(&self) -> Result<Arc<dyn InferenceModel>> {
        Err(PotholeError::DetectionFailure(
            "no inference backend configured".into(),
        ))
    }

    fn describe(&self) -> String {
        "unconfigured".to_string()
    }
}

/// Adapter settings.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub confidence_threshold: f64,
    pub images_dir: PathBuf,
    pub inference_timeout: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            images_dir: PathBuf::from(DEFAULT_IMAGES_DIR),
            inference_timeout: DEFAULT_INFERENCE_TIMEOUT,
        }
    }
}

/// Normalized result of running detection on one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionOutcome {
    pub detected: bool,
    pub confidence: f64,
    pub bbox: Option<[f64; 4]>,
    pub image_filename: Option<String>,
    pub image_path: Option<String>,
}

impl DetectionOutcome {
    /// Outcome for an image without an accepted detection.
    pub fn not_detected() -> Self {
        Self {
            detected: false,
            confidence: 0.0,
            bbox: None,
            image_filename: None,
            image_path: None,
        }
    }

    /// Client-facing summary.
    pub fn message(&self) -> String {
        if self.detected {
            format!(
                "Pothole detected with {:.1}% confidence!",
                self.confidence * 100.0
            )
        } else {
            "No pothole detected in image.".to_string()
        }
    }

    /// Record-creation input for this outcome at the given location.
    ///
    /// Rejected outcomes carry neither confidence nor image.
    pub fn to_candidate(
        &self,
        latitude: f64,
        longitude: f64,
        timestamp: impl Into<String>,
    ) -> NewPothole {
        let candidate = NewPothole::new(latitude, longitude, timestamp);
        match (&self.image_path, self.detected) {
            (Some(path), true) => candidate.with_detection(self.confidence, path.clone()),
            _ => candidate,
        }
    }
}

/// Summary of saved detection images.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionStats {
    pub total_detections: usize,
    pub images_directory: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs the model and normalizes its output.
pub struct DetectionAdapter {
    loader: Arc<dyn ModelLoader>,
    model: OnceCell<Arc<dyn InferenceModel>>,
    config: DetectorConfig,
}

impl DetectionAdapter {
    pub fn new(loader: Arc<dyn ModelLoader>, config: DetectorConfig) -> Self {
        Self {
            loader,
            model: OnceCell::new(),
            config,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Description of the configured model backend.
    pub fn describe_loader(&self) -> String {
        self.loader.describe()
    }

    /// Whether the model has been loaded yet.
    pub fn is_model_loaded(&self) -> bool {
        self.model.initialized()
    }

    /// The loaded model, loading it on first call.
    ///
    /// A failed load leaves the adapter unloaded so a later call can retry.
    pub async fn model(&self) -> Result<Arc<dyn InferenceModel>> {
        let model = self
            .model
            .get_or_try_init(|| async {
                info!(backend = %self.loader.describe(), "Loading detection model");
                let model = tokio::time::timeout(self.config.inference_timeout, self.loader.load())
                    .await
                    .map_err(|_| {
                        PotholeError::DetectionFailure(format!(
                            "model load timed out after {}s",
                            self.config.inference_timeout.as_secs()
                        ))
                    })??;

                let images_dir = self.config.images_dir.clone();
                tokio::task::spawn_blocking(move || std::fs::create_dir_all(images_dir))
                    .await
                    .map_err(|e| PotholeError::DetectionFailure(e.to_string()))?
                    .map_err(|e| {
                        PotholeError::DetectionFailure(format!(
                            "cannot create images directory: {e}"
                        ))
                    })?;

                info!(images_dir = %self.config.images_dir.display(), "Detection model loaded");
                Ok::<_, PotholeError>(model)
            })
            .await?;
        Ok(Arc::clone(model))
    }

    /// Run detection on raw image bytes.
    #[instrument(level = "info", skip_all, fields(bytes = image_bytes.len()))]
    pub async fn detect(&self, image_bytes: Vec<u8>) -> Result<DetectionOutcome> {
        let threshold = self.config.confidence_threshold;

        let (image, image_bytes) = tokio::task::spawn_blocking(move || {
            let image = image::load_from_memory(&image_bytes);
            (image, image_bytes)
        })
        .await
        .map_err(|e| PotholeError::DetectionFailure(format!("decode task failed: {e}")))?;
        let image = image
            .map_err(|e| PotholeError::DetectionFailure(format!("cannot decode image: {e}")))?;

        let model = self.model().await?;
        let detections =
            tokio::time::timeout(self.config.inference_timeout, model.infer(&image_bytes, threshold))
                .await
                .map_err(|_| {
                    warn!("Inference timed out");
                    PotholeError::DetectionFailure(format!(
                        "inference timed out after {}s",
                        self.config.inference_timeout.as_secs()
                    ))
                })??;

        debug!(total = detections.len(), "Model returned detections");

        let Some(best) = detections.into_iter().next() else {
            info!(threshold, "No pothole detected");
            return Ok(DetectionOutcome::not_detected());
        };
        if best.confidence < threshold {
            info!(
                confidence = best.confidence,
                threshold, "Best detection below threshold"
            );
            return Ok(DetectionOutcome::not_detected());
        }

        let saved = self.save(image, best).await?;
        info!(
            confidence = best.confidence,
            image_filename = %saved.filename,
            "Pothole detected"
        );

        Ok(DetectionOutcome {
            detected: true,
            confidence: best.confidence,
            bbox: Some(best.bbox),
            image_filename: Some(saved.filename),
            image_path: Some(saved.path.to_string_lossy().into_owned()),
        })
    }

    async fn save(&self, image: DynamicImage, detection: Detection) -> Result<SavedImage> {
        let dir = self.config.images_dir.clone();
        tokio::task::spawn_blocking(move || {
            save_annotated(image, detection.bbox, detection.confidence, &dir)
        })
        .await
        .map_err(|e| PotholeError::DetectionFailure(format!("save task failed: {e}")))?
    }

    /// Count of saved detection images.
    pub async fn stats(&self) -> DetectionStats {
        let dir = self.config.images_dir.clone();
        let images_directory = dir.to_string_lossy().into_owned();

        let counted = tokio::task::spawn_blocking(move || -> std::io::Result<usize> {
            std::fs::create_dir_all(&dir)?;
            let mut count = 0;
            for entry in std::fs::read_dir(&dir)? {
                let name = entry?.file_name();
                if name.to_string_lossy().ends_with(".jpg") {
                    count += 1;
                }
            }
            Ok(count)
        })
        .await;

        match counted.map_err(|e| e.to_string()).and_then(|r| r.map_err(|e| e.to_string())) {
            Ok(total_detections) => DetectionStats {
                total_detections,
                images_directory,
                error: None,
            },
            Err(error) => {
                warn!(error = %error, "Failed to count detection images");
                DetectionStats {
                    total_detections: 0,
                    images_directory,
                    error: Some(error),
                }
            }
        }
    }
}
