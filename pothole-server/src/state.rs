//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use pothole_core::{DetectionAdapter, LogNotifier, ModelLoader, Notifier, RecordStore};

use crate::config::Config;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Durable pothole records
    pub store: Arc<RecordStore>,
    /// Detection adapter holding the lazily loaded model
    pub detector: Arc<DetectionAdapter>,
    /// Alert channel for new detections
    pub notifier: Arc<dyn Notifier>,
    /// Maximum upload size in bytes
    pub max_file_size: usize,
}

impl AppState {
    /// Build state from config with an explicit model loader and notifier.
    pub fn new(config: &Config, loader: Arc<dyn ModelLoader>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store: Arc::new(
                RecordStore::new(config.potholes_csv.clone())
                    .with_images_dir(config.images_dir.clone()),
            ),
            detector: Arc::new(DetectionAdapter::new(loader, config.detector_config())),
            notifier,
            max_file_size: config.max_file_size_bytes(),
        }
    }

    /// Build state that only logs alerts.
    pub fn with_loader(config: &Config, loader: Arc<dyn ModelLoader>) -> Self {
        Self::new(config, loader, Arc::new(LogNotifier))
    }
}
