//! Pothole Core - storage and detection for geotagged pothole reports
//!
//! This crate provides the pieces behind the pothole server: a flat-file
//! record store, the row codec it uses, and an adapter around an external
//! object-detection model.
//!
//! # Features
//!
//! - Append-only CSV storage with a fixed header and stable, never reused ids
//! - Atomic whole-file rewrite on delete
//! - Lazily loaded, shared detection model with a confidence threshold
//! - Annotated JPEG output for accepted detections
//! - Best-effort alerts for detected potholes
//!
//! # Example
//!
//! ```no_run
//! use pothole_core::{NewPothole, RecordStore};
//!
//! # async fn example() -> pothole_core::Result<()> {
//! let store = RecordStore::new("potholes.csv");
//! store.initialize().await?;
//!
//! let record = store
//!     .create(NewPothole::new(40.7128, -74.006, "2025-12-29T15:30:00Z"))
//!     .await?;
//! assert_eq!(store.get_by_id(record.id).await?, record);
//!
//! let deletion = store.delete_by_id(record.id).await?;
//! println!("{} potholes remain", deletion.remaining_count);
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod detect;
pub mod error;
pub mod notify;
pub mod record;
pub mod store;

// Re-export main types for convenience
pub use detect::{
    Detection, DetectionAdapter, DetectionOutcome, DetectionStats, DetectorConfig,
    InferenceModel, ModelLoader, UnconfiguredLoader,
};
pub use error::{PotholeError, Result};
pub use notify::{format_alert, spawn_notification, Alert, LogNotifier, Notifier};
pub use record::{NewPothole, PotholeRecord};
pub use store::{Deletion, RecordStore};

#[cfg(feature = "remote")]
pub use detect::{RemoteModelConfig, RemoteModelLoader};
#[cfg(feature = "remote")]
pub use notify::{WebhookConfig, WebhookNotifier};
