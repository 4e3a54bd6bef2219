//! Mock inference backend for testing.
//!
//! WARNING: returns canned detections regardless of the image content.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{Detection, InferenceModel, ModelLoader};
use crate::error::{PotholeError, Result};

/// What a [`MockModel`] does when asked to infer.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return these detections as-is
    Detections(Vec<Detection>),
    /// Fail with a detection error
    Fail(String),
    /// Never complete
    Hang,
}

/// Model returning a fixed behavior.
#[derive(Debug)]
pub struct MockModel {
    behavior: MockBehavior,
    calls: AtomicUsize,
}

impl MockModel {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self::with_behavior(MockBehavior::Detections(detections))
    }

    pub fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    /// One detection covering the top-left quarter of a typical frame.
    pub fn single(confidence: f64) -> Self {
        Self::new(vec![Detection {
            confidence,
            bbox: [4.0, 4.0, 24.0, 20.0],
            class_id: 0,
        }])
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_behavior(MockBehavior::Fail(message.into()))
    }

    pub fn hanging() -> Self {
        Self::with_behavior(MockBehavior::Hang)
    }

    /// Number of inference calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceModel for MockModel {
    async fn infer(&self, _image_bytes: &[u8], _confidence_threshold: f64) -> Result<Vec<Detection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            MockBehavior::Detections(detections) => Ok(detections.clone()),
            MockBehavior::Fail(message) => Err(PotholeError::DetectionFailure(message.clone())),
            MockBehavior::Hang => std::future::pending().await,
        }
    }
}

/// Loader handing out a shared [`MockModel`], counting loads.
pub struct MockLoader {
    model: Arc<MockModel>,
    loads: AtomicUsize,
    delay: Duration,
}

impl MockLoader {
    pub fn new(model: MockModel) -> Self {
        Self {
            model: Arc::new(model),
            loads: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    /// Make every load take at least `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of times [`ModelLoader::load`] ran.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn model(&self) -> Arc<MockModel> {
        Arc::clone(&self.model)
    }
}

#[async_trait]
impl ModelLoader for MockLoader {
    async fn load(&self) -> Result<Arc<dyn InferenceModel>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.model.clone())
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}
