//! HTTP inference backend.
//!
//! Posts the raw image to a model-serving endpoint and reads back
//! `{"detections": [{"confidence", "bbox", "class_id"}, ...]}`, sorted by
//! descending confidence. The threshold is sent as the `conf` query
//! parameter.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::{Detection, InferenceModel, ModelLoader, DEFAULT_INFERENCE_TIMEOUT};
use crate::error::{PotholeError, Result};

/// Configuration for the remote inference backend.
#[derive(Debug, Clone)]
pub struct RemoteModelConfig {
    /// Inference endpoint URL
    pub url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl RemoteModelConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_INFERENCE_TIMEOUT,
        }
    }
}

#[derive(Debug, Deserialize)]
struct InferenceResponse {
    detections: Vec<Detection>,
}

/// Builds a [`RemoteModel`] on first use.
pub struct RemoteModelLoader {
    config: RemoteModelConfig,
}

impl RemoteModelLoader {
    pub fn new(config: RemoteModelConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ModelLoader for RemoteModelLoader {
    async fn load(&self) -> Result<Arc<dyn InferenceModel>> {
        Ok(Arc::new(RemoteModel::new(self.config.clone())?))
    }

    fn describe(&self) -> String {
        format!("remote ({})", self.config.url)
    }
}

/// Client for a remote object-detection service.
pub struct RemoteModel {
    client: Client,
    endpoint: Url,
}

impl RemoteModel {
    #[instrument(level = "debug", skip_all, fields(url = %config.url))]
    pub fn new(config: RemoteModelConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.url).map_err(|e| {
            PotholeError::DetectionFailure(format!("invalid inference URL {}: {e}", config.url))
        })?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                warn!(error = %e, "Failed to create HTTP client");
                PotholeError::DetectionFailure(format!("failed to create HTTP client: {e}"))
            })?;

        info!("Remote inference client created");
        Ok(Self { client, endpoint })
    }

    fn request_url(&self, confidence_threshold: f64) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("conf", &confidence_threshold.to_string());
        url
    }
}

#[async_trait]
impl InferenceModel for RemoteModel {
    #[instrument(level = "debug", skip(self, image_bytes), fields(bytes = image_bytes.len()))]
    async fn infer(&self, image_bytes: &[u8], confidence_threshold: f64) -> Result<Vec<Detection>> {
        let start = Instant::now();

        let response = self
            .client
            .post(self.request_url(confidence_threshold))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image_bytes.to_vec())
            .send()
            .await
            .map_err(|e| PotholeError::DetectionFailure(format!("inference request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Inference service returned an error");
            return Err(PotholeError::DetectionFailure(format!(
                "inference service returned status: {status}"
            )));
        }

        let parsed: InferenceResponse = response.json().await.map_err(|e| {
            PotholeError::DetectionFailure(format!("invalid inference response: {e}"))
        })?;

        debug!(
            detections = parsed.detections.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Inference completed"
        );
        Ok(parsed.detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url_appends_threshold() {
        let model = RemoteModel::new(RemoteModelConfig::new("http://localhost:9000/predict?model=best")).unwrap();
        let url = model.request_url(0.5);
        assert_eq!(url.as_str(), "http://localhost:9000/predict?model=best&conf=0.5");
    }

    #[test]
    fn test_invalid_url_is_detection_failure() {
        let err = RemoteModel::new(RemoteModelConfig::new("not a url")).err().unwrap();
        assert!(matches!(err, PotholeError::DetectionFailure(_)));
    }

    #[test]
    fn test_response_accepts_class_alias() {
        let parsed: InferenceResponse = serde_json::from_str(
            r#"{"detections":[{"confidence":0.91,"bbox":[1,2,3,4],"class":0}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.detections[0].bbox, [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(parsed.detections[0].class_id, 0);
    }
}
