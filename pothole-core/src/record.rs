//! Pothole record model.
//!
//! A [`PotholeRecord`] is the only persisted entity. Records are created from a
//! [`NewPothole`] candidate once the store has assigned an identifier.

use serde::{Deserialize, Serialize};

/// A stored pothole detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PotholeRecord {
    /// Store-assigned identifier, unique and increasing in assignment order
    pub id: u64,
    /// Decimal degrees
    pub latitude: f64,
    /// Decimal degrees
    pub longitude: f64,
    /// Client-supplied capture time, kept verbatim
    pub timestamp: String,
    /// Model confidence in [0, 1], absent for manual reports
    pub confidence: Option<f64>,
    /// Reference to the annotated detection image
    pub image_path: Option<String>,
}

/// Candidate record submitted for creation, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPothole {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub image_path: Option<String>,
}

impl NewPothole {
    /// Candidate without detection metadata.
    pub fn new(latitude: f64, longitude: f64, timestamp: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            timestamp: timestamp.into(),
            confidence: None,
            image_path: None,
        }
    }

    /// Attach the confidence and image produced by a detection.
    pub fn with_detection(mut self, confidence: f64, image_path: impl Into<String>) -> Self {
        self.confidence = Some(confidence);
        self.image_path = Some(image_path.into());
        self
    }

    /// Materialize the candidate under the given identifier.
    pub fn into_record(self, id: u64) -> PotholeRecord {
        PotholeRecord {
            id,
            latitude: self.latitude,
            longitude: self.longitude,
            timestamp: self.timestamp,
            confidence: self.confidence,
            // An empty reference is the same as no reference on disk
            image_path: self.image_path.filter(|p| !p.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_record_assigns_id() {
        let record = NewPothole::new(40.0, -73.0, "2025-01-01T00:00:00Z").into_record(7);
        assert_eq!(record.id, 7);
        assert_eq!(record.confidence, None);
        assert_eq!(record.image_path, None);
    }

    #[test]
    fn test_with_detection_sets_optional_fields() {
        let record = NewPothole::new(41.0, -74.0, "2025-01-02T00:00:00Z")
            .with_detection(0.9, "a.jpg")
            .into_record(2);
        assert_eq!(record.confidence, Some(0.9));
        assert_eq!(record.image_path.as_deref(), Some("a.jpg"));
    }

    #[test]
    fn test_empty_image_path_is_absent() {
        let mut candidate = NewPothole::new(1.0, 2.0, "t");
        candidate.image_path = Some(String::new());
        assert_eq!(candidate.into_record(1).image_path, None);
    }

    #[test]
    fn test_serializes_absent_fields_as_null() {
        let record = NewPothole::new(40.0, -73.0, "2025-01-01T00:00:00Z").into_record(1);
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["confidence"].is_null());
        assert!(json["image_path"].is_null());
        assert_eq!(json["id"], 1);
    }
}
