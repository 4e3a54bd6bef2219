//! Request validation module
//!
//! Provides validation utilities for image uploads and new pothole reports.

use std::path::{Component, Path};

use pothole_core::NewPothole;

use crate::error::ApiError;

/// Allowed MIME type categories for detection uploads
const ALLOWED_MIME_PREFIXES: &[&str] = &["image/", "application/octet-stream"];

/// Validates the Content-Type of an uploaded file
///
/// Accepts:
/// - image/* (image/jpeg, image/png, image/webp, etc.)
/// - application/octet-stream (binary data)
///
/// Returns an error if the Content-Type is not supported.
pub fn validate_content_type(content_type: Option<&str>) -> Result<(), ApiError> {
    match content_type {
        Some(ct) => {
            let ct_lower = ct.to_lowercase();
            if ALLOWED_MIME_PREFIXES
                .iter()
                .any(|prefix| ct_lower.starts_with(prefix))
            {
                Ok(())
            } else {
                Err(ApiError::bad_request(format!(
                    "Unsupported Content-Type: '{}'. Allowed types: image/*, application/octet-stream",
                    ct
                )))
            }
        }
        // Allow missing Content-Type (treat as binary)
        None => Ok(()),
    }
}

/// Validates the size of an uploaded file
///
/// Returns an error if the file is empty or exceeds the maximum size.
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), ApiError> {
    if size == 0 {
        return Err(ApiError::bad_request("Uploaded file is empty"));
    }
    if size > max_size {
        let max_mb = max_size / (1024 * 1024);
        let actual_mb = size / (1024 * 1024);
        Err(ApiError::bad_request(format!(
            "File too large: {} MB exceeds maximum of {} MB",
            actual_mb, max_mb
        )))
    } else {
        Ok(())
    }
}

/// Validates a pothole report before it reaches the store
///
/// The timestamp is opaque, so only its presence is checked. An image path
/// must be a bare file name or lie under `images_dir`.
pub fn validate_new_pothole(candidate: &NewPothole, images_dir: &Path) -> Result<(), ApiError> {
    if candidate.timestamp.trim().is_empty() {
        return Err(ApiError::bad_request("timestamp is required"));
    }
    if !candidate.latitude.is_finite() || !candidate.longitude.is_finite() {
        return Err(ApiError::bad_request("latitude and longitude must be finite numbers"));
    }
    if let Some(confidence) = candidate.confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ApiError::bad_request(format!(
                "confidence must be between 0 and 1, got {}",
                confidence
            )));
        }
    }
    if let Some(image_path) = candidate.image_path.as_deref() {
        validate_image_path(image_path, images_dir)?;
    }
    Ok(())
}

/// Checks an image path lexically, since the file need not exist yet
fn validate_image_path(image_path: &str, images_dir: &Path) -> Result<(), ApiError> {
    let path = Path::new(image_path);
    let escapes = path
        .components()
        .any(|c| matches!(c, Component::ParentDir));
    let bare_name = path
        .parent()
        .map_or(true, |parent| parent.as_os_str().is_empty());

    if !escapes && (bare_name || path.starts_with(images_dir)) {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "image_path must be inside the images directory: '{}'",
            image_path
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_content_type_image() {
        assert!(validate_content_type(Some("image/jpeg")).is_ok());
        assert!(validate_content_type(Some("image/png")).is_ok());
        assert!(validate_content_type(Some("IMAGE/JPEG")).is_ok()); // case insensitive
    }

    #[test]
    fn test_validate_content_type_binary_and_none() {
        assert!(validate_content_type(Some("application/octet-stream")).is_ok());
        assert!(validate_content_type(None).is_ok());
    }

    #[test]
    fn test_validate_content_type_rejected() {
        assert!(validate_content_type(Some("video/mp4")).is_err());
        assert!(validate_content_type(Some("text/html")).is_err());
        assert!(validate_content_type(Some("application/json")).is_err());
    }

    #[test]
    fn test_validate_file_size() {
        let max = 10 * 1024 * 1024; // 10 MB
        assert!(validate_file_size(1024, max).is_ok());
        assert!(validate_file_size(max, max).is_ok()); // exactly max
        assert!(validate_file_size(max + 1, max).is_err());
        assert!(validate_file_size(0, max).is_err());
    }

    #[test]
    fn test_validate_new_pothole() {
        let images = Path::new("detected_potholes");
        let ok = NewPothole::new(40.0, -73.0, "2025-01-01T00:00:00Z");
        assert!(validate_new_pothole(&ok, images).is_ok());
        assert!(validate_new_pothole(&ok.clone().with_detection(1.0, "a.jpg"), images).is_ok());

        assert!(validate_new_pothole(&NewPothole::new(40.0, -73.0, "  "), images).is_err());
        assert!(validate_new_pothole(&NewPothole::new(f64::NAN, -73.0, "t"), images).is_err());
        assert!(validate_new_pothole(&ok.with_detection(1.5, "a.jpg"), images).is_err());
    }

    #[test]
    fn test_validate_image_path_stays_in_images_dir() {
        let images = Path::new("/data/detected_potholes");
        assert!(validate_image_path("pothole.jpg", images).is_ok());
        assert!(validate_image_path("/data/detected_potholes/pothole.jpg", images).is_ok());

        assert!(validate_image_path("/data/potholes.csv", images).is_err());
        assert!(validate_image_path("/etc/passwd", images).is_err());
        assert!(validate_image_path("other/pothole.jpg", images).is_err());
        assert!(validate_image_path("../potholes.csv", images).is_err());
        assert!(validate_image_path("/data/detected_potholes/../potholes.csv", images).is_err());
    }
}
