//! OpenAPI documentation configuration
//!
//! Generates OpenAPI 3.0 specification for the Pothole Detection API.

use utoipa::OpenApi;

use crate::handlers::{
    CreatePotholeRequest, DeletePotholeResponse, DetectResponse, DetectionStatsResponse,
    EndpointInfo, HealthResponse, PotholeResponse, ReadyResponse, RootResponse,
};

/// Pothole Detection API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pothole Detection API",
        version = "0.1.0",
        description = r#"
## Geotagged Pothole Reporting API

Upload road images for automatic pothole detection and keep a durable log of
where potholes were found.

### How It Works

1. **Detect** a pothole in a photo via `POST /detect`
2. If the model is confident enough, an annotated copy of the image is saved
3. **Report** the pothole with its location via `POST /potholes`, passing the
   returned `confidence` and `image_path`
4. **List** or **delete** reports via `/potholes`

Reports created from a detection trigger an alert with a map link.
"#,
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server")
    ),
    tags(
        (name = "Potholes", description = "Create, list and delete pothole reports"),
        (name = "Detection", description = "Run pothole detection on uploaded images"),
        (name = "Health", description = "Service index, health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::root,
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::potholes::create_pothole_handler,
        crate::handlers::potholes::list_potholes_handler,
        crate::handlers::potholes::get_pothole_handler,
        crate::handlers::potholes::delete_pothole_handler,
        crate::handlers::detect::detect_handler,
        crate::handlers::detect::detection_stats_handler,
    ),
    components(
        schemas(
            RootResponse,
            EndpointInfo,
            HealthResponse,
            ReadyResponse,
            CreatePotholeRequest,
            PotholeResponse,
            DeletePotholeResponse,
            DetectResponse,
            DetectionStatsResponse,
        )
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_all_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/",
            "/potholes",
            "/potholes/{id}",
            "/detect",
            "/detection-stats",
            "/health",
            "/ready",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
