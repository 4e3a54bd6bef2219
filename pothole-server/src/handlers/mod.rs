//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod detect;
pub mod health;
pub mod potholes;

pub use crate::state::AppState;
pub use detect::{
    detect_handler, detection_stats_handler, DetectResponse, DetectionStatsResponse, IMAGES_ROUTE,
};
pub use health::{health, ready, root, EndpointInfo, HealthResponse, ReadyResponse, RootResponse};
pub use potholes::{
    create_pothole_handler, delete_pothole_handler, get_pothole_handler, list_potholes_handler,
    CreatePotholeRequest, DeletePotholeResponse, PotholeResponse,
};
