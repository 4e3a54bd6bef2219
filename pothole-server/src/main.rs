//! Pothole Server - REST API for pothole detection and reporting
//!
//! Exposes pothole-core functionality via HTTP endpoints:
//! - POST /detect - Run pothole detection on an uploaded image
//! - POST /potholes - Report a pothole at a location
//! - GET /potholes - List reported potholes
//! - DELETE /potholes/{id} - Delete a report and its image

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pothole_core::{
    LogNotifier, ModelLoader, Notifier, RemoteModelConfig, RemoteModelLoader, UnconfiguredLoader,
    WebhookConfig, WebhookNotifier,
};
use pothole_server::{create_router_with_config, AppState, Config};
use tracing_subscriber::{fmt, EnvFilter};

fn model_loader(config: &Config) -> Arc<dyn ModelLoader> {
    match &config.inference_url {
        Some(url) => Arc::new(RemoteModelLoader::new(RemoteModelConfig {
            url: url.clone(),
            timeout: Duration::from_secs(config.inference_timeout_secs),
        })),
        None => {
            tracing::warn!("INFERENCE_URL not set, /detect will fail until configured");
            Arc::new(UnconfiguredLoader)
        }
    }
}

fn notifier(config: &Config) -> Arc<dyn Notifier> {
    let Some(url) = &config.notify_webhook_url else {
        return Arc::new(LogNotifier);
    };
    match WebhookNotifier::new(WebhookConfig::new(url.clone())) {
        Ok(notifier) => Arc::new(notifier),
        Err(e) => {
            tracing::error!(error = %e, "Webhook notifier unavailable, alerts will only be logged");
            Arc::new(LogNotifier)
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("pothole_server=info,pothole_core=info,tower_http=info")
            }),
        )
        .with_target(true)
        .init();

    let config = Config::from_env();
    let state = AppState::new(&config, model_loader(&config), notifier(&config));

    state.store.initialize().await?;
    tokio::fs::create_dir_all(&config.images_dir).await?;

    tracing::info!(
        csv = %config.potholes_csv.display(),
        images = %config.images_dir.display(),
        model = %state.detector.describe_loader(),
        notifier = state.notifier.name(),
        threshold = config.confidence_threshold,
        "Pothole server starting"
    );

    let app = create_router_with_config(state, &config);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("API docs at http://{}/swagger-ui", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}
