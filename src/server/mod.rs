//! HTTP control surface
//!
//! Exposes drive, lights and camera operations over a small JSON API plus
//! an MJPEG stream per camera. All routes share one [`HardwareContext`].
//! CORS is wide open so the browser cockpit can be served from anywhere
//! on the local network.

pub mod routes;

use crate::context::HardwareContext;
use crate::error::{Error, Result};
use axum::routing::{get, post};
use axum::Router;
use log::info;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Build the application router
pub fn router(context: Arc<HardwareContext>) -> Router {
    Router::new()
        .route("/control", post(routes::control))
        .route("/lights", get(routes::lights_get).post(routes::lights_set))
        .route("/camera/:camera_id", get(routes::camera_info))
        .route("/camera/:camera_id/stream", get(routes::camera_stream))
        .route("/camera/:camera_id/snapshot", get(routes::camera_snapshot))
        .route("/camera/:camera_id/release", post(routes::camera_release))
        .route("/cameras", get(routes::cameras_list))
        .route("/status", get(routes::status))
        .with_state(context)
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Serve the API until Ctrl-C
///
/// The shutdown future clears the running flag before the graceful-shutdown
/// phase starts, so open MJPEG streams end and their connections can drain
/// instead of holding the server up forever.
pub async fn serve(context: Arc<HardwareContext>, bind_address: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .map_err(|e| Error::Other(format!("failed to bind {}: {}", bind_address, e)))?;
    info!("HTTP server listening on {}", bind_address);

    let app = router(Arc::clone(&context));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(context))
        .await?;
    Ok(())
}

async fn shutdown_signal(context: Arc<HardwareContext>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Completing here would stop the server, so park instead
        log::warn!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("received shutdown signal");
    context.running().store(false, Ordering::Relaxed);
}
