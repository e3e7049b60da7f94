//! Route handlers and wire types
//!
//! Response shapes are part of the cockpit contract; field names stay
//! camelCase where the cockpit expects them. Camera work happens on the
//! blocking pool, the handlers themselves never touch a device directly.

use crate::camera::registry::CameraDescriptor;
use crate::camera::stream;
use crate::context::HardwareContext;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ControlRequest {
    /// Forward/reverse joystick axis, -255 to 255
    #[serde(default, rename = "forwardReverse")]
    pub forward_reverse: i64,
    /// Left/right joystick axis, -255 to 255
    #[serde(default, rename = "leftRight")]
    pub left_right: i64,
}

#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub status: &'static str,
    #[serde(rename = "leftMotor")]
    pub left_motor: i32,
    #[serde(rename = "rightMotor")]
    pub right_motor: i32,
    pub platform: &'static str,
}

#[derive(Debug, Default, Deserialize)]
pub struct LightsRequest {
    #[serde(default)]
    pub on: bool,
}

#[derive(Debug, Serialize)]
pub struct LightsResponse {
    pub status: &'static str,
    pub on: bool,
}

#[derive(Debug, Serialize)]
pub struct CameraInfoResponse {
    pub status: &'static str,
    pub camera_id: String,
    pub is_open: bool,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub stream_url: String,
    pub snapshot_url: String,
}

#[derive(Debug, Serialize)]
pub struct CameraUnavailableResponse {
    pub status: &'static str,
    pub camera_id: String,
    pub is_open: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub status: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CameraListResponse {
    pub status: &'static str,
    pub cameras: BTreeMap<String, CameraEntry>,
}

#[derive(Debug, Serialize)]
pub struct CameraEntry {
    pub available: bool,
    pub name: String,
}

impl From<CameraDescriptor> for CameraEntry {
    fn from(descriptor: CameraDescriptor) -> Self {
        Self {
            available: descriptor.available,
            name: descriptor.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub cameras: BTreeMap<String, bool>,
    pub platform: &'static str,
    pub message: String,
}

/// POST /control
///
/// Mixes the two joystick axes into wheel speeds and applies them.
/// Out-of-range values clamp, absent fields read as zero, a body that is
/// not JSON is rejected before this handler runs.
pub async fn control(
    State(context): State<Arc<HardwareContext>>,
    Json(request): Json<ControlRequest>,
) -> Json<ControlResponse> {
    let speeds = context.drive(request.forward_reverse, request.left_right);
    Json(ControlResponse {
        status: "success",
        left_motor: speeds.left,
        right_motor: speeds.right,
        platform: context.platform().name(),
    })
}

/// GET /lights
pub async fn lights_get(State(context): State<Arc<HardwareContext>>) -> Json<LightsResponse> {
    Json(LightsResponse {
        status: "success",
        on: context.lights().get(),
    })
}

/// POST /lights
///
/// A missing or unparseable body switches the lights off, the cockpit
/// sends `{"on": true}` or `{"on": false}`.
pub async fn lights_set(
    State(context): State<Arc<HardwareContext>>,
    request: Option<Json<LightsRequest>>,
) -> Json<LightsResponse> {
    let desired = request.map(|Json(r)| r.on).unwrap_or(false);
    let on = context.lights().set(desired);
    Json(LightsResponse {
        status: "success",
        on,
    })
}

/// GET /camera/{camera_id}
pub async fn camera_info(
    State(context): State<Arc<HardwareContext>>,
    Path(camera_id): Path<String>,
) -> Response {
    let status = {
        let context = Arc::clone(&context);
        let id = camera_id.clone();
        run_blocking(move || context.cameras().status(&id)).await
    };
    let status = match status {
        Ok(status) => status,
        Err(response) => return response,
    };

    if status.is_open {
        Json(CameraInfoResponse {
            status: "success",
            camera_id: camera_id.clone(),
            is_open: true,
            width: status.width,
            height: status.height,
            fps: status.fps,
            stream_url: format!("/camera/{}/stream", camera_id),
            snapshot_url: format!("/camera/{}/snapshot", camera_id),
        })
        .into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(CameraUnavailableResponse {
                status: "error",
                camera_id,
                is_open: false,
                message: "Camera is not available",
            }),
        )
            .into_response()
    }
}

/// GET /camera/{camera_id}/stream
///
/// Responds immediately with an MJPEG multipart body fed by a producer
/// task. A camera that cannot capture keeps the response open and
/// retries, matching the behavior of a camera that flaps mid-stream.
pub async fn camera_stream(
    State(context): State<Arc<HardwareContext>>,
    Path(camera_id): Path<String>,
) -> impl IntoResponse {
    let (rx, _producer) = stream::spawn_producer(context, camera_id);
    let body = Body::from_stream(futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv()
            .await
            .map(|chunk| (Ok::<_, std::convert::Infallible>(chunk), rx))
    }));
    ([(header::CONTENT_TYPE, stream::content_type())], body)
}

/// GET /camera/{camera_id}/snapshot
pub async fn camera_snapshot(
    State(context): State<Arc<HardwareContext>>,
    Path(camera_id): Path<String>,
) -> Response {
    let frame = {
        let context = Arc::clone(&context);
        let id = camera_id.clone();
        run_blocking(move || context.cameras().read_frame(&id)).await
    };
    match frame {
        Ok(Ok(jpeg)) => ([(header::CONTENT_TYPE, "image/jpeg")], jpeg).into_response(),
        Ok(Err(_)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(MessageResponse {
                status: "error",
                message: format!("Failed to capture image from camera {}", camera_id),
            }),
        )
            .into_response(),
        Err(response) => response,
    }
}

/// POST /camera/{camera_id}/release
pub async fn camera_release(
    State(context): State<Arc<HardwareContext>>,
    Path(camera_id): Path<String>,
) -> Response {
    let released = {
        let context = Arc::clone(&context);
        let id = camera_id.clone();
        run_blocking(move || context.cameras().release(&id)).await
    };
    match released {
        Ok(Ok(())) => Json(MessageResponse {
            status: "success",
            message: format!("Camera {} released", camera_id),
        })
        .into_response(),
        Ok(Err(_)) => (
            StatusCode::NOT_FOUND,
            Json(MessageResponse {
                status: "error",
                message: format!("Camera {} not found", camera_id),
            }),
        )
            .into_response(),
        Err(response) => response,
    }
}

/// GET /cameras
pub async fn cameras_list(State(context): State<Arc<HardwareContext>>) -> Response {
    let discovered = run_blocking(move || context.cameras().discover()).await;
    match discovered {
        Ok(cameras) => Json(CameraListResponse {
            status: "success",
            cameras: cameras
                .into_iter()
                .map(|(id, descriptor)| (id, descriptor.into()))
                .collect(),
        })
        .into_response(),
        Err(response) => response,
    }
}

/// GET /status
pub async fn status(State(context): State<Arc<HardwareContext>>) -> Response {
    let platform = context.platform().name();
    let cameras = run_blocking(move || context.cameras().status_map()).await;
    match cameras {
        Ok(cameras) => Json(StatusResponse {
            status: "online",
            cameras,
            platform,
            message: format!("Robot control server is running on {}", platform),
        })
        .into_response(),
        Err(response) => response,
    }
}

/// Run a camera operation on the blocking pool
///
/// A cancelled or panicked task maps to a bare 500; the per-route error
/// bodies stay with their handlers.
async fn run_blocking<T, F>(task: F) -> std::result::Result<T, Response>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(task).await.map_err(|e| {
        log::error!("blocking camera task failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })
}
