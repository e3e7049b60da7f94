//! MJPEG frame streaming
//!
//! A blocking producer reads frames through the registry and pushes
//! multipart chunks into a bounded channel; the HTTP layer drains the
//! channel as the response body. The producer checks the process running
//! flag and consumer liveness on every iteration and never parks: when
//! the consumer falls behind, the current frame is dropped instead of
//! queued. Capture failures are retried forever; the stream only ends on
//! consumer disconnect or process shutdown.

use crate::context::HardwareContext;
use log::{debug, info};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

/// Multipart boundary between frames
pub const FRAME_BOUNDARY: &str = "frame";

/// Channel capacity in frames
const CHANNEL_FRAMES: usize = 8;

/// Pause between frames (about 20 fps)
const FRAME_INTERVAL: Duration = Duration::from_millis(50);

/// Pause before retrying a failed capture
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Content type of the stream response
pub fn content_type() -> String {
    format!("multipart/x-mixed-replace; boundary={}", FRAME_BOUNDARY)
}

/// Wrap one JPEG frame in its multipart chunk
fn encode_chunk(jpeg: &[u8]) -> Vec<u8> {
    let header = format!("--{}\r\nContent-Type: image/jpeg\r\n\r\n", FRAME_BOUNDARY);
    let mut chunk = Vec::with_capacity(header.len() + jpeg.len() + 2);
    chunk.extend_from_slice(header.as_bytes());
    chunk.extend_from_slice(jpeg);
    chunk.extend_from_slice(b"\r\n");
    chunk
}

/// Spawn the frame producer for one camera stream
///
/// Returns the chunk receiver and the producer task handle. The producer
/// ends when the receiver is dropped or the context shuts down; a capture
/// failure only delays the next attempt, and a full channel drops the
/// frame instead of blocking.
pub fn spawn_producer(
    context: Arc<HardwareContext>,
    camera_id: String,
) -> (mpsc::Receiver<Vec<u8>>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(CHANNEL_FRAMES);
    let handle = tokio::task::spawn_blocking(move || {
        info!("camera {}: stream started", camera_id);
        let running = context.running();
        while running.load(Ordering::Relaxed) {
            if tx.is_closed() {
                break;
            }
            match context.cameras().read_frame(&camera_id) {
                Ok(jpeg) => {
                    match tx.try_send(encode_chunk(&jpeg)) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            debug!("camera {}: consumer lagging, frame dropped", camera_id);
                        }
                        Err(TrySendError::Closed(_)) => break,
                    }
                    thread::sleep(FRAME_INTERVAL);
                }
                Err(e) => {
                    debug!("camera {}: capture failed, retrying: {}", camera_id, e);
                    thread::sleep(RETRY_DELAY);
                }
            }
        }
        info!("camera {}: stream ended", camera_id);
    });
    (rx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::context::HardwareContext;
    use crate::platform::Platform;
    use tokio::time::timeout;

    fn sim_context() -> Arc<HardwareContext> {
        let config = AppConfig::defaults_for(Platform::Simulation);
        Arc::new(HardwareContext::initialize(Platform::Simulation, None, &config).unwrap())
    }

    #[test]
    fn test_chunk_framing() {
        let chunk = encode_chunk(&[0xff, 0xd8, 0xff, 0xd9]);
        let expected_header: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
        assert!(chunk.starts_with(expected_header));
        assert!(chunk.ends_with(&[0xff, 0xd9, b'\r', b'\n']));
        assert_eq!(chunk.len(), expected_header.len() + 4 + 2);
    }

    #[tokio::test]
    async fn test_producer_delivers_frames() {
        let context = sim_context();
        let (mut rx, handle) = spawn_producer(Arc::clone(&context), "0".to_string());

        let chunk = timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(chunk.starts_with(b"--frame\r\n"));

        // Dropping the receiver ends the producer
        drop(rx);
        timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_producer_stops_on_shutdown_flag() {
        let context = sim_context();
        let (mut rx, handle) = spawn_producer(Arc::clone(&context), "0".to_string());
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();

        context.running().store(false, Ordering::Relaxed);
        timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_stalled_consumer_does_not_block_shutdown() {
        // Small frames so the channel fills well within the stall window
        let mut config = AppConfig::defaults_for(Platform::Simulation);
        config.camera.width = 64;
        config.camera.height = 48;
        let context =
            Arc::new(HardwareContext::initialize(Platform::Simulation, None, &config).unwrap());

        // Hold the receiver without reading it; the producer must keep
        // cycling (dropping frames) instead of parking on a full channel
        let (_rx, handle) = spawn_producer(Arc::clone(&context), "0".to_string());
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert!(!handle.is_finished());

        context.running().store(false, Ordering::Relaxed);
        timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_producer_survives_missing_camera() {
        let context = sim_context();
        // No simulated device has id 9; the producer keeps retrying
        let (rx, handle) = spawn_producer(Arc::clone(&context), "9".to_string());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!handle.is_finished());

        drop(rx);
        timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }
}
