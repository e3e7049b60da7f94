//! Camera capture, session management and streaming
//!
//! Devices are opened lazily, shared behind per-id locks and encoded to
//! JPEG outside those locks. The simulated backend is always available;
//! real V4L2 capture sits behind the `v4l2` feature.

pub mod registry;
pub mod sim;
pub mod stream;
#[cfg(feature = "v4l2")]
pub mod v4l2;

use crate::error::Result;
use crate::platform::Platform;

/// A single captured frame
pub enum CapturedFrame {
    /// Already JPEG encoded (pass-through backends)
    Jpeg(Vec<u8>),
    /// Raw RGB8 pixels, JPEG encoded by the caller once the device lock
    /// is released
    Rgb {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
}

/// An open camera device
pub trait CameraDevice: Send {
    /// Whether the device is currently delivering frames
    fn is_open(&self) -> bool;

    /// Capture one frame
    fn read_frame(&mut self) -> Result<CapturedFrame>;

    /// Close the device; the registry reopens through the backend on the
    /// next access
    fn close(&mut self);

    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn fps(&self) -> u32;

    /// Short backend tag for display names, e.g. "V4L2"
    fn backend_name(&self) -> &'static str;
}

/// What a camera id resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraSource {
    /// Numeric device index
    Index(u32),
    /// Device path or URL, passed through untouched
    Path(String),
}

impl CameraSource {
    pub fn parse(id: &str) -> CameraSource {
        match id.parse::<u32>() {
            Ok(index) => CameraSource::Index(index),
            Err(_) => CameraSource::Path(id.to_string()),
        }
    }
}

/// Backend that opens devices and enumerates device nodes
pub trait CameraBackend: Send + Sync {
    /// Open and configure a device
    fn open(&self, source: &CameraSource) -> Result<Box<dyn CameraDevice>>;

    /// Device node indices visible without opening anything (for example
    /// `/dev/video*`); empty when the backend cannot enumerate
    fn device_nodes(&self) -> Vec<u32>;

    fn name(&self) -> &'static str;
}

/// Human-readable camera name
///
/// Index 0 is the default camera; on a Raspberry Pi 4 or 5 it is assumed
/// to be the on-board camera. The backend tag is appended when known.
pub fn display_name(
    id: &str,
    backend: Option<&str>,
    platform: Platform,
    model_hint: Option<&str>,
) -> String {
    if platform == Platform::RaspberryPi && id == "0" {
        if let Some(model) = model_hint {
            let model = model.to_lowercase();
            if model.contains("pi 4") || model.contains("pi 5") {
                return "Raspberry Pi Camera".to_string();
            }
        }
    }

    let mut name = if id == "0" {
        "Default Camera".to_string()
    } else if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        format!("Camera {}", id)
    } else {
        id.to_string()
    };

    if let Some(backend) = backend {
        if !backend.is_empty() {
            name.push_str(&format!(" ({})", backend));
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_parse() {
        assert_eq!(CameraSource::parse("0"), CameraSource::Index(0));
        assert_eq!(CameraSource::parse("12"), CameraSource::Index(12));
        assert_eq!(
            CameraSource::parse("/dev/video0"),
            CameraSource::Path("/dev/video0".to_string())
        );
        assert_eq!(
            CameraSource::parse("rtsp://cam.local/live"),
            CameraSource::Path("rtsp://cam.local/live".to_string())
        );
    }

    #[test]
    fn test_display_name_heuristics() {
        assert_eq!(
            display_name("0", None, Platform::Simulation, None),
            "Default Camera"
        );
        assert_eq!(
            display_name("3", None, Platform::Simulation, None),
            "Camera 3"
        );
        assert_eq!(
            display_name("/dev/video9", None, Platform::Simulation, None),
            "/dev/video9"
        );
        assert_eq!(
            display_name("1", Some("SIM"), Platform::Simulation, None),
            "Camera 1 (SIM)"
        );
        assert_eq!(display_name("0", Some(""), Platform::Simulation, None), "Default Camera");
    }

    #[test]
    fn test_display_name_raspberry_pi_override() {
        let pi5 = Some("Raspberry Pi 5 Model B Rev 1.0");
        assert_eq!(
            display_name("0", Some("V4L2"), Platform::RaspberryPi, pi5),
            "Raspberry Pi Camera"
        );
        // Only index 0 gets the override
        assert_eq!(
            display_name("1", None, Platform::RaspberryPi, pi5),
            "Camera 1"
        );
        // Older boards keep the generic name
        assert_eq!(
            display_name("0", None, Platform::RaspberryPi, Some("Raspberry Pi 3 Model B")),
            "Default Camera"
        );
        // Other platforms never get the override
        assert_eq!(
            display_name("0", None, Platform::GenericLinux, pi5),
            "Default Camera"
        );
    }
}
