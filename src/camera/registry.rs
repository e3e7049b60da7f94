//! Camera session registry
//!
//! One session per camera id, created on first reference and kept for the
//! process lifetime. The registry lock guards only the create-if-absent
//! step; each session carries its own device lock, so a slow capture on
//! one camera never blocks another. Devices open lazily and reopen
//! transparently after a release.

use crate::camera::{display_name, CameraBackend, CameraDevice, CameraSource, CapturedFrame};
use crate::error::{Error, Result};
use crate::platform::Platform;
use image::codecs::jpeg::JpegEncoder;
use log::debug;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// JPEG quality for encoded frames
const JPEG_QUALITY: u8 = 80;

/// Listing and discovery entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDescriptor {
    pub available: bool,
    pub name: String,
}

/// Status snapshot of one camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraStatus {
    pub is_open: bool,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// Long-lived session for one camera id
pub struct CameraSession {
    device: Mutex<Option<Box<dyn CameraDevice>>>,
}

impl CameraSession {
    fn new() -> Self {
        Self {
            device: Mutex::new(None),
        }
    }
}

pub struct CameraRegistry {
    sessions: Mutex<HashMap<String, Arc<CameraSession>>>,
    backend: Box<dyn CameraBackend>,
    platform: Platform,
    model_hint: Option<String>,
}

impl CameraRegistry {
    pub fn new(
        backend: Box<dyn CameraBackend>,
        platform: Platform,
        model_hint: Option<String>,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            backend,
            platform,
            model_hint,
        }
    }

    /// Get or create the session for an id
    ///
    /// Sessions are never evicted, so the map is bounded by the set of
    /// ids ever requested.
    pub fn session(&self, id: &str) -> Arc<CameraSession> {
        let mut sessions = self.sessions.lock();
        Arc::clone(
            sessions
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(CameraSession::new())),
        )
    }

    /// Open the device when the slot is empty or the device reports
    /// closed. Called with the session's device lock held.
    fn ensure_open<'a>(
        &self,
        id: &str,
        slot: &'a mut Option<Box<dyn CameraDevice>>,
    ) -> Result<&'a mut Box<dyn CameraDevice>> {
        let needs_open = !matches!(slot, Some(device) if device.is_open());
        if needs_open {
            // Logged so a flapping device shows up in the logs
            debug!("opening camera {}", id);
            *slot = Some(self.backend.open(&CameraSource::parse(id))?);
        }
        match slot.as_mut() {
            Some(device) => Ok(device),
            None => Err(Error::HardwareUnavailable(format!(
                "camera {} failed to open",
                id
            ))),
        }
    }

    /// Capture one frame and return it JPEG encoded
    ///
    /// The device lock is held only for the capture; raw frames are
    /// encoded after it is released.
    pub fn read_frame(&self, id: &str) -> Result<Vec<u8>> {
        let session = self.session(id);
        let frame = {
            let mut slot = session.device.lock();
            let device = self.ensure_open(id, &mut slot)?;
            device.read_frame()?
        };
        match frame {
            CapturedFrame::Jpeg(data) => Ok(data),
            CapturedFrame::Rgb {
                width,
                height,
                pixels,
            } => encode_jpeg(width, height, &pixels),
        }
    }

    /// Status of one camera, attempting to open it first
    pub fn status(&self, id: &str) -> CameraStatus {
        let session = self.session(id);
        let mut slot = session.device.lock();
        match self.ensure_open(id, &mut slot) {
            Ok(device) => CameraStatus {
                is_open: true,
                width: device.width(),
                height: device.height(),
                fps: device.fps(),
            },
            Err(_) => CameraStatus {
                is_open: false,
                width: 0,
                height: 0,
                fps: 0,
            },
        }
    }

    /// Close a camera's device, keeping the session for reuse
    ///
    /// Errors when the id has never been referenced.
    pub fn release(&self, id: &str) -> Result<()> {
        let session = self.sessions.lock().get(id).cloned();
        match session {
            Some(session) => {
                let mut slot = session.device.lock();
                if let Some(device) = slot.as_mut() {
                    device.close();
                }
                debug!("camera {} released", id);
                Ok(())
            }
            None => Err(Error::DeviceNotFound(id.to_string())),
        }
    }

    /// Close every device (shutdown path)
    pub fn release_all(&self) {
        let sessions: Vec<Arc<CameraSession>> = self.sessions.lock().values().cloned().collect();
        for session in sessions {
            let mut slot = session.device.lock();
            if let Some(device) = slot.as_mut() {
                device.close();
            }
        }
    }

    /// Open-state of every known session, attempting to open each one
    pub fn status_map(&self) -> BTreeMap<String, bool> {
        let ids: Vec<String> = self.sessions.lock().keys().cloned().collect();
        let mut map = BTreeMap::new();
        for id in ids {
            let is_open = self.status(&id).is_open;
            map.insert(id, is_open);
        }
        map
    }

    /// Known sessions with their display names, no probing
    pub fn list_known(&self) -> BTreeMap<String, CameraDescriptor> {
        let sessions: Vec<(String, Arc<CameraSession>)> = self
            .sessions
            .lock()
            .iter()
            .map(|(id, session)| (id.clone(), Arc::clone(session)))
            .collect();

        let mut map = BTreeMap::new();
        for (id, session) in sessions {
            let slot = session.device.lock();
            let (available, backend) = match slot.as_ref() {
                Some(device) if device.is_open() => (true, Some(device.backend_name())),
                _ => (false, None),
            };
            let name = display_name(&id, backend, self.platform, self.model_hint.as_deref());
            map.insert(id, CameraDescriptor { available, name });
        }
        map
    }

    /// Merge of known sessions and a best-effort system scan
    ///
    /// Known sessions win on id collisions. Non-authoritative: a device
    /// can appear or vanish between the scan and the next open.
    pub fn discover(&self) -> BTreeMap<String, CameraDescriptor> {
        let mut cameras = self.list_known();
        for (id, descriptor) in self.scan() {
            cameras.entry(id).or_insert(descriptor);
        }
        cameras
    }

    /// Probe for attached cameras
    ///
    /// With enumerable device nodes the scan probes exactly those.
    /// Otherwise it probes indices 0-9, always reporting the first three,
    /// and stops at the first unavailable index past them. Probe-opened
    /// devices are closed immediately.
    fn scan(&self) -> BTreeMap<String, CameraDescriptor> {
        let mut found = BTreeMap::new();

        let nodes = self.backend.device_nodes();
        if !nodes.is_empty() {
            for index in nodes {
                let id = index.to_string();
                let descriptor = self.probe(&id, index);
                found.insert(id, descriptor);
            }
            return found;
        }

        for index in 0..10u32 {
            let id = index.to_string();
            let descriptor = self.probe(&id, index);
            let available = descriptor.available;
            if available || index < 3 {
                found.insert(id, descriptor);
            }
            if !available && index >= 3 {
                break;
            }
        }
        found
    }

    fn probe(&self, id: &str, index: u32) -> CameraDescriptor {
        match self.backend.open(&CameraSource::Index(index)) {
            Ok(mut device) => {
                let name = display_name(
                    id,
                    Some(device.backend_name()),
                    self.platform,
                    self.model_hint.as_deref(),
                );
                device.close();
                CameraDescriptor {
                    available: true,
                    name,
                }
            }
            Err(_) => CameraDescriptor {
                available: false,
                name: format!("Camera {}", id),
            },
        }
    }
}

fn encode_jpeg(width: u32, height: u32, pixels: &[u8]) -> Result<Vec<u8>> {
    let mut jpeg = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY);
    encoder
        .encode(pixels, width, height, image::ExtendedColorType::Rgb8)
        .map_err(|e| Error::CaptureFailed(format!("JPEG encode failed: {}", e)))?;
    Ok(jpeg)
}
