//! Shared hardware context
//!
//! Owns every hardware subsystem for the process lifetime: the motor
//! driver, the light controller and the camera registry, plus the running
//! flag the HTTP layer and stream producers poll. Claim failures on real
//! hardware fall back to the simulated equivalents so the server always
//! comes up; the fallback is logged, not fatal.

use crate::camera::registry::CameraRegistry;
use crate::camera::sim::SimulatedCameraBackend;
use crate::camera::CameraBackend;
use crate::config::{AppConfig, CameraConfig};
use crate::error::Result;
use crate::lights::LightController;
use crate::motor::{MotorDriver, WheelSpeeds};
use crate::platform::provider::{CapabilityProvider, LedStrip};
use crate::platform::sim::SimulatedProvider;
use crate::platform::{self, Platform};
use log::{info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct HardwareContext {
    platform: Platform,
    motors: Mutex<MotorDriver>,
    lights: LightController,
    cameras: CameraRegistry,
    running: Arc<AtomicBool>,
}

impl HardwareContext {
    /// Claim all hardware for the resolved platform
    ///
    /// The model hint comes from platform detection and only affects
    /// camera display names.
    pub fn initialize(
        platform: Platform,
        model_hint: Option<String>,
        config: &AppConfig,
    ) -> Result<Self> {
        let mut provider = platform::provider_for(platform);
        info!("hardware provider: {}", provider.name());

        let motors = match MotorDriver::from_provider(provider.as_mut(), &config.motors) {
            Ok(motors) => motors,
            Err(e) => {
                warn!("motor hardware unavailable ({}), motors run simulated", e);
                let mut sim = SimulatedProvider::new();
                MotorDriver::from_provider(&mut sim, &config.motors)?
            }
        };

        let strip: Box<dyn LedStrip> = match provider.claim_led_strip(&config.lights) {
            Ok(strip) => strip,
            Err(e) => {
                warn!("LED strip unavailable ({}), lights run simulated", e);
                SimulatedProvider::new().claim_led_strip(&config.lights)?
            }
        };

        let backend: Box<dyn CameraBackend> = match platform {
            Platform::Simulation => Box::new(SimulatedCameraBackend::from_config(&config.camera)),
            _ => capture_backend(&config.camera),
        };
        info!("camera backend: {}", backend.name());

        Ok(Self {
            platform,
            motors: Mutex::new(motors),
            lights: LightController::new(strip),
            cameras: CameraRegistry::new(backend, platform, model_hint),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Apply a drive command and return the wheel speeds applied
    pub fn drive(&self, forward_reverse: i64, left_right: i64) -> WheelSpeeds {
        self.motors.lock().drive(forward_reverse, left_right)
    }

    pub fn lights(&self) -> &LightController {
        &self.lights
    }

    pub fn cameras(&self) -> &CameraRegistry {
        &self.cameras
    }

    /// Flag polled by stream producers; cleared on shutdown
    pub fn running(&self) -> &Arc<AtomicBool> {
        &self.running
    }

    /// Stop everything in a safe order
    ///
    /// Clears the running flag first so stream producers exit, then stops
    /// the motors, switches the lights off and releases every camera.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Relaxed);
        self.motors.lock().stop_all();
        self.lights.set(false);
        self.cameras.release_all();
        info!("hardware shut down");
    }
}

#[cfg(feature = "v4l2")]
fn capture_backend(config: &CameraConfig) -> Box<dyn CameraBackend> {
    Box::new(crate::camera::v4l2::V4l2Backend::from_config(config))
}

#[cfg(not(feature = "v4l2"))]
fn capture_backend(config: &CameraConfig) -> Box<dyn CameraBackend> {
    warn!("V4L2 capture not compiled in, cameras run simulated");
    Box::new(SimulatedCameraBackend::from_config(config))
}
