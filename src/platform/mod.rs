//! Platform detection and GPIO capability providers
//!
//! Every pin operation goes through a [`CapabilityProvider`] selected once
//! at startup. Raspberry Pi boards get sysfs GPIO with hardware PWM, other
//! boards get sysfs GPIO with software PWM, and everything else runs
//! against the simulated provider.

pub mod native;
pub mod provider;
pub mod sim;
pub mod soft_pwm;
pub mod sysfs;

use crate::error::{Error, Result};
use provider::CapabilityProvider;
use std::fs;
use std::path::Path;

/// Supported platforms
///
/// Chosen once at startup and immutable for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    RaspberryPi,
    Odroid,
    GenericLinux,
    Simulation,
}

impl Platform {
    /// Wire name used in config files and JSON responses
    pub fn name(&self) -> &'static str {
        match self {
            Platform::RaspberryPi => "raspberry_pi",
            Platform::Odroid => "odroid",
            Platform::GenericLinux => "generic_linux",
            Platform::Simulation => "simulation",
        }
    }

    /// Parse a platform wire name
    pub fn from_name(name: &str) -> Option<Platform> {
        match name {
            "raspberry_pi" => Some(Platform::RaspberryPi),
            "odroid" => Some(Platform::Odroid),
            "generic_linux" => Some(Platform::GenericLinux),
            "simulation" => Some(Platform::Simulation),
            _ => None,
        }
    }

    /// Detect the platform this process is running on
    ///
    /// Reads the board model from `/proc/device-tree/model` and falls back
    /// to a sysfs GPIO probe. Returns the platform and the model string
    /// when one is readable.
    pub fn detect() -> (Platform, Option<String>) {
        if let Ok(model) = fs::read_to_string("/proc/device-tree/model") {
            // Device-tree strings are NUL terminated
            let model = model.trim_end_matches('\0').trim().to_string();
            let lower = model.to_lowercase();
            if lower.contains("raspberry pi") {
                return (Platform::RaspberryPi, Some(model));
            }
            if lower.contains("odroid") {
                return (Platform::Odroid, Some(model));
            }
        }
        if Path::new("/sys/class/gpio").exists() {
            (Platform::GenericLinux, None)
        } else {
            (Platform::Simulation, None)
        }
    }

    /// Resolve the configured platform string
    ///
    /// `auto` runs detection; any other value forces the platform. The
    /// model hint is read either way so camera naming still works on a
    /// forced platform.
    pub fn resolve(configured: &str) -> Result<(Platform, Option<String>)> {
        let (detected, model) = Self::detect();
        if configured == "auto" {
            return Ok((detected, model));
        }
        match Self::from_name(configured) {
            Some(platform) => Ok((platform, model)),
            None => Err(Error::Config(format!(
                "unknown platform '{}' (expected auto, raspberry_pi, odroid, generic_linux or simulation)",
                configured
            ))),
        }
    }
}

/// Create the capability provider for a platform
pub fn provider_for(platform: Platform) -> Box<dyn CapabilityProvider> {
    match platform {
        Platform::RaspberryPi => Box::new(native::NativeGpioProvider::new()),
        Platform::Odroid | Platform::GenericLinux => {
            Box::new(soft_pwm::SoftPwmGpioProvider::new())
        }
        Platform::Simulation => Box::new(sim::SimulatedProvider::new()),
    }
}
