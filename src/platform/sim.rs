//! Simulated capability provider
//!
//! Records every pin write into shared state so tests and log readers can
//! observe what the hardware would have done. Used on the simulation
//! platform and as the fallback when real hardware cannot be claimed.

use crate::config::LightsConfig;
use crate::error::Result;
use crate::platform::provider::{
    CapabilityProvider, Color, GpioOutput, LedStrip, Level, PwmChannel,
};
use log::debug;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Observable state of the simulated hardware
#[derive(Debug, Default)]
pub struct SimState {
    pins: Mutex<BTreeMap<u8, Level>>,
    duties: Mutex<BTreeMap<u8, u8>>,
    strip: Mutex<Option<Color>>,
}

impl SimState {
    /// Last level written to a pin
    pub fn pin_level(&self, pin: u8) -> Option<Level> {
        self.pins.lock().get(&pin).copied()
    }

    /// Last duty cycle written to a PWM pin
    pub fn duty(&self, pin: u8) -> Option<u8> {
        self.duties.lock().get(&pin).copied()
    }

    /// Last color the strip was filled with
    pub fn strip_color(&self) -> Option<Color> {
        *self.strip.lock()
    }
}

/// Provider that fulfils every claim with recording stubs
pub struct SimulatedProvider {
    state: Arc<SimState>,
}

impl SimulatedProvider {
    pub fn new() -> Self {
        Self {
            state: Arc::new(SimState::default()),
        }
    }

    /// Handle to the recorded state, for tests and diagnostics
    pub fn state(&self) -> Arc<SimState> {
        Arc::clone(&self.state)
    }
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityProvider for SimulatedProvider {
    fn claim_output(&mut self, pin: u8) -> Result<Box<dyn GpioOutput>> {
        Ok(Box::new(SimPin {
            pin,
            state: Arc::clone(&self.state),
        }))
    }

    fn claim_pwm(&mut self, pin: u8, _frequency_hz: u32) -> Result<Box<dyn PwmChannel>> {
        Ok(Box::new(SimPwm {
            pin,
            state: Arc::clone(&self.state),
        }))
    }

    fn claim_led_strip(&mut self, config: &LightsConfig) -> Result<Box<dyn LedStrip>> {
        Ok(Box::new(SimLedStrip {
            pixels: config.led_count,
            state: Arc::clone(&self.state),
        }))
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

struct SimPin {
    pin: u8,
    state: Arc<SimState>,
}

impl GpioOutput for SimPin {
    fn set(&mut self, level: Level) -> Result<()> {
        debug!("sim GPIO {} -> {:?}", self.pin, level);
        self.state.pins.lock().insert(self.pin, level);
        Ok(())
    }
}

struct SimPwm {
    pin: u8,
    state: Arc<SimState>,
}

impl PwmChannel for SimPwm {
    fn set_duty(&mut self, percent: u8) -> Result<()> {
        let percent = percent.min(100);
        debug!("sim PWM {} -> {}%", self.pin, percent);
        self.state.duties.lock().insert(self.pin, percent);
        Ok(())
    }
}

struct SimLedStrip {
    pixels: usize,
    state: Arc<SimState>,
}

impl LedStrip for SimLedStrip {
    fn fill(&mut self, color: Color) -> Result<()> {
        debug!(
            "sim LED strip -> rgb({}, {}, {}) x{}",
            color.r, color.g, color.b, self.pixels
        );
        *self.state.strip.lock() = Some(color);
        Ok(())
    }

    fn pixel_count(&self) -> usize {
        self.pixels
    }
}
