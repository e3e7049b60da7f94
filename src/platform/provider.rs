//! Capability provider traits
//!
//! The hardware seam of the daemon. Motor and light code claims pins
//! through these traits and never touches sysfs or worker threads
//! directly, so the same control paths run unchanged on real boards and
//! in simulation.

use crate::config::LightsConfig;
use crate::error::Result;

/// Logic level of a digital output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_high(&self) -> bool {
        matches!(self, Level::High)
    }
}

/// RGB color for light strips
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const OFF: Color = Color::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A claimed digital output pin
pub trait GpioOutput: Send {
    /// Drive the pin to the given level
    fn set(&mut self, level: Level) -> Result<()>;
}

/// A claimed PWM channel
pub trait PwmChannel: Send {
    /// Set the duty cycle in percent (0-100)
    ///
    /// Callers clamp before calling; values above 100 are treated as 100.
    fn set_duty(&mut self, percent: u8) -> Result<()>;
}

/// A claimed addressable LED strip
pub trait LedStrip: Send {
    /// Set every pixel to `color` and push the update to the strip
    fn fill(&mut self, color: Color) -> Result<()>;

    /// Number of pixels on the strip
    fn pixel_count(&self) -> usize;
}

/// Factory for claimed hardware resources on one platform
///
/// Claimed resources own their lifecycle: dropping a pin releases it,
/// dropping a PWM channel stops it. The provider itself can be discarded
/// once wiring is complete.
pub trait CapabilityProvider: Send {
    /// Claim a digital output pin (BCM numbering)
    fn claim_output(&mut self, pin: u8) -> Result<Box<dyn GpioOutput>>;

    /// Claim a PWM channel on a pin (BCM numbering)
    fn claim_pwm(&mut self, pin: u8, frequency_hz: u32) -> Result<Box<dyn PwmChannel>>;

    /// Claim the indicator LED strip
    fn claim_led_strip(&mut self, config: &LightsConfig) -> Result<Box<dyn LedStrip>>;

    /// Short provider name for logs
    fn name(&self) -> &'static str;
}
