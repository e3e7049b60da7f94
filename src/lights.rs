//! Indicator light strip control
//!
//! One boolean switch over the whole strip: warm white when on, black
//! when off. The reported state is the cached boolean, so it can diverge
//! from the physical LEDs when a hardware write fails; the command still
//! takes effect.

use crate::platform::provider::{Color, LedStrip};
use log::warn;
use parking_lot::Mutex;

/// Color used when the lights are on
pub const WARM_WHITE: Color = Color::new(255, 200, 120);

pub struct LightController {
    inner: Mutex<LightState>,
}

struct LightState {
    on: bool,
    strip: Box<dyn LedStrip>,
}

impl LightController {
    /// Wrap a claimed strip, starting in the off state
    pub fn new(mut strip: Box<dyn LedStrip>) -> Self {
        if let Err(e) = strip.fill(Color::OFF) {
            warn!("light strip init write failed: {}", e);
        }
        Self {
            inner: Mutex::new(LightState { on: false, strip }),
        }
    }

    /// Switch the strip on or off, returning the new state
    pub fn set(&self, on: bool) -> bool {
        let mut state = self.inner.lock();
        let color = if on { WARM_WHITE } else { Color::OFF };
        if let Err(e) = state.strip.fill(color) {
            warn!("light strip write failed: {}", e);
        }
        state.on = on;
        state.on
    }

    /// Current on/off state (strips are write-only, so this is the cached
    /// value of the last command)
    pub fn get(&self) -> bool {
        self.inner.lock().on
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LightsConfig;
    use crate::error::{Error, Result};
    use crate::platform::provider::CapabilityProvider;
    use crate::platform::sim::SimulatedProvider;

    fn sim_lights() -> (LightController, std::sync::Arc<crate::platform::sim::SimState>) {
        let mut provider = SimulatedProvider::new();
        let state = provider.state();
        let config = LightsConfig {
            led_count: 4,
            led_pin: 12,
            brightness: 64,
        };
        let strip = provider.claim_led_strip(&config).unwrap();
        (LightController::new(strip), state)
    }

    #[test]
    fn test_set_and_get_round_trip() {
        let (lights, state) = sim_lights();
        assert!(!lights.get());
        assert_eq!(state.strip_color(), Some(Color::OFF));

        assert!(lights.set(true));
        assert!(lights.get());
        assert_eq!(state.strip_color(), Some(WARM_WHITE));

        assert!(!lights.set(false));
        assert!(!lights.get());
        assert_eq!(state.strip_color(), Some(Color::OFF));
    }

    #[test]
    fn test_set_is_idempotent() {
        let (lights, state) = sim_lights();
        assert!(lights.set(true));
        assert!(lights.set(true));
        assert!(lights.get());
        assert_eq!(state.strip_color(), Some(WARM_WHITE));
    }

    struct FailingStrip;

    impl LedStrip for FailingStrip {
        fn fill(&mut self, _color: Color) -> Result<()> {
            Err(Error::HardwareUnavailable("strip disconnected".to_string()))
        }

        fn pixel_count(&self) -> usize {
            4
        }
    }

    #[test]
    fn test_state_updates_despite_hardware_fault() {
        let lights = LightController::new(Box::new(FailingStrip));
        assert!(lights.set(true));
        assert!(lights.get());
        assert!(!lights.set(false));
        assert!(!lights.get());
    }
}
