//! Differential drive motor control
//!
//! Two H-bridge channels (left and right), each with one PWM enable pin
//! and two direction pins. Joystick axes are mixed into signed wheel
//! speeds in the -255..=255 range; the sign picks the direction pins and
//! the magnitude the PWM duty cycle.

use crate::config::{MotorPins, MotorsConfig};
use crate::error::Result;
use crate::platform::provider::{CapabilityProvider, GpioOutput, Level, PwmChannel};
use log::{debug, warn};
use std::cmp::Ordering;

/// Largest wheel speed magnitude
pub const SPEED_MAX: i64 = 255;

/// Rotation state of one motor channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorDirection {
    Forward,
    Reverse,
    Stop,
}

/// Signed wheel speeds actually applied, in -255..=255
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelSpeeds {
    pub left: i32,
    pub right: i32,
}

/// Differential mix of the two joystick axes into wheel speeds
///
/// Out-of-range inputs clamp rather than error.
pub fn mix(forward_reverse: i64, left_right: i64) -> WheelSpeeds {
    let left = forward_reverse
        .saturating_add(left_right)
        .clamp(-SPEED_MAX, SPEED_MAX) as i32;
    let right = forward_reverse
        .saturating_sub(left_right)
        .clamp(-SPEED_MAX, SPEED_MAX) as i32;
    WheelSpeeds { left, right }
}

/// Direction for a signed wheel speed
pub fn direction_for(speed: i32) -> MotorDirection {
    match speed.cmp(&0) {
        Ordering::Greater => MotorDirection::Forward,
        Ordering::Less => MotorDirection::Reverse,
        Ordering::Equal => MotorDirection::Stop,
    }
}

/// PWM duty percent for a signed wheel speed, rounded to the nearest
/// percent of full scale
pub fn duty_for(speed: i32) -> u8 {
    let magnitude = u64::from(speed.unsigned_abs().min(255));
    ((magnitude * 100 + 127) / 255) as u8
}

/// One H-bridge channel
pub struct MotorChannel {
    label: &'static str,
    enable: Box<dyn PwmChannel>,
    in1: Box<dyn GpioOutput>,
    in2: Box<dyn GpioOutput>,
}

impl MotorChannel {
    pub fn new(
        label: &'static str,
        enable: Box<dyn PwmChannel>,
        in1: Box<dyn GpioOutput>,
        in2: Box<dyn GpioOutput>,
    ) -> Self {
        Self {
            label,
            enable,
            in1,
            in2,
        }
    }

    /// Claim the channel's pins from a capability provider
    pub fn claim(
        provider: &mut dyn CapabilityProvider,
        label: &'static str,
        pins: &MotorPins,
        frequency_hz: u32,
    ) -> Result<Self> {
        Ok(Self::new(
            label,
            provider.claim_pwm(pins.enable, frequency_hz)?,
            provider.claim_output(pins.in1)?,
            provider.claim_output(pins.in2)?,
        ))
    }

    /// Apply a signed speed to this channel
    ///
    /// The direction pin going low is always written before the one going
    /// high, so both direction pins are never high at the same time, not
    /// even transiently while reversing.
    pub fn apply(&mut self, speed: i32) {
        match direction_for(speed) {
            MotorDirection::Forward => {
                self.set_in2(Level::Low);
                self.set_in1(Level::High);
            }
            MotorDirection::Reverse => {
                self.set_in1(Level::Low);
                self.set_in2(Level::High);
            }
            MotorDirection::Stop => {
                self.set_in1(Level::Low);
                self.set_in2(Level::Low);
            }
        }
        self.set_duty(duty_for(speed));
    }

    fn set_in1(&mut self, level: Level) {
        if let Err(e) = self.in1.set(level) {
            warn!("{} motor in1 write failed: {}", self.label, e);
        }
    }

    fn set_in2(&mut self, level: Level) {
        if let Err(e) = self.in2.set(level) {
            warn!("{} motor in2 write failed: {}", self.label, e);
        }
    }

    fn set_duty(&mut self, duty: u8) {
        if let Err(e) = self.enable.set_duty(duty) {
            warn!("{} motor duty write failed: {}", self.label, e);
        }
    }
}

/// Both drive channels of the rover
pub struct MotorDriver {
    left: MotorChannel,
    right: MotorChannel,
}

impl MotorDriver {
    pub fn new(left: MotorChannel, right: MotorChannel) -> Self {
        Self { left, right }
    }

    /// Claim all motor pins from a capability provider
    pub fn from_provider(
        provider: &mut dyn CapabilityProvider,
        config: &MotorsConfig,
    ) -> Result<Self> {
        let left = MotorChannel::claim(provider, "left", &config.left, config.pwm_frequency_hz)?;
        let right = MotorChannel::claim(provider, "right", &config.right, config.pwm_frequency_hz)?;
        Ok(Self::new(left, right))
    }

    /// Apply a drive command from the two joystick axes
    ///
    /// Out-of-range inputs clamp and hardware write failures are logged
    /// and swallowed, so this never fails. Returns the wheel speeds
    /// actually applied.
    pub fn drive(&mut self, forward_reverse: i64, left_right: i64) -> WheelSpeeds {
        let speeds = mix(forward_reverse, left_right);
        self.left.apply(speeds.left);
        self.right.apply(speeds.right);
        debug!(
            "drive fr={} lr={} -> left={} right={}",
            forward_reverse, left_right, speeds.left, speeds.right
        );
        speeds
    }

    /// Stop both channels: direction pins low, duty 0
    pub fn stop_all(&mut self) {
        self.left.apply(0);
        self.right.apply(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MotorsConfig;
    use crate::platform::sim::SimulatedProvider;
    use crate::Platform;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_mix_stays_in_range() {
        for fr in (-1000..=1000).step_by(37) {
            for lr in (-1000..=1000).step_by(41) {
                let speeds = mix(fr, lr);
                assert!(
                    speeds.left.abs() <= 255,
                    "left out of range for ({}, {})",
                    fr,
                    lr
                );
                assert!(
                    speeds.right.abs() <= 255,
                    "right out of range for ({}, {})",
                    fr,
                    lr
                );
                assert_eq!(i64::from(speeds.left), (fr + lr).clamp(-255, 255));
                assert_eq!(i64::from(speeds.right), (fr - lr).clamp(-255, 255));
            }
        }
    }

    #[test]
    fn test_mix_cases() {
        assert_eq!(mix(0, 0), WheelSpeeds { left: 0, right: 0 });
        assert_eq!(mix(255, 0), WheelSpeeds { left: 255, right: 255 });
        assert_eq!(mix(-255, 0), WheelSpeeds { left: -255, right: -255 });
        // Pivot right: left wheel forward, right wheel reverse
        assert_eq!(mix(0, 255), WheelSpeeds { left: 255, right: -255 });
        assert_eq!(mix(300, 0), mix(255, 0));
        // Extreme values must not overflow
        assert_eq!(mix(i64::MAX, i64::MAX), WheelSpeeds { left: 255, right: 0 });
    }

    #[test]
    fn test_duty_rounding() {
        assert_eq!(duty_for(0), 0);
        assert_eq!(duty_for(255), 100);
        assert_eq!(duty_for(-255), 100);
        assert_eq!(duty_for(128), 50);
        assert_eq!(duty_for(-128), 50);
        assert_eq!(duty_for(1), 0);
        assert_eq!(duty_for(2), 1);
        assert_eq!(duty_for(i32::MIN), 100);
    }

    #[test]
    fn test_direction_matches_sign() {
        for speed in [-255, -1, 0, 1, 255] {
            let expected = match speed.cmp(&0) {
                Ordering::Greater => MotorDirection::Forward,
                Ordering::Less => MotorDirection::Reverse,
                Ordering::Equal => MotorDirection::Stop,
            };
            assert_eq!(direction_for(speed), expected);
        }
    }

    fn sim_driver() -> (MotorDriver, Arc<crate::platform::sim::SimState>) {
        let mut provider = SimulatedProvider::new();
        let state = provider.state();
        let config = MotorsConfig::preset_for(Platform::RaspberryPi);
        let driver = MotorDriver::from_provider(&mut provider, &config).unwrap();
        (driver, state)
    }

    #[test]
    fn test_drive_forward_sets_pins() {
        let (mut driver, state) = sim_driver();
        let speeds = driver.drive(255, 0);
        assert_eq!(speeds, WheelSpeeds { left: 255, right: 255 });

        // Left channel: EN 17, IN1 27, IN2 22
        assert_eq!(state.pin_level(27), Some(Level::High));
        assert_eq!(state.pin_level(22), Some(Level::Low));
        assert_eq!(state.duty(17), Some(100));
        // Right channel: EN 18, IN1 23, IN2 24
        assert_eq!(state.pin_level(23), Some(Level::High));
        assert_eq!(state.pin_level(24), Some(Level::Low));
        assert_eq!(state.duty(18), Some(100));
    }

    #[test]
    fn test_drive_reverse_and_stop() {
        let (mut driver, state) = sim_driver();

        driver.drive(-128, 0);
        assert_eq!(state.pin_level(27), Some(Level::Low));
        assert_eq!(state.pin_level(22), Some(Level::High));
        assert_eq!(state.duty(17), Some(50));

        driver.drive(0, 0);
        for pin in [27, 22, 23, 24] {
            assert_eq!(state.pin_level(pin), Some(Level::Low));
        }
        assert_eq!(state.duty(17), Some(0));
        assert_eq!(state.duty(18), Some(0));
    }

    #[test]
    fn test_pivot_turns_wheels_opposite() {
        let (mut driver, state) = sim_driver();
        let speeds = driver.drive(0, 255);
        assert_eq!(speeds, WheelSpeeds { left: 255, right: -255 });

        // Left forward
        assert_eq!(state.pin_level(27), Some(Level::High));
        assert_eq!(state.pin_level(22), Some(Level::Low));
        // Right reverse
        assert_eq!(state.pin_level(23), Some(Level::Low));
        assert_eq!(state.pin_level(24), Some(Level::High));
    }

    #[test]
    fn test_stop_all_clears_outputs() {
        let (mut driver, state) = sim_driver();
        driver.drive(200, 50);
        driver.stop_all();
        for pin in [27, 22, 23, 24] {
            assert_eq!(state.pin_level(pin), Some(Level::Low));
        }
        assert_eq!(state.duty(17), Some(0));
        assert_eq!(state.duty(18), Some(0));
    }

    // Event-recording pin for write-order assertions
    #[derive(Clone)]
    struct EventPin {
        name: &'static str,
        log: Arc<Mutex<Vec<(&'static str, Level)>>>,
    }

    impl GpioOutput for EventPin {
        fn set(&mut self, level: Level) -> Result<()> {
            self.log.lock().push((self.name, level));
            Ok(())
        }
    }

    struct NullPwm;

    impl PwmChannel for NullPwm {
        fn set_duty(&mut self, _percent: u8) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_direction_pins_never_both_high() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let in1 = EventPin {
            name: "in1",
            log: Arc::clone(&log),
        };
        let in2 = EventPin {
            name: "in2",
            log: Arc::clone(&log),
        };
        let mut channel =
            MotorChannel::new("left", Box::new(NullPwm), Box::new(in1), Box::new(in2));

        // Exercise every transition between directions
        for speed in [255, -255, 255, 0, -255, 0, 255] {
            channel.apply(speed);
        }

        let mut in1_high = false;
        let mut in2_high = false;
        for (name, level) in log.lock().iter() {
            match *name {
                "in1" => in1_high = level.is_high(),
                "in2" => in2_high = level.is_high(),
                _ => unreachable!(),
            }
            assert!(
                !(in1_high && in2_high),
                "both direction pins high after write to {}",
                name
            );
        }
    }
}
