//! Native GPIO provider for Raspberry Pi boards
//!
//! Uses sysfs GPIO for direction pins and the SoC's hardware PWM through
//! `/sys/class/pwm/pwmchip0` for enable pins with a routed channel. Pins
//! without one, and channels that fail to export, fall back to software
//! PWM on a plain GPIO output.

use crate::config::LightsConfig;
use crate::error::{Error, Result};
use crate::platform::provider::{CapabilityProvider, GpioOutput, LedStrip, PwmChannel};
use crate::platform::soft_pwm::SoftPwmChannel;
use crate::platform::sysfs::{self, SysfsGpioPin, SysfsPwmChannel};
use log::warn;

pub struct NativeGpioProvider {
    claimed_channels: [bool; 2],
}

impl NativeGpioProvider {
    pub fn new() -> Self {
        Self {
            claimed_channels: [false; 2],
        }
    }

    fn soft_pwm(&self, pin: u8, frequency_hz: u32) -> Result<Box<dyn PwmChannel>> {
        let output = Box::new(SysfsGpioPin::export(pin)?);
        Ok(Box::new(SoftPwmChannel::start(pin, output, frequency_hz)?))
    }
}

impl Default for NativeGpioProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityProvider for NativeGpioProvider {
    fn claim_output(&mut self, pin: u8) -> Result<Box<dyn GpioOutput>> {
        Ok(Box::new(SysfsGpioPin::export(pin)?))
    }

    fn claim_pwm(&mut self, pin: u8, frequency_hz: u32) -> Result<Box<dyn PwmChannel>> {
        match sysfs::hardware_pwm_channel(pin) {
            Some(channel) if !self.claimed_channels[usize::from(channel)] => {
                match SysfsPwmChannel::export(channel, frequency_hz) {
                    Ok(pwm) => {
                        self.claimed_channels[usize::from(channel)] = true;
                        Ok(Box::new(pwm))
                    }
                    Err(e) => {
                        warn!(
                            "hardware PWM channel {} unavailable ({}), driving GPIO {} in software",
                            channel, e, pin
                        );
                        self.soft_pwm(pin, frequency_hz)
                    }
                }
            }
            Some(channel) => {
                warn!(
                    "hardware PWM channel {} already claimed, driving GPIO {} in software",
                    channel, pin
                );
                self.soft_pwm(pin, frequency_hz)
            }
            None => {
                warn!(
                    "GPIO {} has no hardware PWM channel, driving it in software",
                    pin
                );
                self.soft_pwm(pin, frequency_hz)
            }
        }
    }

    fn claim_led_strip(&mut self, _config: &LightsConfig) -> Result<Box<dyn LedStrip>> {
        Err(Error::HardwareUnavailable(
            "NeoPixel driver not available".to_string(),
        ))
    }

    fn name(&self) -> &'static str {
        "native-gpio"
    }
}
