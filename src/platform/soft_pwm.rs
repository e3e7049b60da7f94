//! Software PWM over plain GPIO outputs
//!
//! For boards where the enable pin has no usable hardware PWM channel. A
//! named worker thread toggles the pin at the requested duty cycle; duty
//! updates go through an atomic so callers never block on the worker.

use crate::config::LightsConfig;
use crate::error::{Error, Result};
use crate::platform::provider::{CapabilityProvider, GpioOutput, LedStrip, Level, PwmChannel};
use crate::platform::sysfs::SysfsGpioPin;
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Software PWM frequency cap in Hz
///
/// Matches wiringPi's softPwm rate. Sleep granularity makes higher rates
/// unreliable on a non-realtime kernel.
const SOFT_PWM_HZ: u32 = 100;

/// A PWM channel emulated by a worker thread
pub struct SoftPwmChannel {
    duty: Arc<AtomicU8>,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl SoftPwmChannel {
    /// Spawn a software PWM worker driving `output`
    ///
    /// Frequencies above the software cap are reduced to it.
    pub fn start(pin: u8, output: Box<dyn GpioOutput>, frequency_hz: u32) -> Result<Self> {
        let effective_hz = frequency_hz.clamp(1, SOFT_PWM_HZ);
        if effective_hz != frequency_hz {
            debug!(
                "software PWM on pin {} capped at {} Hz (requested {})",
                pin, effective_hz, frequency_hz
            );
        }
        let period_ns = 1_000_000_000u64 / u64::from(effective_hz);

        let duty = Arc::new(AtomicU8::new(0));
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker_duty = Arc::clone(&duty);
        let worker_shutdown = Arc::clone(&shutdown);

        let worker = thread::Builder::new()
            .name(format!("soft-pwm-{}", pin))
            .spawn(move || Self::worker_loop(output, worker_duty, worker_shutdown, period_ns))?;

        Ok(Self {
            duty,
            shutdown,
            worker: Some(worker),
        })
    }

    fn worker_loop(
        mut output: Box<dyn GpioOutput>,
        duty: Arc<AtomicU8>,
        shutdown: Arc<AtomicBool>,
        period_ns: u64,
    ) {
        let mut failures: u64 = 0;
        while !shutdown.load(Ordering::Relaxed) {
            let percent = u64::from(duty.load(Ordering::Relaxed).min(100));
            let high_ns = period_ns * percent / 100;
            let low_ns = period_ns - high_ns;

            if high_ns > 0 {
                if let Err(e) = output.set(Level::High) {
                    Self::note_failure(&mut failures, &e);
                }
                thread::sleep(Duration::from_nanos(high_ns));
            }
            if low_ns > 0 {
                if let Err(e) = output.set(Level::Low) {
                    Self::note_failure(&mut failures, &e);
                }
                thread::sleep(Duration::from_nanos(low_ns));
            }
        }
        let _ = output.set(Level::Low);
    }

    fn note_failure(failures: &mut u64, e: &Error) {
        *failures += 1;
        // Log the first failure, then every thousandth
        if *failures == 1 || *failures % 1000 == 0 {
            warn!("software PWM pin write failed ({} total): {}", failures, e);
        }
    }
}

impl PwmChannel for SoftPwmChannel {
    fn set_duty(&mut self, percent: u8) -> Result<()> {
        self.duty.store(percent.min(100), Ordering::Relaxed);
        Ok(())
    }
}

impl Drop for SoftPwmChannel {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Provider for boards with sysfs GPIO but no routed hardware PWM
/// (Odroid and generic Linux SBCs)
pub struct SoftPwmGpioProvider;

impl SoftPwmGpioProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SoftPwmGpioProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityProvider for SoftPwmGpioProvider {
    fn claim_output(&mut self, pin: u8) -> Result<Box<dyn GpioOutput>> {
        Ok(Box::new(SysfsGpioPin::export(pin)?))
    }

    fn claim_pwm(&mut self, pin: u8, frequency_hz: u32) -> Result<Box<dyn PwmChannel>> {
        let output = Box::new(SysfsGpioPin::export(pin)?);
        Ok(Box::new(SoftPwmChannel::start(pin, output, frequency_hz)?))
    }

    fn claim_led_strip(&mut self, _config: &LightsConfig) -> Result<Box<dyn LedStrip>> {
        Err(Error::HardwareUnavailable(
            "no LED strip driver on this platform".to_string(),
        ))
    }

    fn name(&self) -> &'static str {
        "soft-pwm-gpio"
    }
}
