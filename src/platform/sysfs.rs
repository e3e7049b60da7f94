//! Sysfs GPIO and PWM access
//!
//! Drives pins through the kernel's sysfs interfaces (`/sys/class/gpio`
//! and `/sys/class/pwm`). Slower than memory-mapped GPIO but needs no
//! vendor library and behaves the same across boards.

use crate::error::{Error, Result};
use crate::platform::provider::{GpioOutput, Level, PwmChannel};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

const GPIO_ROOT: &str = "/sys/class/gpio";
const PWM_CHIP: &str = "/sys/class/pwm/pwmchip0";

/// Hardware PWM channel for a BCM pin, if the SoC routes one there
///
/// On the Raspberry Pi, PWM0 is on BCM 12/18 and PWM1 on BCM 13/19.
pub fn hardware_pwm_channel(pin: u8) -> Option<u8> {
    match pin {
        12 | 18 => Some(0),
        13 | 19 => Some(1),
        _ => None,
    }
}

/// A GPIO pin exported through sysfs, configured as output
pub struct SysfsGpioPin {
    pin: u8,
    gpio_dir: PathBuf,
    root: PathBuf,
}

impl SysfsGpioPin {
    /// Export a pin and configure it as output
    pub fn export(pin: u8) -> Result<Self> {
        Self::export_in(Path::new(GPIO_ROOT), pin)
    }

    fn export_in(root: &Path, pin: u8) -> Result<Self> {
        let gpio_dir = root.join(format!("gpio{}", pin));
        if !gpio_dir.exists() {
            fs::write(root.join("export"), pin.to_string())?;
            // Give udev a moment to set permissions on the new node
            thread::sleep(Duration::from_millis(50));
            if !gpio_dir.exists() {
                return Err(Error::HardwareUnavailable(format!(
                    "exporting GPIO {} did not create {}",
                    pin,
                    gpio_dir.display()
                )));
            }
        }
        fs::write(gpio_dir.join("direction"), "out")?;
        debug!("claimed sysfs GPIO {}", pin);
        Ok(Self {
            pin,
            gpio_dir,
            root: root.to_path_buf(),
        })
    }
}

impl GpioOutput for SysfsGpioPin {
    fn set(&mut self, level: Level) -> Result<()> {
        let value = if level.is_high() { "1" } else { "0" };
        fs::write(self.gpio_dir.join("value"), value)?;
        Ok(())
    }
}

impl Drop for SysfsGpioPin {
    fn drop(&mut self) {
        let _ = fs::write(self.gpio_dir.join("value"), "0");
        if let Err(e) = fs::write(self.root.join("unexport"), self.pin.to_string()) {
            warn!("failed to unexport GPIO {}: {}", self.pin, e);
        }
    }
}

/// A hardware PWM channel exported through sysfs
///
/// Enabled at 0% duty on claim, disabled and unexported on drop.
pub struct SysfsPwmChannel {
    channel: u8,
    period_ns: u64,
    channel_dir: PathBuf,
    chip_dir: PathBuf,
}

impl SysfsPwmChannel {
    /// Export a channel on pwmchip0 and start it at 0% duty
    pub fn export(channel: u8, frequency_hz: u32) -> Result<Self> {
        Self::export_in(Path::new(PWM_CHIP), channel, frequency_hz)
    }

    fn export_in(chip_dir: &Path, channel: u8, frequency_hz: u32) -> Result<Self> {
        let channel_dir = chip_dir.join(format!("pwm{}", channel));
        if !channel_dir.exists() {
            fs::write(chip_dir.join("export"), channel.to_string())?;
            thread::sleep(Duration::from_millis(50));
            if !channel_dir.exists() {
                return Err(Error::HardwareUnavailable(format!(
                    "exporting PWM channel {} did not create {}",
                    channel,
                    channel_dir.display()
                )));
            }
        }
        let period_ns = 1_000_000_000u64 / u64::from(frequency_hz.max(1));
        fs::write(channel_dir.join("period"), period_ns.to_string())?;
        fs::write(channel_dir.join("duty_cycle"), "0")?;
        fs::write(channel_dir.join("enable"), "1")?;
        debug!("claimed sysfs PWM channel {} at {} Hz", channel, frequency_hz);
        Ok(Self {
            channel,
            period_ns,
            channel_dir,
            chip_dir: chip_dir.to_path_buf(),
        })
    }
}

impl PwmChannel for SysfsPwmChannel {
    fn set_duty(&mut self, percent: u8) -> Result<()> {
        let duty_ns = self.period_ns * u64::from(percent.min(100)) / 100;
        fs::write(self.channel_dir.join("duty_cycle"), duty_ns.to_string())?;
        Ok(())
    }
}

impl Drop for SysfsPwmChannel {
    fn drop(&mut self) {
        let _ = fs::write(self.channel_dir.join("duty_cycle"), "0");
        let _ = fs::write(self.channel_dir.join("enable"), "0");
        if let Err(e) = fs::write(self.chip_dir.join("unexport"), self.channel.to_string()) {
            warn!("failed to unexport PWM channel {}: {}", self.channel, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_gpio_root(pin: u8) -> (tempfile::TempDir, PathBuf) {
        let root = tempfile::tempdir().unwrap();
        let gpio_dir = root.path().join(format!("gpio{}", pin));
        fs::create_dir(&gpio_dir).unwrap();
        fs::write(gpio_dir.join("direction"), "in").unwrap();
        fs::write(gpio_dir.join("value"), "0").unwrap();
        (root, gpio_dir)
    }

    #[test]
    fn test_gpio_pin_writes_value() {
        let (root, gpio_dir) = fake_gpio_root(17);
        let mut pin = SysfsGpioPin::export_in(root.path(), 17).unwrap();

        assert_eq!(fs::read_to_string(gpio_dir.join("direction")).unwrap(), "out");

        pin.set(Level::High).unwrap();
        assert_eq!(fs::read_to_string(gpio_dir.join("value")).unwrap(), "1");

        pin.set(Level::Low).unwrap();
        assert_eq!(fs::read_to_string(gpio_dir.join("value")).unwrap(), "0");
    }

    #[test]
    fn test_gpio_pin_drop_drives_low() {
        let (root, gpio_dir) = fake_gpio_root(22);
        let mut pin = SysfsGpioPin::export_in(root.path(), 22).unwrap();
        pin.set(Level::High).unwrap();
        drop(pin);

        assert_eq!(fs::read_to_string(gpio_dir.join("value")).unwrap(), "0");
        assert_eq!(fs::read_to_string(root.path().join("unexport")).unwrap(), "22");
    }

    #[test]
    fn test_pwm_channel_duty_scaling() {
        let chip = tempfile::tempdir().unwrap();
        let channel_dir = chip.path().join("pwm0");
        fs::create_dir(&channel_dir).unwrap();
        for file in ["period", "duty_cycle", "enable"] {
            fs::write(channel_dir.join(file), "0").unwrap();
        }

        let mut pwm = SysfsPwmChannel::export_in(chip.path(), 0, 1000).unwrap();
        // 1000 Hz -> 1ms period
        assert_eq!(fs::read_to_string(channel_dir.join("period")).unwrap(), "1000000");
        assert_eq!(fs::read_to_string(channel_dir.join("enable")).unwrap(), "1");

        pwm.set_duty(50).unwrap();
        assert_eq!(fs::read_to_string(channel_dir.join("duty_cycle")).unwrap(), "500000");

        pwm.set_duty(100).unwrap();
        assert_eq!(fs::read_to_string(channel_dir.join("duty_cycle")).unwrap(), "1000000");

        // Values above 100 are capped
        pwm.set_duty(150).unwrap();
        assert_eq!(fs::read_to_string(channel_dir.join("duty_cycle")).unwrap(), "1000000");

        drop(pwm);
        assert_eq!(fs::read_to_string(channel_dir.join("duty_cycle")).unwrap(), "0");
        assert_eq!(fs::read_to_string(channel_dir.join("enable")).unwrap(), "0");
    }

    #[test]
    fn test_hardware_pwm_channel_map() {
        assert_eq!(hardware_pwm_channel(12), Some(0));
        assert_eq!(hardware_pwm_channel(18), Some(0));
        assert_eq!(hardware_pwm_channel(13), Some(1));
        assert_eq!(hardware_pwm_channel(19), Some(1));
        assert_eq!(hardware_pwm_channel(17), None);
        assert_eq!(hardware_pwm_channel(0), None);
    }
}
