//! Configuration for the RathaIO daemon
//!
//! Loads configuration from a TOML file. When no file is present the daemon
//! falls back to built-in defaults for the detected platform, matching the
//! stock rover wiring.

use crate::error::{Error, Result};
use crate::platform::Platform;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub platform: PlatformConfig,
    pub motors: MotorsConfig,
    pub lights: LightsConfig,
    pub camera: CameraConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// HTTP bind address
    ///
    /// Examples:
    /// - `0.0.0.0:8080` - Bind to all interfaces on port 8080
    /// - `127.0.0.1:8080` - Localhost only
    pub bind_address: String,
}

/// Platform selection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlatformConfig {
    /// Platform to run on: `auto`, `raspberry_pi`, `odroid`,
    /// `generic_linux` or `simulation`
    ///
    /// `auto` detects the board from `/proc/device-tree/model` and falls
    /// back to simulation when no GPIO system is present.
    pub platform: String,
}

/// Motor wiring and PWM configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MotorsConfig {
    pub left: MotorPins,
    pub right: MotorPins,
    /// PWM frequency on the enable pins in Hz
    pub pwm_frequency_hz: u32,
}

/// Wiring of one H-bridge channel (BCM pin numbering)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MotorPins {
    /// Enable pin (PWM speed control)
    pub enable: u8,
    /// Direction pin 1
    pub in1: u8,
    /// Direction pin 2
    pub in2: u8,
}

/// Indicator LED strip configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LightsConfig {
    /// Number of pixels on the strip
    pub led_count: usize,
    /// Data pin (BCM numbering)
    pub led_pin: u8,
    /// Brightness 0-255
    pub brightness: u8,
}

/// Camera capture configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CameraConfig {
    /// Requested capture width in pixels
    pub width: u32,
    /// Requested capture height in pixels
    pub height: u32,
    /// Camera ids the simulated backend exposes
    pub sim_devices: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    ///
    /// `RUST_LOG` overrides this when set.
    pub level: String,
}

impl AppConfig {
    /// Load configuration from TOML file
    ///
    /// # Arguments
    /// - `path`: Path to TOML configuration file
    ///
    /// # Returns
    /// Parsed configuration or error
    ///
    /// # Example
    /// ```no_run
    /// use ratha_io::config::AppConfig;
    ///
    /// let config = AppConfig::from_file("rathaio.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration, with built-in defaults when no file exists at
    /// `path`
    ///
    /// A file that exists but fails to read or parse is an error. The
    /// flag reports whether the file supplied the config.
    pub fn load_or_defaults<P: AsRef<Path>>(path: P) -> Result<(Self, bool)> {
        match Self::from_file(path) {
            Ok(config) => Ok((config, true)),
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok((Self::auto_defaults(), false))
            }
            Err(e) => Err(e),
        }
    }

    /// Built-in defaults for a concrete platform
    ///
    /// Carries the stock rover wiring for that board. Production
    /// deployments with non-stock wiring should use a TOML file.
    pub fn defaults_for(platform: Platform) -> Self {
        Self {
            server: ServerConfig {
                bind_address: "0.0.0.0:8080".to_string(),
            },
            platform: PlatformConfig {
                platform: platform.name().to_string(),
            },
            motors: MotorsConfig::preset_for(platform),
            lights: LightsConfig {
                led_count: 4,
                led_pin: 12,
                brightness: 64,
            },
            camera: CameraConfig {
                width: 640,
                height: 480,
                sim_devices: vec!["0".to_string()],
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    /// Defaults with platform auto-detection left enabled
    pub fn auto_defaults() -> Self {
        let mut config = Self::defaults_for(Platform::RaspberryPi);
        config.platform.platform = "auto".to_string();
        config
    }
}

impl MotorsConfig {
    /// Stock wiring preset for a platform
    ///
    /// Raspberry Pi: left EN 17 / IN1 27 / IN2 22, right EN 18 / IN1 23 /
    /// IN2 24. Odroid uses EN 0 on the left channel, the rest is shared.
    pub fn preset_for(platform: Platform) -> Self {
        let left_enable = match platform {
            Platform::Odroid => 0,
            _ => 17,
        };
        Self {
            left: MotorPins {
                enable: left_enable,
                in1: 27,
                in2: 22,
            },
            right: MotorPins {
                enable: 18,
                in1: 23,
                in2: 24,
            },
            pwm_frequency_hz: 1000,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::auto_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::auto_defaults();
        assert_eq!(config.platform.platform, "auto");
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.motors.left.enable, 17);
        assert_eq!(config.motors.right.enable, 18);
        assert_eq!(config.motors.pwm_frequency_hz, 1000);
        assert_eq!(config.lights.led_count, 4);
        assert_eq!(config.lights.led_pin, 12);
        assert_eq!(config.camera.width, 640);
        assert_eq!(config.camera.height, 480);
    }

    #[test]
    fn test_platform_presets() {
        let rpi = MotorsConfig::preset_for(Platform::RaspberryPi);
        assert_eq!(rpi.left.enable, 17);
        assert_eq!(rpi.left.in1, 27);
        assert_eq!(rpi.left.in2, 22);
        assert_eq!(rpi.right.in1, 23);
        assert_eq!(rpi.right.in2, 24);

        let odroid = MotorsConfig::preset_for(Platform::Odroid);
        assert_eq!(odroid.left.enable, 0);
        assert_eq!(odroid.right.enable, 18);

        let sim = MotorsConfig::preset_for(Platform::Simulation);
        assert_eq!(sim.left.enable, 17);
    }

    #[test]
    fn test_toml_serialization() {
        let config = AppConfig::defaults_for(Platform::Simulation);
        let toml_string = toml::to_string_pretty(&config).unwrap();

        // Should contain all sections
        assert!(toml_string.contains("[server]"));
        assert!(toml_string.contains("[platform]"));
        assert!(toml_string.contains("[motors]"));
        assert!(toml_string.contains("[lights]"));
        assert!(toml_string.contains("[camera]"));
        assert!(toml_string.contains("[logging]"));

        // Should contain key values
        assert!(toml_string.contains("platform = \"simulation\""));
        assert!(toml_string.contains("bind_address = \"0.0.0.0:8080\""));
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_content = r#"
[server]
bind_address = "127.0.0.1:9090"

[platform]
platform = "odroid"

[motors]
pwm_frequency_hz = 500

[motors.left]
enable = 5
in1 = 6
in2 = 7

[motors.right]
enable = 8
in1 = 9
in2 = 10

[lights]
led_count = 8
led_pin = 13
brightness = 128

[camera]
width = 1280
height = 720
sim_devices = ["0", "1"]

[logging]
level = "debug"
"#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:9090");
        assert_eq!(config.platform.platform, "odroid");
        assert_eq!(config.motors.left.enable, 5);
        assert_eq!(config.motors.pwm_frequency_hz, 500);
        assert_eq!(config.lights.led_count, 8);
        assert_eq!(config.camera.sim_devices, vec!["0", "1"]);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rathaio.toml");
        let config = AppConfig::defaults_for(Platform::Simulation);
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = AppConfig::from_file(&path).unwrap();
        assert_eq!(loaded.platform.platform, "simulation");
        assert_eq!(loaded.motors.left.enable, 17);

        assert!(AppConfig::from_file(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_load_or_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rathaio.toml");
        let mut config = AppConfig::defaults_for(Platform::Simulation);
        config.server.bind_address = "127.0.0.1:9191".to_string();
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let (loaded, from_file) = AppConfig::load_or_defaults(&path).unwrap();
        assert!(from_file);
        assert_eq!(loaded.server.bind_address, "127.0.0.1:9191");

        let (defaults, from_file) =
            AppConfig::load_or_defaults(dir.path().join("missing.toml")).unwrap();
        assert!(!from_file);
        assert_eq!(defaults.platform.platform, "auto");
    }

    #[test]
    fn test_load_or_defaults_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rathaio.toml");
        std::fs::write(&path, "[server]\nbind_address = not quoted\n").unwrap();

        // A present but broken file must not boot the robot on defaults
        match AppConfig::load_or_defaults(&path) {
            Err(Error::ConfigParse(_)) => {}
            other => panic!("expected a parse error, got {:?}", other),
        }
    }
}
