//! RathaIO - HTTP control server for a small wheeled robot
//!
//! This library provides the building blocks of the daemon: platform
//! detection, GPIO and PWM capability providers, the differential drive
//! motor driver, the indicator light controller, the camera registry with
//! MJPEG streaming, and the HTTP surface tying them together.
//!
//! ## Features
//!
//! - `v4l2`: Enable real camera capture through Video4Linux2

pub mod camera;
pub mod config;
pub mod context;
pub mod error;
pub mod lights;
pub mod motor;
pub mod platform;
pub mod server;

// Re-export commonly used types
pub use config::AppConfig;
pub use context::HardwareContext;
pub use error::{Error, Result};
pub use platform::Platform;
