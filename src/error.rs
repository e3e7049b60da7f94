//! Error types for RathaIO

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// RathaIO error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file parse error
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Hardware resource could not be claimed or opened
    #[error("Hardware unavailable: {0}")]
    HardwareUnavailable(String),

    /// Frame capture failed
    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    /// Referenced device does not exist
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
