//! Error types for cs800-io

use std::net::IpAddr;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// cs800-io error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Status payload is not a whole number of 4-byte groups
    #[error("status payload length {len} is not a multiple of 4")]
    FrameLength {
        /// Observed payload length in bytes
        len: usize,
    },

    /// Broadcast received from a device other than the configured one
    #[error("broadcast from unexpected source: expected {expected}, got {actual}")]
    AddressMismatch {
        /// The device address this session was configured for
        expected: IpAddr,
        /// The address the packet actually came from
        actual: IpAddr,
    },

    /// Property absent from the current snapshot (no refresh yet, or the
    /// id is not in the catalog)
    #[error("property not in snapshot: {0}")]
    MissingProperty(String),

    /// User input that should have been a number
    #[error("not a number: {0:?}")]
    NotNumeric(String),

    /// Requested temperature outside the device's reported limits
    #[error("temperature {value} K outside device range [{min} K, {max} K]")]
    OutOfRange {
        /// Requested temperature in kelvin
        value: f64,
        /// Device minimum in kelvin
        min: f64,
        /// Device maximum in kelvin
        max: f64,
    },

    /// Invalid parameter
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Command name not in the command catalog
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Configuration parse error
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration serialize error
    #[error("config serialize error: {0}")]
    ConfigSer(#[from] toml::ser::Error),
}
