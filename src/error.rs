//! # Error Types
//!
//! Custom error types for UBX Nav using `thiserror`.
//!
//! The protocol engine itself never surfaces these to its caller: framing
//! errors are counted and short payloads are dropped. They exist for the
//! payload decoders, the command builders and the application shell.

use thiserror::Error;

/// Main error type for UBX Nav
#[derive(Debug, Error)]
pub enum UbxNavError {
    /// A received payload is shorter than the message layout requires
    #[error("{message} payload too short: {len} bytes, need at least {min}")]
    PayloadTooShort {
        message: &'static str,
        len: usize,
        min: usize,
    },

    /// More GNSS configuration blocks than the receiver accepts
    #[error("GNSS config block list is full ({0} entries)")]
    GnssBlockOverflow(usize),

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(String),

    /// No usable serial device
    #[error("No GPS serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Telemetry serialization errors
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for UBX Nav
pub type Result<T> = std::result::Result<T, UbxNavError>;
