//! # CL-200A Error Handling
//!
//! This module defines the error types that can occur in the cl200-rs crate,
//! one enum per protocol layer. Propagation rules: [`PortError::Disconnected`]
//! is always fatal and passes through every layer unchanged;
//! [`PortError::Timeout`] during a measurement read is recoverable and is
//! surfaced as an empty reading rather than an error.

use thiserror::Error;

/// Errors reported by the serial transport layer.
#[derive(Debug, Error)]
pub enum PortError {
    /// The named serial port could not be opened.
    #[error("Serial port unavailable: {0}")]
    Unavailable(String),

    /// The serial parameter combination was rejected.
    #[error("Invalid serial configuration: {0}")]
    BadConfig(String),

    /// No reply line arrived within the configured timeout.
    #[error("Read timed out")]
    Timeout,

    /// The underlying channel reported a transport-level fault.
    #[error("Serial link lost: {0}")]
    Disconnected(String),
}

/// Errors reported while decoding a received frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The reply is shorter than the fixed-offset fields require.
    #[error("Reply truncated: got {len} bytes, need {need}")]
    Truncated { len: usize, need: usize },

    /// Indicates a checksum mismatch (strict validation only).
    #[error("Invalid checksum: expected {expected}, calculated {calculated}")]
    ChecksumMismatch { expected: String, calculated: String },

    /// The frame structure is not STX + payload + ETX + checksum + CRLF.
    #[error("Malformed frame: {0}")]
    Invalid(String),
}

/// Errors reported by the device initialization handshake.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The device did not acknowledge PC connection mode.
    #[error("Device rejected PC connection mode")]
    ConnectionRejected,

    /// The device reported an unrecoverable fault code.
    #[error("Device fault (error code {code}): switch the device off and back on")]
    DeviceFault { code: char },

    /// A transport error surfaced during the handshake.
    #[error(transparent)]
    Port(#[from] PortError),
}

/// Errors reported while taking a measurement.
#[derive(Debug, Error)]
pub enum MeasureError {
    /// The battery-low flag is set; the reading cannot be trusted.
    #[error("Battery is low: change the battery or use the AC adapter")]
    BatteryLow,

    /// The reply could not be decoded into measurement fields.
    #[error("Malformed measurement reply: {0}")]
    Malformed(#[from] FrameError),

    /// A transport error surfaced during the exchange.
    #[error(transparent)]
    Port(#[from] PortError),
}
