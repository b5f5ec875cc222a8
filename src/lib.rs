//! # cl200-rs - A Rust Crate for Konica Minolta CL-200A Photometers
//!
//! The cl200-rs crate drives CL-200A-class chroma meters (luxmeters) over a
//! half-duplex serial link, implementing the device's command protocol:
//! STX/ETX-framed commands with a decimal XOR checksum, the three-step
//! initialization handshake (PC connection mode → hold status → EXT mode)
//! with bounded retries, and externally triggered measurement exchanges
//! with device error-code classification.
//!
//! ## Features
//!
//! - Connect to a CL-200A using its legacy serial framing (9600 7E1)
//! - Drive the initialization handshake as an explicit state machine
//! - Trigger measurements and decode the lux value from fixed-offset replies
//! - Classify device warnings (over-range, low luminance) without dropping
//!   the reading, and surface battery-low as a hard failure
//! - Discover candidate ports by USB manufacturer string
//! - Opt-in strict checksum and handshake-echo validation
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cl200_rs::{Photometer, ProtocolOptions, Reading, SerialConfig};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let mut meter = Photometer::connect(
//!     "/dev/ttyUSB0",
//!     SerialConfig::default(),
//!     ProtocolOptions::default(),
//! )
//! .await?;
//!
//! match meter.read_lux().await? {
//!     Reading::Value { lux, .. } => println!("{lux} lx"),
//!     Reading::NoData => println!("no fresh data yet"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod photometer;

pub use crate::error::{FrameError, HandshakeError, MeasureError, PortError};
pub use crate::logging::{init_logger, log_debug, log_error, log_info, log_warn};

// Core protocol types
pub use photometer::command::Command;
pub use photometer::frame::ReplyFields;
pub use photometer::protocol::{
    DeviceWarning, Photometer, ProtocolOptions, Reading, SessionState,
};
pub use photometer::serial::{DeviceHandle, SerialConfig, SerialLink};

pub use discovery::{find_port_by_manufacturer, find_ports_by_manufacturer};

/// Connect to a CL-200A with default settings and run the initialization
/// handshake.
///
/// # Arguments
/// * `port` - Serial port path (e.g., "/dev/ttyUSB0" on Linux, "COM3" on Windows)
///
/// # Returns
/// * `Ok(Photometer)` - Initialized session ready for measurements
/// * `Err(HandshakeError)` - Port could not be opened or the device refused
///   initialization
pub async fn connect(
    port: &str,
) -> Result<Photometer<tokio_serial::SerialStream>, HandshakeError> {
    Photometer::connect(port, SerialConfig::default(), ProtocolOptions::default()).await
}
