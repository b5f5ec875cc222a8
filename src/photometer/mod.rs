//! The photometer module contains the components of the CL-200A protocol
//! driver: frame encoding and decoding, the command catalog, the serial
//! transport, and the handshake/measurement protocol on top of them.

pub mod command;
pub mod frame;
pub mod protocol;
pub mod serial;
pub mod serial_mock;

pub use command::Command;
pub use frame::ReplyFields;
pub use protocol::{DeviceWarning, Photometer, ProtocolOptions, Reading, SessionState};
pub use serial::{DeviceHandle, SerialConfig, SerialLink};
