//! # CL-200A Serial Transport
//!
//! This module handles the serial side of the CL-200A protocol: opening the
//! port with the device's legacy framing (9600 baud, 7 data bits, even
//! parity), writing framed commands with their mandatory settle delay, and
//! reading reply lines under a timeout.
//!
//! The device is half-duplex with a single in-flight exchange; the handle is
//! not safe for concurrent use and is exclusively owned by one
//! [`Photometer`](crate::photometer::protocol::Photometer) session.
//!
//! [`DeviceHandle`] is generic over the [`SerialLink`] trait so the protocol
//! layer can be exercised against [`MockSerialPort`] without hardware.
//!
//! [`MockSerialPort`]: crate::photometer::serial_mock::MockSerialPort

use crate::constants::{DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT};
use crate::error::PortError;
use crate::photometer::command::Command;
use crate::photometer::frame;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::SerialPortBuilderExt;

/// Configuration for the serial connection.
///
/// Fixed for the lifetime of one open port; changing any field requires
/// closing and reopening the port.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub data_bits: tokio_serial::DataBits,
    pub parity: tokio_serial::Parity,
    pub stop_bits: tokio_serial::StopBits,
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: tokio_serial::DataBits::Seven,
            parity: tokio_serial::Parity::Even,
            stop_bits: tokio_serial::StopBits::One,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Trait for the byte-oriented serial channel underneath a [`DeviceHandle`].
///
/// Implemented by `tokio_serial::SerialStream` for real hardware and by the
/// mock port for tests.
#[async_trait::async_trait]
pub trait SerialLink: AsyncReadExt + AsyncWriteExt + Unpin + Send {
    /// Ensures all written bytes have left the transmit path.
    async fn flush_output(&mut self) -> Result<(), io::Error>;

    /// Discards buffered unread input and unsent output. Called before every
    /// write so stale bytes from a prior exchange are never consumed as the
    /// current reply.
    async fn clear_buffers(&mut self) -> Result<(), io::Error>;
}

#[async_trait::async_trait]
impl SerialLink for tokio_serial::SerialStream {
    async fn flush_output(&mut self) -> Result<(), io::Error> {
        AsyncWriteExt::flush(self).await
    }

    async fn clear_buffers(&mut self) -> Result<(), io::Error> {
        tokio_serial::SerialPort::clear(self, tokio_serial::ClearBuffer::All)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
    }
}

/// A handle to an open CL-200A serial connection.
pub struct DeviceHandle<P: SerialLink> {
    port: P,
    config: SerialConfig,
}

impl DeviceHandle<tokio_serial::SerialStream> {
    /// Opens the named port with the default CL-200A framing.
    pub async fn connect(port_name: &str) -> Result<Self, PortError> {
        Self::connect_with_config(port_name, SerialConfig::default()).await
    }

    /// Opens the named port with an explicit configuration.
    pub async fn connect_with_config(
        port_name: &str,
        config: SerialConfig,
    ) -> Result<Self, PortError> {
        let port = tokio_serial::new(port_name, config.baud_rate)
            .data_bits(config.data_bits)
            .parity(config.parity)
            .stop_bits(config.stop_bits)
            .timeout(config.timeout)
            .open_native_async()
            .map_err(|e| match e.kind {
                tokio_serial::ErrorKind::InvalidInput => PortError::BadConfig(e.to_string()),
                _ => PortError::Unavailable(e.to_string()),
            })?;
        Ok(DeviceHandle { port, config })
    }
}

impl<P: SerialLink> DeviceHandle<P> {
    /// Wraps an already-open port. Used by tests and by callers that manage
    /// port discovery themselves.
    pub fn with_port(port: P, config: SerialConfig) -> Self {
        DeviceHandle { port, config }
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    /// Frames and writes a catalog command with its own settle duration.
    pub async fn send_command(&mut self, cmd: Command) -> Result<(), PortError> {
        self.send_payload(cmd.payload(), cmd.settle()).await
    }

    /// Writes a framed payload, sleeps for the settle duration, then clears
    /// the input buffer.
    ///
    /// The settle delay respects the device's processing latency and is a
    /// protocol requirement; any write failure means the link is gone and is
    /// reported as [`PortError::Disconnected`].
    pub async fn send_payload(&mut self, payload: &str, settle: Duration) -> Result<(), PortError> {
        let data = frame::encode(payload);
        self.port
            .write_all(&data)
            .await
            .map_err(|e| PortError::Disconnected(e.to_string()))?;
        self.port
            .flush_output()
            .await
            .map_err(|e| PortError::Disconnected(e.to_string()))?;
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }
        self.port
            .clear_buffers()
            .await
            .map_err(|e| PortError::Disconnected(e.to_string()))
    }

    /// Reads one reply line, up to and including the terminator.
    ///
    /// Returns [`PortError::Timeout`] when the line does not complete within
    /// the configured timeout or the channel stays silent; callers treat this
    /// as "no data yet", not as a fault. The timeout bounds the whole call,
    /// not each byte, so a device trickling bytes without ever sending the
    /// terminator cannot keep the exchange blocked past the deadline. A
    /// transport-level I/O error is reported as [`PortError::Disconnected`]
    /// and is fatal everywhere.
    pub async fn read_line(&mut self) -> Result<String, PortError> {
        let deadline = tokio::time::Instant::now() + self.config.timeout;
        let mut line = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            let n = tokio::time::timeout_at(deadline, self.port.read(&mut byte))
                .await
                .map_err(|_| PortError::Timeout)?
                .map_err(|e| PortError::Disconnected(e.to_string()))?;
            if n == 0 {
                return Err(PortError::Timeout);
            }
            line.push(byte[0]);
            if byte[0] == b'\n' {
                break;
            }
        }
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    /// Discards any buffered unread input and unsent output.
    pub async fn clear_buffers(&mut self) -> Result<(), PortError> {
        self.port
            .clear_buffers()
            .await
            .map_err(|e| PortError::Disconnected(e.to_string()))
    }

    /// Releases the handle, returning the underlying port.
    pub fn into_port(self) -> P {
        self.port
    }
}
