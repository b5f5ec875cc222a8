//! # CL-200A Protocol Implementation
//!
//! This module drives the device protocol on top of the transport: the
//! three-step initialization handshake (PC connection mode → hold mode →
//! EXT mode) with bounded retries, and the trigger-then-read measurement
//! exchange with device error-code classification.
//!
//! The protocol is strictly sequential and half-duplex: every write is
//! followed by its mandatory settle delay and every read blocks up to the
//! port timeout. The session exclusively owns the transport for its
//! lifetime; there is no pipelining and no concurrent access.

use crate::constants::{
    ERR_HOLD_NOT_SET, ERR_LOW_LUMINANCE, ERR_OVER_RANGE, ERR_POWER_CYCLE, HANDSHAKE_ATTEMPTS,
};
use crate::error::{HandshakeError, MeasureError, PortError};
use crate::photometer::command::Command;
use crate::photometer::frame::{self, ReplyFields};
use crate::photometer::serial::{DeviceHandle, SerialConfig, SerialLink};
use log::{debug, error, info, warn};

/// The device session states, in handshake order.
///
/// Transitions move monotonically forward on success. The one sanctioned
/// backward step is `ExtTriggerReady` setup falling back to [`Held`] when
/// the device reports that hold mode was lost. [`Faulted`] is terminal and
/// only left by re-running the full handshake.
///
/// [`Held`]: SessionState::Held
/// [`Faulted`]: SessionState::Faulted
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SessionState {
    Disconnected,
    PcConnected,
    Held,
    ExtTriggerReady,
    Faulted,
}

/// Optional strictness toggles for the protocol.
///
/// By default the driver trusts the device: it neither verifies checksums
/// on incoming frames nor matches the PC-connection echo, tolerating the
/// reply variance seen on real hardware. Both checks are available as
/// opt-ins; the retry counts are identical in either mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtocolOptions {
    /// Verify STX/ETX/checksum framing on measurement replies.
    pub strict_checksum: bool,
    /// Require the PC-connection handshake reply to echo command 54.
    pub strict_handshake: bool,
}

/// A device-reported condition that does not invalidate the reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceWarning {
    /// Error codes 1-3: the device asks to be switched off and on again.
    NeedsPowerCycle,
    /// Error code 5: the value exceeds the measurement range.
    OverRange,
    /// Error code 6: luminance too low for accurate chromaticity.
    LowLuminance,
}

/// The outcome of one measurement exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    /// A decoded lux value, with any device warning attached.
    Value {
        lux: f64,
        warning: Option<DeviceWarning>,
    },
    /// The device had no fresh data within the timeout; retry next cycle.
    NoData,
}

impl Reading {
    /// The lux value, if this reading carries one.
    pub fn lux(&self) -> Option<f64> {
        match self {
            Reading::Value { lux, .. } => Some(*lux),
            Reading::NoData => None,
        }
    }
}

/// An initialized (or initializing) CL-200A measurement session.
///
/// Owns the transport exclusively. Construct with [`Photometer::connect`]
/// for real hardware or [`Photometer::with_port`] for an injected link,
/// then run [`initialize`](Photometer::initialize) before measuring.
pub struct Photometer<P: SerialLink> {
    handle: DeviceHandle<P>,
    options: ProtocolOptions,
    state: SessionState,
}

impl Photometer<tokio_serial::SerialStream> {
    /// Opens the port and runs the full initialization handshake.
    pub async fn connect(
        port_name: &str,
        config: SerialConfig,
        options: ProtocolOptions,
    ) -> Result<Self, HandshakeError> {
        let handle = DeviceHandle::connect_with_config(port_name, config)
            .await
            .map_err(HandshakeError::Port)?;
        let mut photometer = Photometer {
            handle,
            options,
            state: SessionState::Disconnected,
        };
        photometer.initialize().await?;
        Ok(photometer)
    }
}

impl<P: SerialLink> Photometer<P> {
    /// Wraps an already-open transport without running the handshake.
    pub fn with_port(port: P, config: SerialConfig, options: ProtocolOptions) -> Self {
        Photometer {
            handle: DeviceHandle::with_port(port, config),
            options,
            state: SessionState::Disconnected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Runs the three-step device initialization.
    ///
    /// Any [`PortError::Disconnected`] aborts the whole sequence at once,
    /// bypassing the per-step retries.
    pub async fn initialize(&mut self) -> Result<(), HandshakeError> {
        self.state = SessionState::Disconnected;
        self.set_pc_connection_mode().await?;
        self.set_hold_mode().await?;
        self.set_ext_mode().await?;
        info!("CL-200A initialized, ready for externally triggered measurements");
        Ok(())
    }

    /// Step 1: switch the device to PC connection mode (command 54).
    ///
    /// Communication with a PC is only possible in this mode. Up to
    /// [`HANDSHAKE_ATTEMPTS`] tries; the reply echo is only checked when
    /// `strict_handshake` is set, since real devices do not always echo
    /// the command verbatim.
    async fn set_pc_connection_mode(&mut self) -> Result<(), HandshakeError> {
        info!("Setting CL-200A to PC connection mode");
        let echo = String::from_utf8_lossy(&frame::encode(Command::PcConnectionEcho.payload()))
            .into_owned();

        for attempt in 1..=HANDSHAKE_ATTEMPTS {
            if let Err(e) = self.handle.send_command(Command::SetPcConnection).await {
                return Err(self.fatal(e));
            }
            let reply = match self.handle.read_line().await {
                Ok(line) => line,
                Err(PortError::Timeout) => String::new(),
                Err(e) => return Err(self.fatal(e)),
            };
            if let Err(e) = self.handle.clear_buffers().await {
                return Err(self.fatal(e));
            }

            if !self.options.strict_handshake || reply.contains(&echo) {
                self.state = SessionState::PcConnected;
                return Ok(());
            }
            if attempt < HANDSHAKE_ATTEMPTS {
                warn!("Unexpected PC connection reply, attempting one more time");
            }
        }

        error!("CL-200A did not acknowledge PC connection mode; verify the USB cable");
        self.state = SessionState::Faulted;
        Err(HandshakeError::ConnectionRejected)
    }

    /// Step 2: set hold status (command 55).
    ///
    /// Fire-and-forget by protocol design; the device does not send a
    /// distinct echo here. Hold status is the prerequisite for EXT mode.
    async fn set_hold_mode(&mut self) -> Result<(), HandshakeError> {
        debug!("Setting CL-200A hold status");
        if let Err(e) = self.handle.clear_buffers().await {
            return Err(self.fatal(e));
        }
        if let Err(e) = self.handle.send_command(Command::SetHold).await {
            return Err(self.fatal(e));
        }
        self.state = SessionState::Held;
        Ok(())
    }

    /// Step 3: switch to EXT mode (command 40), in which measurements are
    /// taken only on explicit PC command.
    ///
    /// Error code `'4'` in the reply means hold mode was not established:
    /// step 2 is re-run and this step retried, up to [`HANDSHAKE_ATTEMPTS`]
    /// total attempts. Codes `'1'`..`'3'` are an unrecoverable device fault.
    /// Anything else, including a silent device, counts as success.
    async fn set_ext_mode(&mut self) -> Result<(), HandshakeError> {
        info!("Setting CL-200A to EXT mode");
        let mut code = ' ';

        for _ in 0..HANDSHAKE_ATTEMPTS {
            if let Err(e) = self.handle.send_command(Command::SetExtMode).await {
                return Err(self.fatal(e));
            }
            let reply = match self.handle.read_line().await {
                Ok(line) => line,
                Err(PortError::Timeout) => String::new(),
                Err(e) => return Err(self.fatal(e)),
            };

            match frame::error_code(&reply) {
                Some(c) if c == ERR_HOLD_NOT_SET => {
                    warn!("EXT mode rejected: hold status not set, repeating hold step");
                    code = c;
                    self.state = SessionState::Held;
                    self.set_hold_mode().await?;
                }
                Some(c) if ERR_POWER_CYCLE.contains(&c) => {
                    error!("EXT mode failed with device error code {c}");
                    self.state = SessionState::Faulted;
                    return Err(HandshakeError::DeviceFault { code: c });
                }
                _ => {
                    self.state = SessionState::ExtTriggerReady;
                    return Ok(());
                }
            }
        }

        // Retries exhausted with the device still reporting a lost hold
        // status: the session never reached EXT mode.
        error!("EXT mode retries exhausted");
        self.state = SessionState::Faulted;
        Err(HandshakeError::DeviceFault { code })
    }

    /// Issues one trigger-then-read exchange and decodes the reply.
    ///
    /// `cmd` must be one of the read-measurement commands. A read timeout is
    /// not a fault: the device simply has no fresh data yet, and the result
    /// is [`Reading::NoData`] so the caller can retry after a short delay.
    pub async fn measure(&mut self, cmd: Command) -> Result<Reading, MeasureError> {
        debug_assert!(cmd.is_read());

        self.handle.clear_buffers().await?;
        // Re-arm the device for one externally triggered measurement.
        self.handle.send_command(Command::TriggerMeasurement).await?;
        self.handle.send_command(cmd).await?;

        let reply = match self.handle.read_line().await {
            Ok(line) => line,
            Err(PortError::Timeout) => {
                debug!("No measurement data within timeout");
                return Ok(Reading::NoData);
            }
            Err(e) => return Err(MeasureError::Port(e)),
        };
        debug!("Got raw reply: {}", reply.trim_end());

        if self.options.strict_checksum {
            frame::decode(&reply)?;
        }
        let fields = ReplyFields::parse(&reply)?;
        let warning = self.classify(&fields)?;
        let lux = fields.lux()?;
        Ok(Reading::Value { lux, warning })
    }

    /// Performs one lux measurement (command 02, EV/x/y data).
    pub async fn read_lux(&mut self) -> Result<Reading, MeasureError> {
        self.measure(Command::ReadEvXy).await
    }

    /// Classifies the device error code and battery flag of a reply.
    ///
    /// Warnings are logged and reported alongside the value; a set battery
    /// flag invalidates the reading no matter what the other fields say.
    fn classify(&self, fields: &ReplyFields) -> Result<Option<DeviceWarning>, MeasureError> {
        let mut warning = None;
        if ERR_POWER_CYCLE.contains(&fields.error_code) {
            error!("Device error: switch the CL-200A off and then back on");
            warning = Some(DeviceWarning::NeedsPowerCycle);
        } else if fields.error_code == ERR_OVER_RANGE {
            error!("Measurement value over error: the reading exceeds the CL-200A range");
            warning = Some(DeviceWarning::OverRange);
        } else if fields.error_code == ERR_LOW_LUMINANCE {
            error!(
                "Low luminance error: reduced calculation accuracy for determining chromaticity"
            );
            warning = Some(DeviceWarning::LowLuminance);
        }

        if fields.battery_flag == '1' {
            error!("Battery is low: change the battery immediately or use the AC adapter");
            return Err(MeasureError::BatteryLow);
        }
        Ok(warning)
    }

    /// Records a fatal transport failure and surfaces it unchanged.
    fn fatal(&mut self, err: PortError) -> HandshakeError {
        error!("Connection to the CL-200A was lost");
        self.state = SessionState::Faulted;
        HandshakeError::Port(err)
    }
}
