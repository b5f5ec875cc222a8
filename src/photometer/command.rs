//! # CL-200A Command Catalog
//!
//! The fixed command table of the CL-200A communication specification.
//! Payload widths matter: the device expects fixed-width fields padded with
//! spaces, so the strings below must be sent exactly as written.
//!
//! ```text
//!  Command type                              Command
//!  Read measurement data (X, Y, Z)             01
//!  Read measurement data (EV, x, y)            02
//!  Read measurement data (EV, u', v')          03
//!  Read measurement data (EV, TCP, Δuv)        08
//!  Read measurement data (EV, DW, P)           15
//!  Set EXT mode; take measurements             40
//!  Read measurement data (X2, Y, Z)            45
//!  Read coefficients for user calibration      47
//!  Set coefficients for user calibration       48
//!  Set PC connection mode                      54
//!  Set hold status                             55
//! ```
//!
//! The table is immutable and total: every command has a payload and a
//! settle duration, so there is no unknown-key lookup to fail at runtime.

use crate::constants::{SETTLE_EXT, SETTLE_MODE, SETTLE_NONE};
use std::time::Duration;

/// A logical CL-200A command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Read measurement data (X, Y, Z) — command 01.
    ReadXyz,
    /// Read measurement data (EV, x, y) — command 02.
    ReadEvXy,
    /// Read measurement data (EV, u', v') — command 03.
    ReadEvUv,
    /// Read measurement data (EV, TCP, Δuv) — command 08.
    ReadEvTcpDuv,
    /// Read measurement data (EV, DW, P) — command 15.
    ReadEvDwP,
    /// Set EXT mode — command 40.
    SetExtMode,
    /// Re-arm the device for one externally triggered measurement —
    /// command 40 with the reply-request parameter.
    TriggerMeasurement,
    /// Read measurement data (X2, Y, Z) — command 45.
    ReadXyz2,
    /// Read user calibration coefficients, channel a — command 47.
    ReadCalibrationA,
    /// Read user calibration coefficients, channel b.
    ReadCalibrationB,
    /// Read user calibration coefficients, channel c.
    ReadCalibrationC,
    /// Set user calibration coefficients, channel a — command 48.
    SetCalibrationA,
    /// Set user calibration coefficients, channel b.
    SetCalibrationB,
    /// Set user calibration coefficients, channel c.
    SetCalibrationC,
    /// Set PC connection mode — command 54. Required before any other
    /// exchange.
    SetPcConnection,
    /// The echo the device sends back for command 54; used only to match
    /// the handshake reply in strict mode.
    PcConnectionEcho,
    /// Set hold status — command 55. Prerequisite for EXT mode.
    SetHold,
}

impl Command {
    /// The unframed fixed-width payload string of this command.
    pub fn payload(self) -> &'static str {
        match self {
            Command::ReadXyz => "00011200",
            Command::ReadEvXy => "00021200",
            Command::ReadEvUv => "00031200",
            Command::ReadEvTcpDuv => "00081200",
            Command::ReadEvDwP => "00151200",
            Command::SetExtMode => "004010  ",
            Command::TriggerMeasurement => "994021  ",
            Command::ReadXyz2 => "00451000",
            Command::ReadCalibrationA => "004711",
            Command::ReadCalibrationB => "004721",
            Command::ReadCalibrationC => "004731",
            Command::SetCalibrationA => "004811  ",
            Command::SetCalibrationB => "004821  ",
            Command::SetCalibrationC => "004831  ",
            Command::SetPcConnection => "00541   ",
            Command::PcConnectionEcho => "0054    ",
            Command::SetHold => "99551  0",
        }
    }

    /// The mandatory post-write delay before any further I/O is safe.
    ///
    /// This is a protocol requirement, not an optimization: mode changes
    /// need 500 ms, EXT-mode setup 125 ms, and reads none at all (the read
    /// itself blocks on the port timeout).
    pub fn settle(self) -> Duration {
        match self {
            Command::SetPcConnection
            | Command::SetHold
            | Command::TriggerMeasurement
            | Command::SetCalibrationA
            | Command::SetCalibrationB
            | Command::SetCalibrationC => SETTLE_MODE,
            Command::SetExtMode => SETTLE_EXT,
            _ => SETTLE_NONE,
        }
    }

    /// Whether this command reads measurement data back from the device.
    pub fn is_read(self) -> bool {
        matches!(
            self,
            Command::ReadXyz
                | Command::ReadEvXy
                | Command::ReadEvUv
                | Command::ReadEvTcpDuv
                | Command::ReadEvDwP
                | Command::ReadXyz2
        )
    }
}
