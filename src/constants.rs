//! CL-200A Protocol Constants
//!
//! This module defines constants used by the CL-200A serial protocol
//! implementation, based on the Konica Minolta communication specification.

use std::time::Duration;

/// Start-of-text byte opening every frame
pub const STX: u8 = 0x02;

/// End-of-text byte closing the payload; included in the checksum
pub const ETX: u8 = 0x03;

/// Line terminator following the checksum digits
pub const CRLF: &[u8] = b"\r\n";

/// Width of the rendered checksum (two ASCII decimal digits)
pub const CHECKSUM_WIDTH: usize = 2;

/// Offset of the device error-code character in a raw reply line (STX at 0)
pub const ERROR_CODE_OFFSET: usize = 6;

/// Offset of the battery-low flag character in a raw reply line
pub const BATTERY_FLAG_OFFSET: usize = 8;

/// Offset of the sign character of the measurement value
pub const SIGN_OFFSET: usize = 9;

/// Offset of the 4-digit measurement mantissa
pub const MANTISSA_OFFSET: usize = 10;

/// Width of the measurement mantissa
pub const MANTISSA_WIDTH: usize = 4;

/// Offset of the single-digit power-of-ten exponent
pub const EXPONENT_OFFSET: usize = 14;

/// Implicit bias subtracted from the exponent digit
pub const EXPONENT_BIAS: i32 = 4;

/// Minimum raw reply length before the fixed-offset fields can be read
pub const MIN_REPLY_LEN: usize = 15;

/// Device error code reporting that hold mode was not established
pub const ERR_HOLD_NOT_SET: char = '4';

/// Device error codes that require a power cycle
pub const ERR_POWER_CYCLE: [char; 3] = ['1', '2', '3'];

/// Device error code for a reading beyond the measurement range
pub const ERR_OVER_RANGE: char = '5';

/// Device error code for low luminance (reduced chromaticity accuracy)
pub const ERR_LOW_LUMINANCE: char = '6';

/// Total attempts for the retried handshake steps
pub const HANDSHAKE_ATTEMPTS: usize = 2;

/// Settle delay after mode-setting and trigger commands
pub const SETTLE_MODE: Duration = Duration::from_millis(500);

/// Settle delay after the EXT-mode command
pub const SETTLE_EXT: Duration = Duration::from_millis(125);

/// No settle; the following read blocks on the port timeout instead
pub const SETTLE_NONE: Duration = Duration::ZERO;

/// Default read timeout for one reply line
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Default baud rate of the CL-200A serial link
pub const DEFAULT_BAUD_RATE: u32 = 9600;
