//! # CL-200A Frame Codec
//!
//! This module encodes command payloads into the device's wire frame and
//! decodes received frames, commonly exchanged with Konica Minolta
//! CL-200A-class photometers over a half-duplex serial link.
//!
//! ## Wire format
//!
//! Both directions use the same framing:
//!
//! ```text
//! STX (0x02) | payload | ETX (0x03) | checksum (2 ASCII decimal digits) | CR LF
//! ```
//!
//! The checksum (BCC) is the running XOR over every byte of `payload + ETX`,
//! rendered as a zero-padded two-digit decimal string. The device does not
//! use hexadecimal here.
//!
//! ## Reply fields
//!
//! Measurement replies carry fixed-offset ASCII fields counted from the STX
//! byte at index 0: the device error code at 6, the battery-low flag at 8,
//! the value sign at 9, a four-digit mantissa at 10..14 and a power-of-ten
//! exponent digit at 14. [`ReplyFields::parse`] validates the minimum length
//! up front and returns named fields, so no caller ever indexes a short
//! buffer.

use crate::constants::{
    BATTERY_FLAG_OFFSET, CHECKSUM_WIDTH, CRLF, ERROR_CODE_OFFSET, ETX, EXPONENT_BIAS,
    EXPONENT_OFFSET, MANTISSA_OFFSET, MANTISSA_WIDTH, MIN_REPLY_LEN, SIGN_OFFSET, STX,
};
use crate::error::FrameError;

/// Computes the BCC over `payload + ETX`, rendered as two decimal digits.
pub fn checksum(payload: &str) -> String {
    let mut bcc: u8 = 0;
    for byte in payload.bytes().chain(std::iter::once(ETX)) {
        bcc ^= byte;
    }
    format!("{bcc:02}")
}

/// Packs a command payload into a complete wire frame.
///
/// The payload is assumed to already match the device's fixed command
/// widths; there are no error cases here.
pub fn encode(payload: &str) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + CHECKSUM_WIDTH + 4);
    frame.push(STX);
    frame.extend_from_slice(payload.as_bytes());
    frame.push(ETX);
    frame.extend_from_slice(checksum(payload).as_bytes());
    frame.extend_from_slice(CRLF);
    frame
}

/// Strictly validates a received frame and returns its payload.
///
/// Verifies the STX prefix, the ETX/checksum/CRLF trailer and the checksum
/// itself. The driver trusts incoming frames by default and skips this; it
/// is enabled via
/// [`ProtocolOptions::strict_checksum`](crate::photometer::protocol::ProtocolOptions).
pub fn decode(raw: &str) -> Result<&str, FrameError> {
    let bytes = raw.as_bytes();
    let trailer = 1 + CHECKSUM_WIDTH + CRLF.len();
    if bytes.len() < 1 + trailer {
        return Err(FrameError::Truncated {
            len: bytes.len(),
            need: 1 + trailer,
        });
    }
    if bytes[0] != STX {
        return Err(FrameError::Invalid("missing STX prefix".into()));
    }
    if &bytes[bytes.len() - CRLF.len()..] != CRLF {
        return Err(FrameError::Invalid("missing CRLF terminator".into()));
    }
    let etx_pos = bytes.len() - trailer;
    if bytes[etx_pos] != ETX {
        return Err(FrameError::Invalid("missing ETX delimiter".into()));
    }
    // Slice as bytes: a parity-corrupted byte survives the lossy UTF-8
    // conversion as a multi-byte replacement char, and string indexing
    // would panic on its boundaries.
    let payload = std::str::from_utf8(&bytes[1..etx_pos])
        .map_err(|_| FrameError::Invalid("non-ASCII payload".into()))?;
    let expected = std::str::from_utf8(&bytes[etx_pos + 1..etx_pos + 1 + CHECKSUM_WIDTH])
        .map_err(|_| FrameError::Invalid("non-ASCII checksum".into()))?;
    let calculated = checksum(payload);
    if expected != calculated {
        return Err(FrameError::ChecksumMismatch {
            expected: expected.to_string(),
            calculated,
        });
    }
    Ok(payload)
}

/// Returns the device error-code character of a raw reply line, if the line
/// is long enough to carry one. Short or empty replies carry no code.
pub fn error_code(raw: &str) -> Option<char> {
    raw.as_bytes().get(ERROR_CODE_OFFSET).map(|b| *b as char)
}

/// The fixed-offset fields of a decoded measurement reply.
///
/// Constructed fresh per read and discarded once the caller has extracted
/// the lux value or an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyFields {
    /// Device error code character.
    pub error_code: char,
    /// Battery-low flag character; `'1'` means the battery must be changed.
    pub battery_flag: char,
    /// Sign of the measurement value, `'+'` or `'-'`.
    pub sign: char,
    /// Four-digit value mantissa.
    pub mantissa: String,
    /// Power-of-ten exponent digit, biased by −4.
    pub exponent: char,
}

impl ReplyFields {
    /// Decodes the fixed-offset fields from a raw reply line (STX at 0).
    pub fn parse(raw: &str) -> Result<ReplyFields, FrameError> {
        let bytes = raw.as_bytes();
        if bytes.len() < MIN_REPLY_LEN {
            return Err(FrameError::Truncated {
                len: bytes.len(),
                need: MIN_REPLY_LEN,
            });
        }
        // Byte-sliced, not string-sliced: line noise on the 7-bit link can
        // leave multi-byte replacement chars in the lossy-decoded reply,
        // whose boundaries must not panic the decode.
        let mantissa = std::str::from_utf8(&bytes[MANTISSA_OFFSET..MANTISSA_OFFSET + MANTISSA_WIDTH])
            .map_err(|_| FrameError::Invalid("non-ASCII mantissa".into()))?
            .to_string();
        Ok(ReplyFields {
            error_code: bytes[ERROR_CODE_OFFSET] as char,
            battery_flag: bytes[BATTERY_FLAG_OFFSET] as char,
            sign: bytes[SIGN_OFFSET] as char,
            mantissa,
            exponent: bytes[EXPONENT_OFFSET] as char,
        })
    }

    /// Extracts the lux value: `sign * mantissa * 10^(exponent - 4)`,
    /// rounded to three decimal places.
    pub fn lux(&self) -> Result<f64, FrameError> {
        let sign = if self.sign == '+' { 1.0 } else { -1.0 };
        let mantissa: f64 = self
            .mantissa
            .parse()
            .map_err(|_| FrameError::Invalid(format!("non-numeric mantissa {:?}", self.mantissa)))?;
        let exponent = self
            .exponent
            .to_digit(10)
            .ok_or_else(|| FrameError::Invalid(format!("non-numeric exponent {:?}", self.exponent)))?
            as i32
            - EXPONENT_BIAS;
        let lux = sign * mantissa * 10f64.powi(exponent);
        Ok((lux * 1000.0).round() / 1000.0)
    }
}
