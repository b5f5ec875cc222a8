//! Unit tests for the frame codec: encoding, checksum rendering, strict
//! decoding, and fixed-offset reply field extraction.

use cl200_rs::photometer::frame::{checksum, decode, encode, error_code, ReplyFields};
use cl200_rs::FrameError;
use proptest::prelude::*;

/// Tests that encoding wraps the payload in STX/ETX/checksum/CRLF.
#[test]
fn test_encode_frame_layout() {
    let frame = encode("00021200");
    assert_eq!(frame[0], 0x02);
    assert_eq!(&frame[1..9], b"00021200");
    assert_eq!(frame[9], 0x03);
    assert_eq!(&frame[12..14], b"\r\n");
}

/// Tests the documented checksum constant of the command-54 echo payload.
#[test]
fn test_checksum_documented_constant() {
    assert_eq!(checksum("0054    "), "02");
}

/// Tests that the checksum is deterministic over identical bytes.
#[test]
fn test_checksum_deterministic() {
    let a = checksum("994021  ");
    let b = checksum("994021  ");
    assert_eq!(a, b);
    assert_eq!(a.len(), 2);
}

/// Tests that strict decoding recovers the encoded payload.
#[test]
fn test_decode_round_trip() {
    let raw = String::from_utf8(encode("00541   ")).unwrap();
    assert_eq!(decode(&raw).unwrap(), "00541   ");
}

/// Tests that a corrupted checksum is rejected with both values reported.
#[test]
fn test_decode_checksum_mismatch() {
    let mut raw = String::from_utf8(encode("00021200")).unwrap();
    let etx = raw.find('\u{3}').unwrap();
    raw.replace_range(etx + 1..etx + 3, "00");
    match decode(&raw) {
        Err(FrameError::ChecksumMismatch { expected, calculated }) => {
            assert_eq!(expected, "00");
            assert_eq!(calculated, checksum("00021200"));
        }
        other => panic!("expected checksum mismatch, got {other:?}"),
    }
}

/// Tests that a frame without its STX prefix is rejected.
#[test]
fn test_decode_missing_stx() {
    let raw = String::from_utf8(encode("00021200")).unwrap();
    assert!(matches!(decode(&raw[1..]), Err(FrameError::Invalid(_))));
}

/// Tests that replies shorter than the fixed-offset fields fail as
/// truncated rather than panicking on an index.
#[test]
fn test_parse_truncated_reply() {
    let err = ReplyFields::parse("\u{2}00021").unwrap_err();
    assert!(matches!(err, FrameError::Truncated { need: 15, .. }));
}

/// Tests positive lux extraction: +1234 with exponent digit 4 is 10^0.
#[test]
fn test_lux_positive() {
    let fields = ReplyFields {
        error_code: '0',
        battery_flag: '0',
        sign: '+',
        mantissa: "1234".to_string(),
        exponent: '4',
    };
    assert_eq!(fields.lux().unwrap(), 1234.0);
}

/// Tests negative lux extraction: -0500 with exponent digit 2 is 10^-2.
#[test]
fn test_lux_negative() {
    let fields = ReplyFields {
        error_code: '0',
        battery_flag: '0',
        sign: '-',
        mantissa: "0500".to_string(),
        exponent: '2',
    };
    assert_eq!(fields.lux().unwrap(), -5.0);
}

/// Tests that lux extraction is idempotent.
#[test]
fn test_lux_idempotent() {
    let fields = ReplyFields {
        error_code: '0',
        battery_flag: '0',
        sign: '+',
        mantissa: "9999".to_string(),
        exponent: '6',
    };
    assert_eq!(fields.lux().unwrap(), fields.lux().unwrap());
}

/// Tests that a non-numeric mantissa is a decode error, not a sentinel.
#[test]
fn test_lux_rejects_garbage_mantissa() {
    let fields = ReplyFields {
        error_code: '0',
        battery_flag: '0',
        sign: '+',
        mantissa: "12x4".to_string(),
        exponent: '4',
    };
    assert!(matches!(fields.lux(), Err(FrameError::Invalid(_))));
}

/// Tests the error-code accessor on lines too short to carry one.
#[test]
fn test_error_code_short_lines() {
    assert_eq!(error_code(""), None);
    assert_eq!(error_code("\u{2}0004"), None);
    assert_eq!(error_code("\u{2}000404  "), Some('4'));
}

proptest! {
    /// For any payload of device-alphabet characters, strict decoding of the
    /// encoded frame recovers the payload exactly.
    #[test]
    fn prop_encode_decode_round_trip(payload in "[0-9 ]{0,12}") {
        let raw = String::from_utf8(encode(&payload)).unwrap();
        prop_assert_eq!(decode(&raw).unwrap(), payload);
    }

    /// The rendered checksum is always two decimal digits.
    #[test]
    fn prop_checksum_width(payload in "[0-9 ]{0,12}") {
        let bcc = checksum(&payload);
        prop_assert_eq!(bcc.len(), 2);
        prop_assert!(bcc.bytes().all(|b| b.is_ascii_digit()));
    }
}
