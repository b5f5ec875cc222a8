//! Scenario tests for the handshake sequencer and the measurement session,
//! run against the mock serial port with scripted device replies.
//!
//! Settle delays are real `tokio::time::sleep`s, so every test starts the
//! runtime with paused time.


use cl200_rs::photometer::serial_mock::MockSerialPort;
use cl200_rs::{
    Command, DeviceWarning, HandshakeError, MeasureError, Photometer, PortError, ProtocolOptions,
    Reading, SerialConfig, SessionState,
};
use mock_support::{ext_mode_payload, measurement_payload, value_payload};
use std::io;

fn photometer(mock: &MockSerialPort) -> Photometer<MockSerialPort> {
    Photometer::with_port(
        mock.clone(),
        SerialConfig::default(),
        ProtocolOptions::default(),
    )
}

fn strict_photometer(mock: &MockSerialPort) -> Photometer<MockSerialPort> {
    Photometer::with_port(
        mock.clone(),
        SerialConfig::default(),
        ProtocolOptions {
            strict_checksum: true,
            strict_handshake: true,
        },
    )
}

#[tokio::test(start_paused = true)]
async fn handshake_reaches_ext_trigger_ready() {
    let mock = MockSerialPort::new();
    mock.queue_reply("0054    "); // PC connection echo
    mock.queue_reply(&ext_mode_payload('0')); // EXT mode accepted

    let mut meter = photometer(&mock);
    meter.initialize().await.unwrap();

    assert_eq!(meter.state(), SessionState::ExtTriggerReady);
    assert_eq!(mock.count_writes_of(Command::SetPcConnection.payload()), 1);
    assert_eq!(mock.count_writes_of(Command::SetHold.payload()), 1);
    assert_eq!(mock.count_writes_of(Command::SetExtMode.payload()), 1);
}

#[tokio::test(start_paused = true)]
async fn handshake_accepts_silent_device() {
    // No replies at all: non-strict step 1 accepts an empty read, and a
    // missing EXT-mode reply carries no error code.
    let mock = MockSerialPort::new();

    let mut meter = photometer(&mock);
    meter.initialize().await.unwrap();

    assert_eq!(meter.state(), SessionState::ExtTriggerReady);
}

#[tokio::test(start_paused = true)]
async fn ext_mode_retries_once_when_hold_was_lost() {
    let mock = MockSerialPort::new();
    mock.queue_reply("0054    ");
    mock.queue_reply(&ext_mode_payload('4')); // hold not established
    mock.queue_reply(&ext_mode_payload('0')); // second attempt fine

    let mut meter = photometer(&mock);
    meter.initialize().await.unwrap();

    assert_eq!(meter.state(), SessionState::ExtTriggerReady);
    // Hold was re-run between the two EXT attempts.
    assert_eq!(mock.count_writes_of(Command::SetHold.payload()), 2);
    assert_eq!(mock.count_writes_of(Command::SetExtMode.payload()), 2);
}

#[tokio::test(start_paused = true)]
async fn ext_mode_fatal_code_fails_without_retry() {
    let mock = MockSerialPort::new();
    mock.queue_reply("0054    ");
    mock.queue_reply(&ext_mode_payload('1')); // power-cycle class

    let mut meter = photometer(&mock);
    let err = meter.initialize().await.unwrap_err();

    assert!(matches!(err, HandshakeError::DeviceFault { code: '1' }));
    assert_eq!(meter.state(), SessionState::Faulted);
    assert_eq!(mock.count_writes_of(Command::SetExtMode.payload()), 1);
}

#[tokio::test(start_paused = true)]
async fn ext_mode_exhausting_hold_errors_faults() {
    let mock = MockSerialPort::new();
    mock.queue_reply("0054    ");
    mock.queue_reply(&ext_mode_payload('4'));
    mock.queue_reply(&ext_mode_payload('4'));

    let mut meter = photometer(&mock);
    let err = meter.initialize().await.unwrap_err();

    assert!(matches!(err, HandshakeError::DeviceFault { code: '4' }));
    assert_eq!(meter.state(), SessionState::Faulted);
    assert_eq!(mock.count_writes_of(Command::SetExtMode.payload()), 2);
}

#[tokio::test(start_paused = true)]
async fn strict_handshake_rejects_wrong_echo_after_two_attempts() {
    let mock = MockSerialPort::new();
    mock.queue_reply("99999999");
    mock.queue_reply("99999999");

    let mut meter = strict_photometer(&mock);
    let err = meter.initialize().await.unwrap_err();

    assert!(matches!(err, HandshakeError::ConnectionRejected));
    assert_eq!(meter.state(), SessionState::Faulted);
    assert_eq!(mock.count_writes_of(Command::SetPcConnection.payload()), 2);
}

#[tokio::test(start_paused = true)]
async fn strict_handshake_matches_correct_echo() {
    let mock = MockSerialPort::new();
    mock.queue_reply("0054    ");
    mock.queue_reply(&ext_mode_payload('0'));

    let mut meter = strict_photometer(&mock);
    meter.initialize().await.unwrap();

    assert_eq!(meter.state(), SessionState::ExtTriggerReady);
    assert_eq!(mock.count_writes_of(Command::SetPcConnection.payload()), 1);
}

#[tokio::test(start_paused = true)]
async fn disconnection_aborts_handshake_immediately() {
    let mock = MockSerialPort::new();
    mock.set_next_error(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));

    let mut meter = photometer(&mock);
    let err = meter.initialize().await.unwrap_err();

    assert!(matches!(
        err,
        HandshakeError::Port(PortError::Disconnected(_))
    ));
    assert_eq!(meter.state(), SessionState::Faulted);
}

#[tokio::test(start_paused = true)]
async fn measurement_timeout_yields_no_data() {
    let mock = MockSerialPort::new();

    let mut meter = photometer(&mock);
    let reading = meter.measure(Command::ReadEvXy).await.unwrap();

    assert_eq!(reading, Reading::NoData);
    assert_eq!(reading.lux(), None);
    // The trigger and the read command both went out.
    assert_eq!(
        mock.count_writes_of(Command::TriggerMeasurement.payload()),
        1
    );
    assert_eq!(mock.count_writes_of(Command::ReadEvXy.payload()), 1);
}

#[tokio::test(start_paused = true)]
async fn measurement_decodes_lux_value() {
    let mock = MockSerialPort::new();
    mock.queue_reply(&value_payload('+', "1234", '4'));

    let mut meter = photometer(&mock);
    let reading = meter.measure(Command::ReadEvXy).await.unwrap();

    assert_eq!(
        reading,
        Reading::Value {
            lux: 1234.0,
            warning: None
        }
    );
}

#[tokio::test(start_paused = true)]
async fn measurement_negative_value_with_exponent() {
    let mock = MockSerialPort::new();
    mock.queue_reply(&value_payload('-', "0500", '2'));

    let mut meter = photometer(&mock);
    let reading = meter.measure(Command::ReadEvXy).await.unwrap();

    assert_eq!(reading.lux(), Some(-5.0));
}

#[tokio::test(start_paused = true)]
async fn battery_low_is_fatal() {
    let mock = MockSerialPort::new();
    mock.queue_reply(&measurement_payload('0', '1', '+', "1234", '4'));

    let mut meter = photometer(&mock);
    let err = meter.measure(Command::ReadEvXy).await.unwrap_err();

    assert!(matches!(err, MeasureError::BatteryLow));
}

#[tokio::test(start_paused = true)]
async fn battery_low_wins_over_other_fields() {
    // Over-range warning and a perfectly good value: the set battery flag
    // still invalidates the reading.
    let mock = MockSerialPort::new();
    mock.queue_reply(&measurement_payload('5', '1', '+', "9999", '6'));

    let mut meter = photometer(&mock);
    let err = meter.measure(Command::ReadEvXy).await.unwrap_err();

    assert!(matches!(err, MeasureError::BatteryLow));
}

#[tokio::test(start_paused = true)]
async fn over_range_warns_but_returns_value() {
    let mock = MockSerialPort::new();
    mock.queue_reply(&measurement_payload('5', '0', '+', "9999", '6'));

    let mut meter = photometer(&mock);
    let reading = meter.measure(Command::ReadEvXy).await.unwrap();

    assert_eq!(
        reading,
        Reading::Value {
            lux: 999900.0,
            warning: Some(DeviceWarning::OverRange)
        }
    );
}

#[tokio::test(start_paused = true)]
async fn low_luminance_warns_but_returns_value() {
    let mock = MockSerialPort::new();
    mock.queue_reply(&measurement_payload('6', '0', '+', "0012", '4'));

    let mut meter = photometer(&mock);
    let reading = meter.measure(Command::ReadEvXy).await.unwrap();

    assert_eq!(
        reading,
        Reading::Value {
            lux: 12.0,
            warning: Some(DeviceWarning::LowLuminance)
        }
    );
}

#[tokio::test(start_paused = true)]
async fn power_cycle_code_warns_but_returns_value() {
    let mock = MockSerialPort::new();
    mock.queue_reply(&measurement_payload('2', '0', '+', "0100", '4'));

    let mut meter = photometer(&mock);
    let reading = meter.measure(Command::ReadEvXy).await.unwrap();

    assert_eq!(
        reading,
        Reading::Value {
            lux: 100.0,
            warning: Some(DeviceWarning::NeedsPowerCycle)
        }
    );
}

#[tokio::test(start_paused = true)]
async fn truncated_reply_is_malformed() {
    let mock = MockSerialPort::new();
    mock.queue_reply_raw(b"\x02004\r\n");

    let mut meter = photometer(&mock);
    let err = meter.measure(Command::ReadEvXy).await.unwrap_err();

    assert!(matches!(err, MeasureError::Malformed(_)));
}

#[tokio::test(start_paused = true)]
async fn corrupted_byte_in_reply_is_malformed_not_a_crash() {
    // 7E1 line noise: one corrupted byte in the mantissa field survives the
    // lossy UTF-8 conversion as a multi-byte replacement char. The decode
    // must report the reply as malformed, never panic the read loop.
    let mock = MockSerialPort::new();
    mock.queue_reply_raw(b"\x02000210 0+123\xFF56789\r\n");

    let mut meter = photometer(&mock);
    let err = meter.measure(Command::ReadEvXy).await.unwrap_err();

    assert!(matches!(err, MeasureError::Malformed(_)));
}

#[tokio::test(start_paused = true)]
async fn strict_checksum_rejects_corrupt_reply() {
    let mock = MockSerialPort::new();
    // Well-formed fields, wrong checksum digits.
    let payload = value_payload('+', "1234", '4');
    let mut raw = cl200_rs::photometer::frame::encode(&payload);
    let len = raw.len();
    raw[len - 4] = b'9';
    raw[len - 3] = b'9';
    mock.queue_reply_raw(&raw);

    let mut meter = strict_photometer(&mock);
    let err = meter.measure(Command::ReadEvXy).await.unwrap_err();

    assert!(matches!(err, MeasureError::Malformed(_)));
}

#[tokio::test(start_paused = true)]
async fn disconnection_during_measurement_is_fatal() {
    let mock = MockSerialPort::new();
    mock.set_next_error(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));

    let mut meter = photometer(&mock);
    let err = meter.measure(Command::ReadEvXy).await.unwrap_err();

    assert!(matches!(err, MeasureError::Port(PortError::Disconnected(_))));
}
