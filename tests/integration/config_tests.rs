//! Configuration loading integration tests

use amio_pad::hid::{DeviceIdentity, LedCommand};
use amio_pad::Config;
use std::io::Write;
use tempfile::NamedTempFile;
use tokio_test::{assert_err, assert_ok};

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_file() {
    let file = write_config(
        r#"
[hid]
vendor_id = 0x1209
product_id = 0x0001
input_report_len = 32
output_report_len = 8
read_timeout_ms = 20
poll_interval_ms = 250
shutdown_timeout_ms = 1000

[ui]
initial_led = "flash-right"
"#,
    );

    let config = assert_ok!(Config::load_from(file.path()));
    assert_eq!(config.hid.identity(), DeviceIdentity::new(0x1209, 0x0001));
    assert_eq!(config.hid.input_report_len, 32);
    assert_eq!(config.hid.output_report_len, 8);
    assert_eq!(config.hid.read_timeout_ms, 20);
    assert_eq!(config.hid.poll_interval().as_millis(), 250);
    assert_eq!(config.hid.shutdown_timeout().as_millis(), 1000);
    assert_eq!(config.ui.initial_led, Some(LedCommand::FlashRight));
}

#[test]
fn test_partial_file_uses_defaults() {
    let file = write_config("[hid]\nproduct_id = 0x5751\n");

    let config = assert_ok!(Config::load_from(file.path()));
    assert_eq!(config.hid.vendor_id, 0x0483);
    assert_eq!(config.hid.product_id, 0x5751);
    assert_eq!(config.hid.output_report_len, 2);
    assert_eq!(config.ui.initial_led, None);
}

#[test]
fn test_empty_file_is_default() {
    let file = write_config("");
    let config = assert_ok!(Config::load_from(file.path()));
    assert_eq!(config.hid.identity(), DeviceIdentity::new(0x0483, 0x5750));
}

#[test]
fn test_invalid_values_rejected() {
    // Out of u16 range
    let file = write_config("[hid]\nvendor_id = 70000\n");
    assert_err!(Config::load_from(file.path()));

    let file = write_config("[ui]\ninitial_led = \"strobe\"\n");
    assert_err!(Config::load_from(file.path()));
}

#[test]
fn test_missing_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = assert_err!(Config::load_from(&dir.path().join("missing.toml")));
    assert!(format!("{:#}", err).contains("Failed to read config file"));
}

#[test]
fn test_shipped_default_file() {
    let config = assert_ok!(Config::parse(Config::default_config_str()));
    assert_eq!(config.hid.identity(), DeviceIdentity::new(0x0483, 0x5750));
    assert_eq!(config.hid.read_timeout_ms, 50);
    assert_eq!(config.hid.poll_interval_ms, 500);
}
