//! Report codec integration tests

use amio_pad::core::state::{ControlState, AXIS_MAX};
use amio_pad::hid::protocol::{format_report, parse_input, INPUT_REPORT_LEN, REPORT_ID_LED};
use amio_pad::hid::{build_set_led, encode_led, LedCommand};

#[test]
fn test_reference_report() {
    let state = parse_input(&[0x01, 0x00, 0x12, 0x34, 0x56]).unwrap();
    assert_eq!(
        state,
        ControlState {
            switches: [false; 4],
            x: 1042,
            y: 1379,
        }
    );
}

#[test]
fn test_full_scale_report() {
    let state = parse_input(&[0x01, 0x0F, 0xFF, 0xFF, 0xFF]).unwrap();
    assert_eq!(state.switches, [true; 4]);
    assert_eq!(state.x, AXIS_MAX);
    assert_eq!(state.y, AXIS_MAX);
}

#[test]
fn test_single_switches() {
    for n in 1..=4usize {
        let mask = 1u8 << (n - 1);
        let state = parse_input(&[0x01, mask, 0, 0, 0]).unwrap();
        for other in 1..=4 {
            assert_eq!(state.switch(other), other == n);
        }
    }
}

#[test]
fn test_padded_read_buffer() {
    // hidapi hands back the whole input buffer; only the first report counts
    let mut buf = vec![0u8; 64];
    buf[..INPUT_REPORT_LEN].copy_from_slice(&[0x01, 0x02, 0x00, 0x08, 0x80]);
    let state = parse_input(&buf).unwrap();
    assert!(state.switch(2));
    assert_eq!(state.x, 0x800);
    assert_eq!(state.y, 0x800);
}

#[test]
fn test_truncated_reads_rejected() {
    for len in 0..INPUT_REPORT_LEN {
        assert_eq!(parse_input(&vec![0x01; len]), None, "len {}", len);
    }
}

#[test]
fn test_led_reports() {
    let expected = [
        (LedCommand::Off, [0x01, 0x00]),
        (LedCommand::On, [0x01, 0x01]),
        (LedCommand::Blink, [0x01, 0x02]),
        (LedCommand::FlashRight, [0x01, 0x03]),
        (LedCommand::FlashLeft, [0x01, 0x83]),
    ];
    for (command, bytes) in expected {
        assert_eq!(build_set_led(command, 2), bytes.to_vec(), "{}", command);
    }
}

#[test]
fn test_led_report_padding() {
    let report = encode_led(REPORT_ID_LED, LedCommand::Blink, 8);
    assert_eq!(report, vec![0x01, 0x02, 0, 0, 0, 0, 0, 0]);
    assert_eq!(format_report(&report), "01 02");

    // Devices reporting a zero-length output report still get id + command
    assert_eq!(encode_led(REPORT_ID_LED, LedCommand::On, 0), vec![0x01, 0x01]);
}

#[test]
fn test_led_command_names() {
    assert_eq!("blink".parse::<LedCommand>(), Ok(LedCommand::Blink));
    assert_eq!("Flash-Left".parse::<LedCommand>(), Ok(LedCommand::FlashLeft));
    assert_eq!("0x83".parse::<LedCommand>(), Ok(LedCommand::FlashLeft));
    assert!("0x04".parse::<LedCommand>().is_err());
    assert!("dim".parse::<LedCommand>().is_err());

    for command in LedCommand::ALL {
        assert_eq!(LedCommand::from_code(command.code()), Some(command));
    }
}
