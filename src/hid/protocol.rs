//! HID report layout for the AMIO pad
//!
//! Input report (device -> host), 5 bytes:
//! - byte 0: report id (ignored)
//! - byte 1: switch bitmask, bit0 = SW1 .. bit3 = SW4
//! - bytes 2-4: X and Y packed as two 12-bit values
//!
//! Output report (host -> device): `[0x01, command, 0...]`, see `commands`.

use crate::core::state::ControlState;

/// Bytes needed to decode one input report
pub const INPUT_REPORT_LEN: usize = 5;

/// Report id used for LED control
pub const REPORT_ID_LED: u8 = 0x01;

/// Output reports are never shorter than report id + command
pub const MIN_OUTPUT_REPORT_LEN: usize = 2;

/// Decode one input report.
///
/// Every byte pattern maps to a valid state; both axes stay within 12 bits.
pub fn decode_input(report: &[u8; INPUT_REPORT_LEN]) -> ControlState {
    let [_report_id, switches, b2, b3, b4] = *report;

    let mut state = ControlState::default();
    for (bit, sw) in state.switches.iter_mut().enumerate() {
        *sw = switches & (1 << bit) != 0;
    }
    state.x = u16::from(b2) + u16::from(b3 & 0x0F) * 256;
    state.y = u16::from(b3 >> 4) + u16::from(b4) * 16;
    state
}

/// Decode the first report in `buf`, if it is long enough.
///
/// Reads shorter than five bytes carry no usable stick data and yield `None`.
pub fn parse_input(buf: &[u8]) -> Option<ControlState> {
    let report: &[u8; INPUT_REPORT_LEN] = buf.get(..INPUT_REPORT_LEN)?.try_into().ok()?;
    Some(decode_input(report))
}

/// Hex echo of the report id and command byte, e.g. `"01 02"`
pub fn format_report(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take(MIN_OUTPUT_REPORT_LEN)
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
