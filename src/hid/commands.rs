//! LED command catalog and output report builder

use super::protocol::{MIN_OUTPUT_REPORT_LEN, REPORT_ID_LED};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// LED commands understood by the pad firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum LedCommand {
    Off = 0x00,
    On = 0x01,
    Blink = 0x02,
    FlashRight = 0x03,
    FlashLeft = 0x83,
}

impl LedCommand {
    /// Every command, in menu order
    pub const ALL: [LedCommand; 5] = [
        LedCommand::Off,
        LedCommand::On,
        LedCommand::Blink,
        LedCommand::FlashRight,
        LedCommand::FlashLeft,
    ];

    /// Byte sent on the wire
    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    /// Human-readable name
    pub fn label(&self) -> &'static str {
        match self {
            LedCommand::Off => "Off",
            LedCommand::On => "On",
            LedCommand::Blink => "Blink",
            LedCommand::FlashRight => "Flash (right)",
            LedCommand::FlashLeft => "Flash (left)",
        }
    }
}

impl fmt::Display for LedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown LED command: {0:?}")]
pub struct UnknownLedCommand(pub String);

impl FromStr for LedCommand {
    type Err = UnknownLedCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let by_name = match name.as_str() {
            "off" => Some(LedCommand::Off),
            "on" => Some(LedCommand::On),
            "blink" => Some(LedCommand::Blink),
            "flash-right" | "right" => Some(LedCommand::FlashRight),
            "flash-left" | "left" => Some(LedCommand::FlashLeft),
            _ => name
                .strip_prefix("0x")
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .and_then(LedCommand::from_code),
        };
        by_name.ok_or_else(|| UnknownLedCommand(s.to_string()))
    }
}

/// Build an LED output report padded to the device's output report length.
///
/// The buffer is never shorter than report id + command byte.
pub fn encode_led(report_id: u8, command: LedCommand, output_len: usize) -> Vec<u8> {
    let mut report = vec![0u8; output_len.max(MIN_OUTPUT_REPORT_LEN)];
    report[0] = report_id;
    report[1] = command.code();
    report
}

/// Build an LED report with the fixed LED report id
pub fn build_set_led(command: LedCommand, output_len: usize) -> Vec<u8> {
    encode_led(REPORT_ID_LED, command, output_len)
}
