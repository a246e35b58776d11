//! Published device state

use std::fmt;

/// Largest value a 12-bit stick axis can take
pub const AXIS_MAX: u16 = 0x0FFF;

/// Decoded snapshot of the pad's switches and stick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlState {
    /// SW1..SW4, index 0 is SW1
    pub switches: [bool; 4],
    /// Stick X axis (0..=4095)
    pub x: u16,
    /// Stick Y axis (0..=4095)
    pub y: u16,
}

impl ControlState {
    /// State of switch `n` (1-based, SW1..SW4)
    pub fn switch(&self, n: usize) -> bool {
        n.checked_sub(1)
            .and_then(|i| self.switches.get(i))
            .copied()
            .unwrap_or(false)
    }

    /// True when nothing is pressed and the stick reads zero
    pub fn is_reset(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, on) in self.switches.iter().enumerate() {
            write!(f, "SW{}={} ", i + 1, if *on { "ON " } else { "off" })?;
        }
        write!(f, "X={:4} Y={:4}", self.x, self.y)
    }
}

/// Manufacturer/product strings of the connected device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLabel {
    pub manufacturer: String,
    pub product: String,
}

impl fmt::Display for DeviceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.manufacturer, self.product)
    }
}

/// How the presentation layer should colour a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Neutral,
    Success,
    Warning,
    Failure,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Severity::Neutral => "..",
            Severity::Success => "ok",
            Severity::Warning => "!!",
            Severity::Failure => "xx",
        };
        f.write_str(tag)
    }
}

/// Connection status of the pad, driven by the HID manager
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected { manufacturer: String, product: String },
    OpenFailed { reason: String },
    Error { reason: String },
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected { .. })
    }

    pub fn severity(&self) -> Severity {
        match self {
            ConnectionStatus::Disconnected => Severity::Warning,
            ConnectionStatus::Connecting => Severity::Neutral,
            ConnectionStatus::Connected { .. } => Severity::Success,
            ConnectionStatus::OpenFailed { .. } | ConnectionStatus::Error { .. } => {
                Severity::Failure
            }
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => f.write_str("Device not connected"),
            ConnectionStatus::Connecting => f.write_str("Connecting..."),
            ConnectionStatus::Connected {
                manufacturer,
                product,
            } => write!(f, "Connected: {} {}", manufacturer, product),
            ConnectionStatus::OpenFailed { reason } => {
                write!(f, "Failed to open device: {}", reason)
            }
            ConnectionStatus::Error { reason } => write!(f, "Error: {}", reason),
        }
    }
}
