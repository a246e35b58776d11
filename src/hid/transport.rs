//! Transport seam between the HID manager and the platform HID stack
//!
//! `HidTransport` enumerates and opens devices, `HidStream` is one open device.
//! The production implementation lives in `backend` (hidapi); tests use `mock`.

use super::error::TransportError;
use crate::core::state::DeviceLabel;
use std::fmt;
use std::future::Future;

/// Fallback for missing manufacturer/product strings
pub const UNKNOWN: &str = "unknown";

/// USB vendor/product pair identifying the pad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceIdentity {
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VID: 0x{:04X}, PID: 0x{:04X}", self.vendor_id, self.product_id)
    }
}

/// An enumerated (not yet opened) HID device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Platform path, unique per attached interface
    pub path: String,
    pub identity: DeviceIdentity,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    /// Largest input report, including the report id byte
    pub max_input_report_len: usize,
    /// Largest output report, including the report id byte
    pub max_output_report_len: usize,
}

impl DeviceDescriptor {
    /// Manufacturer/product strings, "unknown" where the device reports none
    pub fn label(&self) -> DeviceLabel {
        DeviceLabel {
            manufacturer: self.manufacturer.as_deref().unwrap_or(UNKNOWN).to_string(),
            product: self.product.as_deref().unwrap_or(UNKNOWN).to_string(),
        }
    }
}

/// An open, bidirectional report stream.
///
/// Reads and writes may be issued concurrently from different tasks; an
/// implementation that cannot interleave them must serialize internally.
pub trait HidStream: Send + Sync + 'static {
    /// Read one report of at most `max_len` bytes.
    ///
    /// An empty buffer means nothing arrived (e.g. a poll timeout). Once the
    /// stream is closed this resolves to `TransportError::Closed`.
    fn read_report(
        &self,
        max_len: usize,
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;

    /// Write one complete output report
    fn write(&self, report: &[u8]) -> Result<usize, TransportError>;

    fn flush(&self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Release the underlying handle. Calling it again is a no-op.
    fn close(&self);
}

/// Platform HID capability: discovery and open
pub trait HidTransport: Send + Sync + 'static {
    type Stream: HidStream;

    /// Every HID interface currently attached, system-wide
    fn enumerate(&self) -> Result<Vec<DeviceDescriptor>, TransportError>;

    /// First attached interface matching `identity`
    fn find(&self, identity: DeviceIdentity) -> Result<Option<DeviceDescriptor>, TransportError> {
        Ok(self
            .enumerate()?
            .into_iter()
            .find(|d| d.identity == identity))
    }

    fn open(&self, device: &DeviceDescriptor) -> Result<Self::Stream, TransportError>;
}
