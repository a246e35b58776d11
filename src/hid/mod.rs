//! HID module - USB HID communication with the AMIO pad

mod backend;
mod commands;
mod device;
pub mod error;
pub mod hotplug;
pub mod protocol;
pub mod reader;
pub mod transport;

#[cfg(any(test, feature = "mock-hid"))]
pub mod mock;

pub use backend::{HidapiStream, HidapiTransport};
pub use commands::{build_set_led, encode_led, LedCommand, UnknownLedCommand};
pub use device::{DisconnectReason, HidManager};
pub use error::{DeviceError, TransportError};
pub use hotplug::{PresenceChanged, PresenceResync, PresenceWatcher};
pub use transport::{DeviceDescriptor, DeviceIdentity, HidStream, HidTransport};
