//! AMIO Pad companion
//!
//! Connects to the AMIO gamepad test board over USB HID.
//!
//! # Features
//! - Decodes the pad's input reports into switch (SW1-SW4) and stick (X/Y) state
//! - Sends LED commands (off, on, blink, flash right/left)
//! - Follows the device through unplug/replug without leaking handles or tasks
//! - Publishes every state change on a single ordered event channel

pub mod core;
pub mod hid;

pub use self::core::config::Config;
pub use self::core::events::{AppEvent, EventSender};
pub use self::core::state::{ConnectionStatus, ControlState, DeviceLabel, Severity};
pub use hid::{HidManager, LedCommand};
