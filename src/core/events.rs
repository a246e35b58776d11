//! Events delivered from the HID subsystem to the presentation layer

use super::state::{ConnectionStatus, ControlState, DeviceLabel};
use crate::hid::LedCommand;
use tokio::sync::mpsc;

/// Sender side of the state sink.
///
/// All events travel through one unbounded FIFO channel, so the consumer sees
/// them in publication order and a send never blocks the publisher.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl EventSender {
    pub fn new(tx: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self { tx }
    }

    /// Create a sender together with its receiving end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn send(&self, event: AppEvent) -> Result<(), mpsc::error::SendError<AppEvent>> {
        self.tx.send(event)
    }
}

/// Application-wide events published by the HID manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Connection status transition
    StatusChanged(ConnectionStatus),

    /// Switch/stick state decoded from a report, or reset on disconnect
    ControlChanged(ControlState),

    /// Manufacturer/product of the connected device, `None` once it is gone
    DeviceInfoChanged(Option<DeviceLabel>),

    /// LED command written to the device, with the hex echo of the report
    LedCommandSent { command: LedCommand, raw: String },
}
