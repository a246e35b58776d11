//! HID error types

use thiserror::Error;

/// Failure reported by a transport (enumeration, open, read or write)
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HID I/O error: {0}")]
    Io(String),

    #[error("HID stream is closed")]
    Closed,

    #[error(transparent)]
    Hid(#[from] hidapi::HidError),

    #[error("HID read task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Errors surfaced by `HidManager`
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device not connected")]
    NotConnected,

    #[error("failed to open device: {0}")]
    OpenFailed(#[source] TransportError),

    #[error("read from device failed: {0}")]
    Read(#[source] TransportError),

    #[error("write to device failed: {0}")]
    Write(#[source] TransportError),

    #[error("device setup failed: {0}")]
    Setup(String),
}
