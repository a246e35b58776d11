//! hidapi-backed transport

use super::error::TransportError;
use super::transport::{DeviceDescriptor, DeviceIdentity, HidStream, HidTransport};
use crate::core::config::HidConfig;
use hidapi::{HidApi, HidDevice};
use parking_lot::Mutex;
use std::ffi::CString;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Transport over the system HID stack via hidapi
pub struct HidapiTransport {
    api: Mutex<HidApi>,
    input_report_len: usize,
    output_report_len: usize,
    read_timeout_ms: i32,
}

impl HidapiTransport {
    pub fn new(config: &HidConfig) -> Result<Self, TransportError> {
        let api = HidApi::new()?;
        Ok(Self {
            api: Mutex::new(api),
            input_report_len: config.input_report_len,
            output_report_len: config.output_report_len,
            read_timeout_ms: read_timeout_ms(config),
        })
    }
}

/// hidapi read timeout in milliseconds; never 0 (non-blocking) or negative (blocking)
fn read_timeout_ms(config: &HidConfig) -> i32 {
    i32::try_from(config.read_timeout().as_millis()).unwrap_or(i32::MAX)
}

impl HidTransport for HidapiTransport {
    type Stream = HidapiStream;

    fn enumerate(&self) -> Result<Vec<DeviceDescriptor>, TransportError> {
        let mut api = self.api.lock();
        api.refresh_devices()?;

        let devices = api
            .device_list()
            .map(|d| DeviceDescriptor {
                path: d.path().to_string_lossy().into_owned(),
                identity: DeviceIdentity::new(d.vendor_id(), d.product_id()),
                manufacturer: d.manufacturer_string().map(str::to_string),
                product: d.product_string().map(str::to_string),
                max_input_report_len: self.input_report_len,
                max_output_report_len: self.output_report_len,
            })
            .collect();
        Ok(devices)
    }

    fn open(&self, device: &DeviceDescriptor) -> Result<HidapiStream, TransportError> {
        let path = CString::new(device.path.as_str())
            .map_err(|e| TransportError::Io(format!("invalid device path: {}", e)))?;

        let handle = self.api.lock().open_path(&path)?;
        info!(
            "Opened device: {} {}",
            device.manufacturer.as_deref().unwrap_or("Unknown"),
            device.product.as_deref().unwrap_or("Unknown")
        );

        Ok(HidapiStream {
            device: Arc::new(Mutex::new(Some(handle))),
            read_timeout_ms: self.read_timeout_ms,
        })
    }
}

/// An open hidapi device.
///
/// hidapi handles are not safe to share across threads, so reads and writes
/// take turns on one mutex. Reads use a short timeout to keep the lock
/// available for writes.
pub struct HidapiStream {
    device: Arc<Mutex<Option<HidDevice>>>,
    read_timeout_ms: i32,
}

impl HidStream for HidapiStream {
    fn read_report(
        &self,
        max_len: usize,
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send {
        let device = Arc::clone(&self.device);
        let timeout_ms = self.read_timeout_ms;

        async move {
            let read = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, TransportError> {
                let guard = device.lock();
                let dev = guard.as_ref().ok_or(TransportError::Closed)?;
                let mut buffer = vec![0u8; max_len];
                let n = dev.read_timeout(&mut buffer, timeout_ms)?;
                buffer.truncate(n);
                Ok(buffer)
            });
            match read.await {
                Ok(result) => result,
                Err(e) => Err(TransportError::Join(e)),
            }
        }
    }

    fn write(&self, report: &[u8]) -> Result<usize, TransportError> {
        let guard = self.device.lock();
        let dev = guard.as_ref().ok_or(TransportError::Closed)?;
        let written = dev.write(report)?;
        debug!("Wrote {} bytes to HID device", written);
        if written < report.len() {
            warn!("Short HID write: {} of {} bytes", written, report.len());
        }
        Ok(written)
    }

    fn close(&self) {
        if self.device.lock().take().is_some() {
            debug!("HID device handle closed");
        }
    }
}
