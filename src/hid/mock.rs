//! Scriptable in-memory transport for tests and hardware-free runs

use super::error::TransportError;
use super::transport::{DeviceDescriptor, DeviceIdentity, HidStream, HidTransport};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// One scripted read result
pub type MockRead = Result<Vec<u8>, String>;

#[derive(Default)]
struct MockState {
    devices: Vec<DeviceDescriptor>,
    open_error: Option<String>,
    write_error: Option<String>,
    enumerate_error: Option<String>,
    writes: Vec<Vec<u8>>,
    opens: usize,
    closes: usize,
    read_tx: Option<mpsc::UnboundedSender<MockRead>>,
}

/// Transport whose devices, failures and incoming reports are set by the caller.
///
/// Each `open` creates a fresh read queue; `push_read` feeds the most recently
/// opened stream. A stream with an empty queue blocks until cancelled.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor for a pad at `path` with the given identity
    pub fn descriptor(path: &str, identity: DeviceIdentity) -> DeviceDescriptor {
        DeviceDescriptor {
            path: path.to_string(),
            identity,
            manufacturer: Some("STMicroelectronics".to_string()),
            product: Some("AMIO GamePad".to_string()),
            max_input_report_len: 64,
            max_output_report_len: 2,
        }
    }

    /// Attach a device
    pub fn plug(&self, device: DeviceDescriptor) {
        self.state.lock().devices.push(device);
    }

    /// Detach the device at `path`
    pub fn unplug(&self, path: &str) {
        self.state.lock().devices.retain(|d| d.path != path);
    }

    pub fn set_open_error(&self, error: Option<&str>) {
        self.state.lock().open_error = error.map(str::to_string);
    }

    pub fn set_write_error(&self, error: Option<&str>) {
        self.state.lock().write_error = error.map(str::to_string);
    }

    pub fn set_enumerate_error(&self, error: Option<&str>) {
        self.state.lock().enumerate_error = error.map(str::to_string);
    }

    /// Queue a report for the open stream. Returns false if none is open.
    pub fn push_read(&self, report: &[u8]) -> bool {
        self.push(Ok(report.to_vec()))
    }

    /// Make the open stream's next read fail
    pub fn push_read_error(&self, message: &str) -> bool {
        self.push(Err(message.to_string()))
    }

    fn push(&self, read: MockRead) -> bool {
        self.state
            .lock()
            .read_tx
            .as_ref()
            .is_some_and(|tx| tx.send(read).is_ok())
    }

    /// Every report written so far
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().writes.clone()
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().opens
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().closes
    }
}

impl HidTransport for MockTransport {
    type Stream = MockStream;

    fn enumerate(&self) -> Result<Vec<DeviceDescriptor>, TransportError> {
        let state = self.state.lock();
        match &state.enumerate_error {
            Some(message) => Err(TransportError::Io(message.clone())),
            None => Ok(state.devices.clone()),
        }
    }

    fn open(&self, device: &DeviceDescriptor) -> Result<MockStream, TransportError> {
        let mut state = self.state.lock();
        if let Some(message) = &state.open_error {
            return Err(TransportError::Io(message.clone()));
        }
        if !state.devices.iter().any(|d| d.path == device.path) {
            return Err(TransportError::Io(format!("no device at {}", device.path)));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let tx_for_stream = tx.clone();
        state.read_tx = Some(tx);
        state.opens += 1;

        Ok(MockStream {
            transport: Arc::clone(&self.state),
            read_tx: tx_for_stream,
            reads: Arc::new(tokio::sync::Mutex::new(rx)),
            closed: AtomicBool::new(false),
        })
    }
}

/// Stream handed out by `MockTransport::open`
pub struct MockStream {
    transport: Arc<Mutex<MockState>>,
    read_tx: mpsc::UnboundedSender<MockRead>,
    reads: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<MockRead>>>,
    closed: AtomicBool,
}

impl HidStream for MockStream {
    fn read_report(
        &self,
        _max_len: usize,
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send {
        let closed = self.closed.load(Ordering::SeqCst);
        let reads = Arc::clone(&self.reads);

        async move {
            if closed {
                return Err(TransportError::Closed);
            }
            let next = reads.lock().await.recv().await;
            match next {
                Some(Ok(report)) => Ok(report),
                Some(Err(message)) => Err(TransportError::Io(message)),
                // Queue dropped: behave like a read that never returns
                None => std::future::pending().await,
            }
        }
    }

    fn write(&self, report: &[u8]) -> Result<usize, TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        let mut state = self.transport.lock();
        if let Some(message) = &state.write_error {
            return Err(TransportError::Io(message.clone()));
        }
        state.writes.push(report.to_vec());
        Ok(report.len())
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let mut state = self.transport.lock();
            state.closes += 1;
            if state
                .read_tx
                .as_ref()
                .is_some_and(|tx| tx.same_channel(&self.read_tx))
            {
                state.read_tx = None;
            }
        }
    }
}
