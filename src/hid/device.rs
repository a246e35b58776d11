//! HID device connection lifecycle management

use super::commands::{build_set_led, LedCommand};
use super::error::{DeviceError, TransportError};
use super::hotplug::PresenceResync;
use super::protocol::{format_report, INPUT_REPORT_LEN};
use super::reader::{run_read_loop, ReadOutcome};
use super::transport::{DeviceDescriptor, DeviceIdentity, HidStream, HidTransport};
use crate::core::config::HidConfig;
use crate::core::events::{AppEvent, EventSender};
use crate::core::state::{ConnectionStatus, ControlState, DeviceLabel};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Why a session is being torn down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The device disappeared from the device list
    Unplugged,
    /// A different interface with the same identity took its place
    Replaced,
    /// The read loop hit an I/O error
    ReadError(String),
    /// An LED write failed
    WriteError(String),
    /// Application shutdown
    Shutdown,
}

/// One open connection to the pad
struct Session<S> {
    generation: u64,
    device: DeviceDescriptor,
    stream: Arc<S>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Values last pushed to the state sink
#[derive(Default)]
struct Published {
    status: ConnectionStatus,
    control: ControlState,
    device: Option<DeviceLabel>,
    /// Generation of the session allowed to publish reports
    live_generation: Option<u64>,
}

struct Shared<T: HidTransport> {
    transport: Arc<T>,
    identity: DeviceIdentity,
    events: EventSender,
    shutdown_timeout: Duration,
    initial_led: Option<LedCommand>,
    resync: Option<PresenceResync>,
    /// Every session transition and every write happens under this lock
    session: tokio::sync::Mutex<Option<Session<T::Stream>>>,
    published: Mutex<Published>,
    next_generation: AtomicU64,
}

/// Manager for the connection to the AMIO pad.
///
/// Owns at most one session. Presence changes, LED writes and teardown are
/// serialized on one async lock; the per-session read task only takes that
/// lock to tear down its own session after a read failure.
pub struct HidManager<T: HidTransport> {
    shared: Arc<Shared<T>>,
}

impl<T: HidTransport> Clone for HidManager<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: HidTransport> HidManager<T> {
    /// Create a manager. No device is opened until `on_presence_changed`.
    pub fn new(transport: Arc<T>, config: &HidConfig, events: EventSender) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport,
                identity: config.identity(),
                events,
                shutdown_timeout: config.shutdown_timeout(),
                initial_led: None,
                resync: None,
                session: tokio::sync::Mutex::new(None),
                published: Mutex::new(Published::default()),
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    /// Send `command` right after every successful connect
    pub fn with_initial_led(mut self, command: Option<LedCommand>) -> Self {
        match Arc::get_mut(&mut self.shared) {
            Some(shared) => shared.initial_led = command,
            None => warn!("Initial LED ignored: manager already shared"),
        }
        self
    }

    /// Ask the presence watcher for a fresh notification whenever a session
    /// is lost to an I/O error
    pub fn with_presence_resync(mut self, resync: PresenceResync) -> Self {
        match Arc::get_mut(&mut self.shared) {
            Some(shared) => shared.resync = Some(resync),
            None => warn!("Presence resync ignored: manager already shared"),
        }
        self
    }

    pub fn identity(&self) -> DeviceIdentity {
        self.shared.identity
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.published.lock().status.clone()
    }

    pub fn control_state(&self) -> ControlState {
        self.shared.published.lock().control
    }

    pub fn device_label(&self) -> Option<DeviceLabel> {
        self.shared.published.lock().device.clone()
    }

    /// Check if device is connected
    pub fn is_connected(&self) -> bool {
        self.shared.published.lock().status.is_connected()
    }

    /// React to a system-wide HID attach/detach notification.
    ///
    /// Connects when the pad appeared, disconnects when it vanished, and does
    /// nothing when the live session's device is still present.
    pub async fn on_presence_changed(&self) {
        let mut slot = self.shared.session.lock().await;

        // hidapi refreshes its device list with blocking OS calls
        let transport = Arc::clone(&self.shared.transport);
        let identity = self.shared.identity;
        let found = tokio::task::spawn_blocking(move || transport.find(identity))
            .await
            .map_err(TransportError::from)
            .and_then(|found| found);
        let found = match found {
            Ok(found) => found,
            Err(e) => {
                warn!("Failed to enumerate HID devices: {}", e);
                if slot.is_none() {
                    self.shared.reset(ConnectionStatus::Error {
                        reason: e.to_string(),
                    });
                }
                return;
            }
        };

        let current_path = slot.as_ref().map(|s| s.device.path.clone());
        match (found, current_path) {
            (Some(device), None) => {
                if let Err(e) = self.shared.connect_locked(&mut slot, device) {
                    warn!("Connect failed: {}", e);
                }
            }
            (None, Some(_)) => {
                self.shared
                    .teardown_now(&mut slot, DisconnectReason::Unplugged);
            }
            (Some(device), Some(path)) if device.path != path => {
                info!("Device replaced ({} -> {})", path, device.path);
                self.shared
                    .teardown_now(&mut slot, DisconnectReason::Replaced);
                if let Err(e) = self.shared.connect_locked(&mut slot, device) {
                    warn!("Connect failed: {}", e);
                }
            }
            (Some(_), Some(_)) => debug!("Device still present, session kept"),
            (None, None) => debug!("Device not present ({})", self.shared.identity),
        }
    }

    /// Open `device` and start its read loop, replacing any live session.
    ///
    /// Returns `Ok` only if the session is live afterwards, so a failed
    /// initial LED command is reported here.
    pub async fn connect(&self, device: DeviceDescriptor) -> Result<(), DeviceError> {
        let mut slot = self.shared.session.lock().await;
        if slot.is_some() {
            self.shared
                .teardown_now(&mut slot, DisconnectReason::Replaced);
        }
        self.shared.connect_locked(&mut slot, device)
    }

    /// Tear down the live session without waiting for its read task.
    ///
    /// Returns false when there was nothing to disconnect.
    pub async fn disconnect_now(&self, reason: DisconnectReason) -> bool {
        let mut slot = self.shared.session.lock().await;
        self.shared.teardown_now(&mut slot, reason)
    }

    /// Tear down the live session, giving its read task a bounded chance to finish.
    ///
    /// Waits at most the configured shutdown timeout, then closes the stream
    /// whether or not the task stopped.
    pub async fn shutdown(&self) {
        let mut slot = self.shared.session.lock().await;
        let Some(session) = slot.take() else {
            debug!("Shutdown: no live session");
            return;
        };
        let Session {
            generation,
            device,
            stream,
            cancel,
            task,
        } = session;

        cancel.cancel();
        self.shared.retire(generation);

        match tokio::time::timeout(self.shared.shutdown_timeout, task).await {
            Ok(Ok(())) => debug!("Read task for session {} finished", generation),
            Ok(Err(e)) => warn!("Read task for session {} ended abnormally: {}", generation, e),
            Err(_) => warn!(
                "Read task for session {} did not stop within {:?}, closing anyway",
                generation, self.shared.shutdown_timeout
            ),
        }
        drop(cancel);

        stream.close();
        self.shared.reset(ConnectionStatus::Disconnected);
        info!(
            "Disconnected from {} ({:?})",
            device.label(),
            DisconnectReason::Shutdown
        );
    }

    /// Send an LED command to the connected pad.
    ///
    /// A failed write tears the session down and is returned to the caller.
    pub async fn send_led(&self, command: LedCommand) -> Result<(), DeviceError> {
        let mut slot = self.shared.session.lock().await;
        self.shared.write_led_locked(&mut slot, command)
    }
}

impl<T: HidTransport> Shared<T> {
    fn connect_locked(
        self: &Arc<Self>,
        slot: &mut Option<Session<T::Stream>>,
        device: DeviceDescriptor,
    ) -> Result<(), DeviceError> {
        debug_assert!(slot.is_none());
        info!(
            "Found device: {} ({}, {})",
            device.label(),
            device.identity,
            device.path
        );
        self.publish_status(ConnectionStatus::Connecting);

        let stream = match self.transport.open(&device) {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Failed to open HID device: {}", e);
                self.reset(ConnectionStatus::OpenFailed {
                    reason: e.to_string(),
                });
                return Err(DeviceError::OpenFailed(e));
            }
        };

        if device.max_input_report_len < INPUT_REPORT_LEN {
            let reason = format!(
                "input report length {} is shorter than {} bytes",
                device.max_input_report_len, INPUT_REPORT_LEN
            );
            error!("Unusable device: {}", reason);
            stream.close();
            self.reset(ConnectionStatus::Error {
                reason: reason.clone(),
            });
            return Err(DeviceError::Setup(reason));
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let label = device.label();
        let stream = Arc::new(stream);
        let cancel = CancellationToken::new();

        // Publish before spawning so the first report is accepted
        {
            let mut published = self.published.lock();
            published.live_generation = Some(generation);
            published.device = Some(label.clone());
            published.status = ConnectionStatus::Connected {
                manufacturer: label.manufacturer.clone(),
                product: label.product.clone(),
            };
            let _ = self.events.send(AppEvent::DeviceInfoChanged(Some(label.clone())));
            let _ = self
                .events
                .send(AppEvent::StatusChanged(published.status.clone()));
        }

        // The task only holds a weak reference so dropping the manager ends the session
        let task = tokio::spawn({
            let shared = Arc::downgrade(self);
            let stream = Arc::clone(&stream);
            let cancel = cancel.clone();
            let input_len = device.max_input_report_len;
            async move {
                let outcome = run_read_loop(&*stream, input_len, &cancel, |state| {
                    shared
                        .upgrade()
                        .is_some_and(|shared| shared.publish_control(generation, state))
                })
                .await;
                match outcome {
                    ReadOutcome::Cancelled => {
                        debug!("Read loop for session {} stopped", generation)
                    }
                    ReadOutcome::Failed(e) => {
                        if let Some(shared) = shared.upgrade() {
                            shared.fail_session(generation, &cancel, e).await;
                        }
                    }
                }
            }
        });

        *slot = Some(Session {
            generation,
            device,
            stream,
            cancel,
            task,
        });
        info!("Connected to {} (session {})", label, generation);

        if let Some(command) = self.initial_led {
            if let Err(e) = self.write_led_locked(slot, command) {
                warn!("Initial LED command failed: {}", e);
                return Err(e);
            }
        }
        Ok(())
    }

    fn write_led_locked(
        &self,
        slot: &mut Option<Session<T::Stream>>,
        command: LedCommand,
    ) -> Result<(), DeviceError> {
        let Some(session) = slot.as_ref() else {
            debug!("LED command {} dropped: no session", command);
            return Err(DeviceError::NotConnected);
        };
        if !self.published.lock().status.is_connected() {
            return Err(DeviceError::NotConnected);
        }

        let report = build_set_led(command, session.device.max_output_report_len);
        let result = session
            .stream
            .write(&report)
            .and_then(|_| session.stream.flush());

        match result {
            Ok(()) => {
                let raw = format_report(&report);
                info!("LED command sent: {} [{}]", command, raw);
                let _ = self.events.send(AppEvent::LedCommandSent { command, raw });
                Ok(())
            }
            Err(e) => {
                warn!("LED command {} failed: {}", command, e);
                self.teardown_now(slot, DisconnectReason::WriteError(e.to_string()));
                Err(DeviceError::Write(e))
            }
        }
    }

    /// Called by a read task whose stream failed
    async fn fail_session(
        &self,
        generation: u64,
        cancel: &CancellationToken,
        e: TransportError,
    ) {
        let e = DeviceError::Read(e);
        warn!("Session {}: {}", generation, e);
        tokio::select! {
            biased;
            // Someone else is already tearing this session down
            _ = cancel.cancelled() => debug!("Session {} already closing", generation),
            mut slot = self.session.lock() => {
                if slot.as_ref().is_some_and(|s| s.generation == generation) {
                    self.teardown_now(&mut slot, DisconnectReason::ReadError(e.to_string()));
                }
            }
        }
    }

    /// Best-effort teardown: cancel, close and reset without awaiting the read task
    fn teardown_now(&self, slot: &mut Option<Session<T::Stream>>, reason: DisconnectReason) -> bool {
        let Some(session) = slot.take() else {
            return false;
        };

        session.cancel.cancel();
        self.retire(session.generation);
        // Dropping the handle detaches the task; it exits at its next await
        drop(session.task);
        session.stream.close();

        self.reset(ConnectionStatus::Disconnected);
        info!("Disconnected from {} ({:?})", session.device.label(), reason);

        // The device may come back at the same path before the next poll
        if matches!(
            reason,
            DisconnectReason::ReadError(_) | DisconnectReason::WriteError(_)
        ) {
            if let Some(resync) = &self.resync {
                resync.request();
            }
        }
        true
    }

    /// Stop accepting reports from `generation`
    fn retire(&self, generation: u64) {
        let mut published = self.published.lock();
        if published.live_generation == Some(generation) {
            published.live_generation = None;
        }
    }

    /// Publish a decoded report if `generation` is still the live session
    fn publish_control(&self, generation: u64, state: ControlState) -> bool {
        let mut published = self.published.lock();
        if published.live_generation != Some(generation) {
            return false;
        }
        published.control = state;
        let _ = self.events.send(AppEvent::ControlChanged(state));
        true
    }

    fn publish_status(&self, status: ConnectionStatus) {
        let mut published = self.published.lock();
        published.status = status.clone();
        let _ = self.events.send(AppEvent::StatusChanged(status));
    }

    /// Move to `status` with no session: controls zeroed, device info cleared
    fn reset(&self, status: ConnectionStatus) {
        let mut published = self.published.lock();
        published.live_generation = None;
        published.status = status.clone();
        published.control = ControlState::default();
        published.device = None;
        let _ = self.events.send(AppEvent::StatusChanged(status));
        let _ = self
            .events
            .send(AppEvent::ControlChanged(ControlState::default()));
        let _ = self.events.send(AppEvent::DeviceInfoChanged(None));
    }
}

impl<T: HidTransport> Drop for Shared<T> {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.cancel.cancel();
            session.stream.close();
            debug!("Session {} closed on drop", session.generation);
        }
    }
}
