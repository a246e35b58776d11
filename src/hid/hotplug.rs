//! Polling-based HID hotplug detection
//!
//! hidapi has no attach/detach callbacks, so the device list is polled and a
//! notification is emitted whenever the set of attached interfaces changes.
//! Notifications are coarse: any HID device counts, not just the pad.

use super::transport::HidTransport;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Some HID device was attached or detached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceChanged;

/// Asks a `PresenceWatcher` to notify on its next poll even if nothing changed.
///
/// An unplug and replug between two polls can leave the device list
/// identical (same path), so a session lost to an I/O error must not rely
/// on the list changing.
#[derive(Clone, Default)]
pub struct PresenceResync {
    requested: Arc<AtomicBool>,
}

impl PresenceResync {
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    fn take(&self) -> bool {
        self.requested.swap(false, Ordering::SeqCst)
    }
}

/// Background task polling the transport's device list
pub struct PresenceWatcher {
    cancel: CancellationToken,
    resync: PresenceResync,
    handle: Option<JoinHandle<()>>,
}

impl PresenceWatcher {
    /// Start polling every `interval`.
    ///
    /// The first successful poll always produces a notification.
    pub fn spawn<T: HidTransport>(
        transport: Arc<T>,
        interval: Duration,
        tx: mpsc::UnboundedSender<PresenceChanged>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let resync = PresenceResync::default();
        let handle = tokio::spawn(watch(
            transport,
            interval,
            tx,
            resync.clone(),
            cancel.clone(),
        ));
        Self {
            cancel,
            resync,
            handle: Some(handle),
        }
    }

    /// Handle for forcing a notification on the next poll
    pub fn resync_handle(&self) -> PresenceResync {
        self.resync.clone()
    }

    /// Stop polling and wait for the task to exit
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Presence watcher ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for PresenceWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn watch<T: HidTransport>(
    transport: Arc<T>,
    interval: Duration,
    tx: mpsc::UnboundedSender<PresenceChanged>,
    resync: PresenceResync,
    cancel: CancellationToken,
) {
    info!("HID presence watcher started ({:?} interval)", interval);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last: Option<Vec<String>> = None;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        // Enumeration talks to the OS and may block
        let source = Arc::clone(&transport);
        let snapshot = match tokio::task::spawn_blocking(move || source.enumerate()).await {
            Ok(Ok(devices)) => {
                let mut paths: Vec<String> = devices.into_iter().map(|d| d.path).collect();
                paths.sort();
                paths
            }
            Ok(Err(e)) => {
                debug!("Failed to refresh device list: {}", e);
                continue;
            }
            Err(e) => {
                warn!("Device list task failed: {}", e);
                continue;
            }
        };

        if resync.take() {
            debug!("Resync requested, forgetting previous device list");
            last = None;
        }

        if last.as_ref() != Some(&snapshot) {
            debug!("HID device list changed ({} interfaces)", snapshot.len());
            last = Some(snapshot);
            if tx.send(PresenceChanged).is_err() {
                debug!("Presence receiver dropped");
                break;
            }
        }
    }
    info!("HID presence watcher stopped");
}
