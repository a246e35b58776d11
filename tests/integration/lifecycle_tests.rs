//! Connection lifecycle driven by the presence watcher

use amio_pad::core::config::HidConfig;
use amio_pad::hid::mock::MockTransport;
use amio_pad::hid::{HidManager, LedCommand, PresenceChanged, PresenceWatcher};
use amio_pad::{AppEvent, ConnectionStatus, ControlState, EventSender};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const POLL: Duration = Duration::from_millis(20);

struct Rig {
    transport: Arc<MockTransport>,
    manager: HidManager<MockTransport>,
    watcher: PresenceWatcher,
    presence: mpsc::UnboundedReceiver<PresenceChanged>,
    events: mpsc::UnboundedReceiver<AppEvent>,
}

impl Rig {
    fn new() -> Self {
        let config = HidConfig {
            poll_interval_ms: POLL.as_millis() as u64,
            ..HidConfig::default()
        };
        let transport = Arc::new(MockTransport::new());
        let (tx, presence) = mpsc::unbounded_channel();
        let watcher = PresenceWatcher::spawn(Arc::clone(&transport), config.poll_interval(), tx);
        let (sender, events) = EventSender::channel();
        let manager = HidManager::new(Arc::clone(&transport), &config, sender)
            .with_presence_resync(watcher.resync_handle());
        Self {
            transport,
            manager,
            watcher,
            presence,
            events,
        }
    }

    /// Forward presence notifications to the manager until `status` is published
    async fn until_status(&mut self, status: ConnectionStatus) {
        let wait = async {
            loop {
                tokio::select! {
                    Some(_) = self.presence.recv() => self.manager.on_presence_changed().await,
                    Some(event) = self.events.recv() => {
                        if event == AppEvent::StatusChanged(status.clone()) {
                            return;
                        }
                    }
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(2), wait)
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {:?}", status));
    }

    async fn until_control(&mut self, want: ControlState) {
        let wait = async {
            while let Some(event) = self.events.recv().await {
                if event == AppEvent::ControlChanged(want) {
                    return;
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(2), wait)
            .await
            .expect("timed out waiting for control state");
    }
}

fn connected() -> ConnectionStatus {
    ConnectionStatus::Connected {
        manufacturer: "STMicroelectronics".to_string(),
        product: "AMIO GamePad".to_string(),
    }
}

#[tokio::test]
async fn test_plug_report_unplug_replug() {
    let mut rig = Rig::new();
    let pad = MockTransport::descriptor("pad-1", rig.manager.identity());

    rig.transport.plug(pad.clone());
    rig.until_status(connected()).await;

    rig.transport.push_read(&[0x01, 0x03, 0x12, 0x34, 0x56]);
    rig.until_control(ControlState {
        switches: [true, true, false, false],
        x: 1042,
        y: 1379,
    })
    .await;

    rig.manager.send_led(LedCommand::Blink).await.unwrap();
    assert_eq!(rig.transport.writes(), vec![vec![0x01, 0x02]]);

    rig.transport.unplug("pad-1");
    rig.until_status(ConnectionStatus::Disconnected).await;
    assert!(rig.manager.control_state().is_reset());
    assert_eq!(rig.manager.device_label(), None);
    assert!(rig.manager.send_led(LedCommand::On).await.is_err());

    rig.transport.plug(pad);
    rig.until_status(connected()).await;
    assert_eq!(rig.transport.open_count(), 2);
    assert_eq!(rig.transport.close_count(), 1);

    rig.manager.shutdown().await;
    rig.watcher.stop().await;
    assert_eq!(rig.transport.close_count(), 2);
    assert_eq!(rig.manager.status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn test_read_failure_recovers_on_next_presence_change() {
    let mut rig = Rig::new();
    rig.transport
        .plug(MockTransport::descriptor("pad-1", rig.manager.identity()));
    rig.until_status(connected()).await;

    rig.transport.push_read_error("pipe stalled");
    rig.until_status(ConnectionStatus::Disconnected).await;

    // The device list did not change, so the watcher stays quiet
    tokio::time::sleep(POLL * 5).await;
    assert!(rig.presence.try_recv().is_err());
    assert_eq!(rig.manager.status(), ConnectionStatus::Disconnected);

    // The pad is still listed: the next presence check reconnects
    rig.manager.on_presence_changed().await;
    assert_eq!(rig.manager.status(), connected());

    rig.manager.shutdown().await;
    rig.watcher.stop().await;
}

#[tokio::test]
async fn test_replug_at_same_path_between_polls() {
    let mut rig = Rig::new();
    let pad = MockTransport::descriptor("hidraw3", rig.manager.identity());
    rig.transport.plug(pad.clone());
    rig.until_status(connected()).await;

    // Pulled and reinserted faster than the poll interval; hidraw node reused
    rig.transport.unplug("hidraw3");
    rig.transport.push_read_error("device removed");
    rig.transport.plug(pad);

    rig.until_status(ConnectionStatus::Disconnected).await;
    rig.until_status(connected()).await;
    assert_eq!(rig.transport.open_count(), 2);
    assert_eq!(rig.transport.close_count(), 1);

    rig.manager.shutdown().await;
    rig.watcher.stop().await;
}
