//! AMIO Pad companion - Entry Point
//!
//! Console front-end: prints connection status and pad state, reads LED
//! commands from stdin, and follows the pad through unplug/replug.

use amio_pad::{
    core::{
        config::Config,
        events::{AppEvent, EventSender},
        state::ControlState,
    },
    hid::{HidManager, HidTransport, HidapiTransport, LedCommand, PresenceWatcher},
};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "amio-pad", about = "AMIO gamepad test board companion")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// USB vendor id, decimal or 0x-prefixed hex
    #[arg(long, value_parser = parse_usb_id)]
    vendor_id: Option<u16>,

    /// USB product id, decimal or 0x-prefixed hex
    #[arg(long, value_parser = parse_usb_id)]
    product_id: Option<u16>,

    /// Run against a simulated pad instead of real hardware
    #[cfg(feature = "mock-hid")]
    #[arg(long)]
    mock: bool,
}

fn parse_usb_id(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid USB id {:?}: {}", s, e))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().context("Failed to load configuration")?,
    };
    if let Some(vendor_id) = cli.vendor_id {
        config.hid.vendor_id = vendor_id;
    }
    if let Some(product_id) = cli.product_id {
        config.hid.product_id = product_id;
    }

    info!("Starting AMIO pad companion ({})", config.hid.identity());

    #[cfg(feature = "mock-hid")]
    if cli.mock {
        let transport = Arc::new(demo::transport(&config));
        let feed = tokio::spawn(demo::feed(Arc::clone(&transport)));
        let result = run(transport, config).await;
        feed.abort();
        return result;
    }

    let transport = HidapiTransport::new(&config.hid).context("Failed to initialize HID API")?;
    run(Arc::new(transport), config).await
}

/// Main event loop: presence notifications, sink events, stdin commands, Ctrl-C
async fn run<T: HidTransport>(transport: Arc<T>, config: Config) -> Result<()> {
    let (presence_tx, mut presence_rx) = mpsc::unbounded_channel();
    let watcher = PresenceWatcher::spawn(
        Arc::clone(&transport),
        config.hid.poll_interval(),
        presence_tx,
    );

    let (event_tx, mut event_rx) = EventSender::channel();
    let manager = HidManager::new(transport, &config.hid, event_tx)
        .with_initial_led(config.ui.initial_led)
        .with_presence_resync(watcher.resync_handle());

    let mut console = Console::default();
    console.print_catalog();
    manager.on_presence_changed().await;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    error!("Failed to listen for Ctrl-C: {}", e);
                }
                info!("Interrupted, shutting down");
                break;
            }
            Some(event) = event_rx.recv() => console.show(event),
            Some(_) = presence_rx.recv() => manager.on_presence_changed().await,
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if !handle_command(&manager, &console, line.trim()).await {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("stdin closed, commands disabled");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    stdin_open = false;
                }
            },
        }
    }

    manager.shutdown().await;
    watcher.stop().await;
    while let Ok(event) = event_rx.try_recv() {
        console.show(event);
    }
    Ok(())
}

/// Handle one stdin line. Returns false when the user asked to quit.
async fn handle_command<T: HidTransport>(
    manager: &HidManager<T>,
    console: &Console,
    line: &str,
) -> bool {
    match line {
        "" => {}
        "q" | "quit" | "exit" => return false,
        "list" | "help" => console.print_catalog(),
        "status" => println!("[{}] {}", manager.status().severity(), manager.status()),
        name => match name.parse::<LedCommand>() {
            Ok(command) => {
                if let Err(e) = manager.send_led(command).await {
                    println!("[xx] LED command failed: {}", e);
                }
            }
            Err(e) => println!("{} (type \"list\" for commands)", e),
        },
    }
    true
}

/// Console presentation of the state sink
#[derive(Default)]
struct Console {
    last_control: Option<ControlState>,
}

impl Console {
    fn show(&mut self, event: AppEvent) {
        match event {
            AppEvent::StatusChanged(status) => println!("[{}] {}", status.severity(), status),
            AppEvent::DeviceInfoChanged(Some(label)) => {
                println!("     Manufacturer: {}", label.manufacturer);
                println!("     Product:      {}", label.product);
            }
            AppEvent::DeviceInfoChanged(None) => {}
            AppEvent::ControlChanged(state) => {
                if self.last_control != Some(state) {
                    self.last_control = Some(state);
                    println!("     {}", state);
                }
            }
            AppEvent::LedCommandSent { command, raw } => {
                println!("     LED command sent: {} ({})", raw, command)
            }
        }
    }

    fn print_catalog(&self) {
        println!("LED commands:");
        for command in LedCommand::ALL {
            println!("  0x{:02X}  {}", command.code(), command.label());
        }
        println!("Type a command name (off, on, blink, right, left), \"status\" or \"quit\".");
    }
}

#[cfg(feature = "mock-hid")]
mod demo {
    //! Simulated pad: one device and a slow stick sweep

    use amio_pad::core::config::Config;
    use amio_pad::hid::mock::MockTransport;
    use std::sync::Arc;
    use std::time::Duration;

    pub fn transport(config: &Config) -> MockTransport {
        let transport = MockTransport::new();
        transport.plug(MockTransport::descriptor("mock-pad", config.hid.identity()));
        transport
    }

    pub async fn feed(transport: Arc<MockTransport>) {
        let mut ticker = tokio::time::interval(Duration::from_millis(100));
        let mut step: u16 = 0;
        loop {
            ticker.tick().await;
            step = step.wrapping_add(64) & 0x0FFF;
            let x = step;
            let y = 0x0FFF - step;
            let switches = ((step >> 9) & 0x0F) as u8;
            let report = [
                0x01,
                switches,
                (x & 0xFF) as u8,
                ((x >> 8) as u8 & 0x0F) | (((y & 0x0F) as u8) << 4),
                (y >> 4) as u8,
            ];
            transport.push_read(&report);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_usb_id() {
        assert_eq!(parse_usb_id("0x0483"), Ok(0x0483));
        assert_eq!(parse_usb_id("0X5750"), Ok(0x5750));
        assert_eq!(parse_usb_id("1155"), Ok(1155));
        assert!(parse_usb_id("0xZZ").is_err());
        assert!(parse_usb_id("70000").is_err());
    }
}
