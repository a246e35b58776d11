//! Per-session input report loop

use super::error::TransportError;
use super::protocol::parse_input;
use super::transport::HidStream;
use crate::core::state::ControlState;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Why a read loop stopped
#[derive(Debug)]
pub enum ReadOutcome {
    /// Cancelled, or the session it served is no longer live
    Cancelled,
    /// The stream failed; the session must be torn down
    Failed(TransportError),
}

/// Read reports from `stream` until cancelled or the stream fails.
///
/// Each decoded report is handed to `on_state`; returning `false` from it
/// stops the loop. The pending read is the only await point and is raced
/// against `cancel`.
pub async fn run_read_loop<S, F>(
    stream: &S,
    input_len: usize,
    cancel: &CancellationToken,
    mut on_state: F,
) -> ReadOutcome
where
    S: HidStream,
    F: FnMut(ControlState) -> bool,
{
    loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => return ReadOutcome::Cancelled,
            read = stream.read_report(input_len) => read,
        };

        match read {
            Ok(report) if report.is_empty() => continue,
            Ok(report) => match parse_input(&report) {
                Some(state) => {
                    if !on_state(state) {
                        return ReadOutcome::Cancelled;
                    }
                }
                None => debug!("Ignoring short input report ({} bytes)", report.len()),
            },
            // A stream closed by teardown fails its pending read; that is not a fault
            Err(_) if cancel.is_cancelled() => return ReadOutcome::Cancelled,
            Err(e) => return ReadOutcome::Failed(e),
        }
    }
}
