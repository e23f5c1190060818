//! Library rescan over the signal bus.
//!
//! The subscription is registered before the rescan is triggered, so a
//! scan that finishes quickly cannot emit its done signal unobserved.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::bus::{LibraryBus, ScanKind};
use super::dialog::StatusDialog;
use super::error::{NotifyError, Result};
use super::nickel::DONE_SIGNAL;
use super::{CompletionNotifier, NOTHING_TO_DO};

/// One rescan and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RescanRequest {
    pub kind: ScanKind,
    pub timeout: Duration,
    pub done_signal: String,
}

impl RescanRequest {
    pub fn new(kind: ScanKind, timeout: Duration) -> Self {
        Self {
            kind,
            timeout,
            done_signal: DONE_SIGNAL.to_string(),
        }
    }
}

/// Waits for the first signal on `signals` or for `timeout`, whichever
/// comes first, and returns the time waited.
///
/// The first signal must be `expected`; anything else is an error.
pub async fn wait_for_done<S>(signals: &mut S, expected: &str, timeout: Duration) -> Result<Duration>
where
    S: Stream<Item = String> + Unpin,
{
    let started = Instant::now();

    tokio::select! {
        signal = signals.next() => match signal {
            Some(name) if name == expected => Ok(started.elapsed()),
            Some(name) => Err(NotifyError::UnexpectedSignal {
                expected: expected.to_string(),
                received: name,
            }),
            None => Err(NotifyError::SignalStreamClosed),
        },
        _ = tokio::time::sleep(timeout) => Err(NotifyError::Timeout(timeout)),
    }
}

/// Runs rescans, at most one at a time.
pub struct LibraryRescanner {
    bus: Arc<dyn LibraryBus>,
    in_flight: Mutex<()>,
}

impl LibraryRescanner {
    pub fn new(bus: Arc<dyn LibraryBus>) -> Self {
        Self {
            bus,
            in_flight: Mutex::new(()),
        }
    }

    /// Triggers a rescan and waits for its done signal.
    ///
    /// Fails with [`NotifyError::RescanPending`] while another rescan is
    /// being waited for. The subscription is dropped on every outcome.
    pub async fn rescan(&self, request: &RescanRequest) -> Result<Duration> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| NotifyError::RescanPending)?;

        let mut signals = self.bus.subscribe(&request.done_signal).await?;

        debug!(kind = %request.kind, "Triggering library rescan");
        self.bus.trigger_rescan(request.kind).await?;

        debug!(timeout = ?request.timeout, "Waiting for library rescan to finish");
        wait_for_done(&mut signals, &request.done_signal, request.timeout).await
    }
}

/// Completes a run through the companion service: rescan the library, then
/// tell the user what happened.
pub struct SignalBusNotifier {
    rescanner: LibraryRescanner,
    dialog: StatusDialog,
    kind: ScanKind,
    timeout: Duration,
}

impl SignalBusNotifier {
    pub fn new(
        bus: Arc<dyn LibraryBus>,
        dialog: StatusDialog,
        kind: ScanKind,
        timeout: Duration,
    ) -> Self {
        Self {
            rescanner: LibraryRescanner::new(bus),
            dialog,
            kind,
            timeout,
        }
    }
}

#[async_trait]
impl CompletionNotifier for SignalBusNotifier {
    fn name(&self) -> &'static str {
        "signal-bus"
    }

    async fn complete(&self, processed: usize) -> Result<()> {
        if processed == 0 {
            self.dialog.show(NOTHING_TO_DO, true).await;
            info!("{}", NOTHING_TO_DO);
            return Ok(());
        }

        let request = RescanRequest::new(self.kind, self.timeout);
        match self.rescanner.rescan(&request).await {
            Ok(elapsed) => debug!(elapsed = ?elapsed, "Updated library"),
            Err(e @ NotifyError::Timeout(_)) => warn!(error = %e, "Library rescan did not confirm"),
            Err(e) => error!(error = %e, "Could not update library"),
        }

        let message = format!("Processed {} new ebooks.", processed);
        self.dialog.show(&message, true).await;
        info!("{}", message);
        Ok(())
    }
}
