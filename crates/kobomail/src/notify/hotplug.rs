//! Fallback completion by simulating a USB cable.
//!
//! Without the companion service the only way to make the reader index new
//! files is to pretend a computer was plugged in and unplugged again.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use super::error::Result;
use super::{CompletionNotifier, NOTHING_TO_DO};

/// Default location of the reader's hardware status pipe.
pub const DEFAULT_STATUS_PIPE: &str = "/tmp/nickel-hardware-status";

/// Time between plug and unplug, so the user can confirm the connection.
pub const SETTLE_DELAY: Duration = Duration::from_secs(10);

pub const PLUG_ADD: &str = "usb plug add";
pub const PLUG_REMOVE: &str = "usb plug remove";

pub struct SimulatedHotplugNotifier {
    pipe: PathBuf,
    settle_delay: Duration,
}

impl SimulatedHotplugNotifier {
    pub fn new(pipe: impl Into<PathBuf>) -> Self {
        Self {
            pipe: pipe.into(),
            settle_delay: SETTLE_DELAY,
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn pipe(&self) -> &Path {
        &self.pipe
    }
}

/// Writes one event to the status pipe. The pipe must already exist.
fn send_event(pipe: &Path, event: &str) -> Result<()> {
    debug!(pipe = %pipe.display(), event, "Writing hardware status event");
    let mut file = std::fs::OpenOptions::new()
        .read(true)
        .append(true)
        .open(pipe)?;
    file.write_all(event.as_bytes())?;
    Ok(())
}

#[async_trait]
impl CompletionNotifier for SimulatedHotplugNotifier {
    fn name(&self) -> &'static str {
        "simulated-hotplug"
    }

    async fn complete(&self, processed: usize) -> Result<()> {
        if processed == 0 {
            info!("{}", NOTHING_TO_DO);
            return Ok(());
        }

        info!(
            settle_delay = ?self.settle_delay,
            "Simulating plugging USB cable, waiting for the user to click connect"
        );
        send_event(&self.pipe, PLUG_ADD)?;
        tokio::time::sleep(self.settle_delay).await;

        info!("Simulating unplugging USB cable");
        send_event(&self.pipe, PLUG_REMOVE)?;
        Ok(())
    }
}
