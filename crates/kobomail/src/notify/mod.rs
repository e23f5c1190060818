//! Post-run notification of the reader software.
//!
//! After the mailbox was processed the reader has to index the new files.
//! With NickelDBus installed this is a library rescan plus dialogs; without
//! it a USB cable connection is simulated. Which of the two is used is
//! decided once per run by [`probe`].

pub mod bus;
pub mod dialog;
pub mod error;
pub mod hotplug;
pub mod nickel;
pub mod rescan;

#[cfg(test)]
pub(crate) mod testing;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::KoboMailConfig;

pub use bus::{LibraryBus, ScanKind};
pub use dialog::StatusDialog;
pub use error::{NotifyError, Result};
pub use hotplug::SimulatedHotplugNotifier;
pub use nickel::NickelBus;
pub use rescan::{wait_for_done, LibraryRescanner, RescanRequest, SignalBusNotifier};

/// Message shown when a run found nothing to download.
pub const NOTHING_TO_DO: &str = "No emails found, nothing to be done.";

/// Final step of a run.
#[async_trait]
pub trait CompletionNotifier: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Called once with the number of files written during the run.
    async fn complete(&self, processed: usize) -> Result<()>;
}

/// What the capability probe found.
#[derive(Clone)]
pub enum Capability {
    /// The companion service is available.
    SignalBus(Arc<dyn LibraryBus>),
    /// Fall back to the hardware status pipe.
    Absent,
}

impl Capability {
    pub fn bus(&self) -> Option<Arc<dyn LibraryBus>> {
        match self {
            Capability::SignalBus(bus) => Some(bus.clone()),
            Capability::Absent => None,
        }
    }
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::SignalBus(_) => f.write_str("SignalBus"),
            Capability::Absent => f.write_str("Absent"),
        }
    }
}

/// Checks once whether NickelDBus can be used.
pub async fn probe() -> Capability {
    match NickelBus::probe().await {
        Some(bus) => Capability::SignalBus(Arc::new(bus)),
        None => Capability::Absent,
    }
}

/// Settings of the notification layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifySettings {
    pub show_notifications: bool,
    pub scan_kind: ScanKind,
    pub rescan_timeout: Duration,
    pub hardware_status_pipe: PathBuf,
}

impl From<&KoboMailConfig> for NotifySettings {
    fn from(config: &KoboMailConfig) -> Self {
        Self {
            show_notifications: config.application_config.show_notifications,
            scan_kind: ScanKind::from_full_rescan(config.processing_config.full_rescan),
            rescan_timeout: config.processing_config.rescan_timeout(),
            hardware_status_pipe: config.application_config.hardware_status_pipe.clone(),
        }
    }
}

/// The dialog and the completion strategy of a run.
pub struct Notification {
    pub dialog: StatusDialog,
    pub notifier: Box<dyn CompletionNotifier>,
}

/// Builds the dialog and picks the notifier for `capability`.
pub fn select_notifier(capability: &Capability, settings: &NotifySettings) -> Notification {
    match capability.bus() {
        Some(bus) => {
            let dialog = StatusDialog::new(Some(bus.clone()), settings.show_notifications);
            let notifier = SignalBusNotifier::new(
                bus,
                dialog.clone(),
                settings.scan_kind,
                settings.rescan_timeout,
            );
            Notification {
                dialog,
                notifier: Box::new(notifier),
            }
        }
        None => Notification {
            dialog: StatusDialog::disabled(),
            notifier: Box::new(SimulatedHotplugNotifier::new(
                settings.hardware_status_pipe.clone(),
            )),
        },
    }
}
