//! On-screen status messages.

use std::sync::Arc;

use tracing::{debug, warn};

use super::bus::LibraryBus;

/// Dialog title.
pub const DIALOG_TITLE: &str = "KoboMail";

/// Label of the button added to messages that need acknowledgment.
pub const ACCEPT_LABEL: &str = "OK";

/// Shows progress and results to the user.
///
/// Every call is a no-op when the bus is absent or notifications are
/// disabled. Failed dialog calls are logged and otherwise ignored.
#[derive(Clone)]
pub struct StatusDialog {
    bus: Option<Arc<dyn LibraryBus>>,
}

impl StatusDialog {
    pub fn new(bus: Option<Arc<dyn LibraryBus>>, show_notifications: bool) -> Self {
        Self {
            bus: bus.filter(|_| show_notifications),
        }
    }

    /// A dialog that never shows anything.
    pub fn disabled() -> Self {
        Self { bus: None }
    }

    pub fn is_active(&self) -> bool {
        self.bus.is_some()
    }

    /// Opens a new dialog with `message`.
    pub async fn show(&self, message: &str, confirm: bool) {
        let Some(bus) = &self.bus else {
            return;
        };
        debug!(body = message, confirmation_button = confirm, "Showing dialog");

        if let Err(e) = bus.dialog_create(DIALOG_TITLE, message).await {
            warn!(error = %e, "Could not show dialog");
            return;
        }
        if confirm {
            add_accept(bus.as_ref()).await;
        }
    }

    /// Replaces the message of the open dialog.
    pub async fn update(&self, message: &str, confirm: bool) {
        let Some(bus) = &self.bus else {
            return;
        };
        debug!(body = message, confirmation_button = confirm, "Updating dialog");

        if let Err(e) = bus.dialog_set_body(message).await {
            warn!(error = %e, "Could not update dialog");
            return;
        }
        if confirm {
            add_accept(bus.as_ref()).await;
        }
    }
}

async fn add_accept(bus: &dyn LibraryBus) {
    if let Err(e) = bus.dialog_set_accept(ACCEPT_LABEL).await {
        warn!(error = %e, "Could not add dialog button");
    }
}

impl std::fmt::Debug for StatusDialog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusDialog")
            .field("active", &self.is_active())
            .finish()
    }
}
