//! The signal bus seen from the notifier.

use std::fmt;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use super::error::Result;

/// Which library scan the reader should perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKind {
    /// Only look at files that changed.
    Incremental,
    /// Rescan the whole library.
    Full,
}

impl ScanKind {
    pub fn from_full_rescan(full: bool) -> Self {
        if full {
            ScanKind::Full
        } else {
            ScanKind::Incremental
        }
    }
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanKind::Incremental => write!(f, "incremental"),
            ScanKind::Full => write!(f, "full"),
        }
    }
}

/// Operations of the companion service used after a run.
///
/// [`NickelBus`](super::nickel::NickelBus) implements it over D-Bus; tests
/// use an in-memory bus.
#[async_trait]
pub trait LibraryBus: Send + Sync {
    /// Subscribes to one signal of the service.
    ///
    /// The stream yields the member name of each matching signal. Dropping
    /// it removes the subscription.
    async fn subscribe(&self, signal: &str) -> Result<BoxStream<'static, String>>;

    /// Asks the reader to rescan its library.
    async fn trigger_rescan(&self, kind: ScanKind) -> Result<()>;

    /// Opens a non-modal dialog without close button.
    async fn dialog_create(&self, title: &str, body: &str) -> Result<()>;

    /// Replaces the body of the open dialog.
    async fn dialog_set_body(&self, body: &str) -> Result<()>;

    /// Adds an accept button to the open dialog.
    async fn dialog_set_accept(&self, label: &str) -> Result<()>;
}
