//! Notification error types.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while talking to the reader software after a run.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// D-Bus connection or method call failed.
    #[error("D-Bus error: {0}")]
    Bus(#[from] zbus::Error),

    /// The done signal did not arrive in time.
    #[error("Timed out after {0:?} waiting for the library rescan to finish")]
    Timeout(Duration),

    /// A signal other than the done signal arrived while waiting.
    #[error("Expected '{expected}' signal, got '{received}'")]
    UnexpectedSignal { expected: String, received: String },

    /// The signal subscription ended before any signal arrived.
    #[error("Signal subscription closed before the rescan finished")]
    SignalStreamClosed,

    /// Another rescan is still waiting for its done signal.
    #[error("A library rescan is already in progress")]
    RescanPending,

    /// Writing to the hardware status pipe failed.
    #[error("Hardware status pipe error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
