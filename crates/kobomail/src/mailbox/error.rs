//! Mailbox error types.

use thiserror::Error;

/// Errors that can occur while talking to the IMAP server or extracting
/// attachments from fetched messages.
#[derive(Error, Debug)]
pub enum MailboxError {
    /// Failed to reach the IMAP server, after all dial retries.
    #[error("IMAP connection failed: {0}")]
    ConnectionFailed(String),

    /// TLS/SSL error during connection.
    #[error("TLS error: {0}")]
    TlsError(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Folder not found.
    #[error("IMAP folder '{0}' not found")]
    FolderNotFound(String),

    /// IMAP protocol error during search, fetch or store.
    #[error("IMAP protocol error: {0}")]
    ProtocolError(String),

    /// Failed to parse a fetched message.
    #[error("Failed to parse email: {0}")]
    ParseError(String),

    /// IO error when saving attachments.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// An operation was attempted in the wrong session state.
    #[error("Invalid session state: {0}")]
    InvalidState(String),
}

impl From<async_native_tls::Error> for MailboxError {
    fn from(err: async_native_tls::Error) -> Self {
        MailboxError::TlsError(err.to_string())
    }
}

impl MailboxError {
    /// Whether retrying the same operation could succeed.
    ///
    /// Only the dial (TCP connect plus TLS handshake) is transient;
    /// credentials and protocol errors are terminal for the run.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MailboxError::ConnectionFailed(_) | MailboxError::TlsError(_)
        )
    }
}

/// Result type for mailbox operations.
pub type Result<T> = std::result::Result<T, MailboxError>;
