use thiserror::Error;

use crate::mailbox::MailboxError;

/// A fatal run failure. The message is also what the user sees on screen.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to connect to {host}:{port}, please check internet connection: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: MailboxError,
    },

    #[error("Failed to authenticate to IMAP server: {0}")]
    Authenticate(#[source] MailboxError),

    #[error("Failed to select IMAP mailbox {folder}: {source}")]
    SelectMailbox {
        folder: String,
        #[source]
        source: MailboxError,
    },

    #[error("Failed to fetch messages: {0}")]
    Fetch(#[source] MailboxError),

    #[error("Failed to process message: {0}")]
    Message(#[source] MailboxError),

    #[error("Failed to process attachment: {0}")]
    Attachment(#[source] MailboxError),

    #[error("Failed to delete message: {0}")]
    Delete(#[source] MailboxError),
}

impl PipelineError {
    /// The underlying mailbox error.
    pub fn mailbox_error(&self) -> &MailboxError {
        match self {
            PipelineError::Connect { source, .. } | PipelineError::SelectMailbox { source, .. } => {
                source
            }
            PipelineError::Authenticate(source)
            | PipelineError::Fetch(source)
            | PipelineError::Message(source)
            | PipelineError::Attachment(source)
            | PipelineError::Delete(source) => source,
        }
    }
}
