//! Mail server access.
//!
//! This module connects to the IMAP account, finds the messages tagged for
//! the device, and saves their e-book attachments into the library folder.

pub mod error;
pub mod extract;
pub mod message;
pub mod search;
pub mod session;

use async_trait::async_trait;

pub use error::{MailboxError, Result};
pub use extract::AllowedExtensions;
pub use message::{MessageDetails, MessageHandle};
pub use search::{FlagType, Matcher, SearchPredicate};
pub use session::{ImapConnection, ImapSession, ImapTransport, MailboxInfo};

/// A selected mailbox that can be searched and pruned.
///
/// Implemented by [`ImapSession`] and by in-memory mailboxes in tests.
#[async_trait]
pub trait Mailbox: Send {
    /// Returns every message matching `predicate`, ordered by UID.
    ///
    /// An empty result is not an error.
    async fn search(&mut self, predicate: &SearchPredicate) -> Result<Vec<MessageHandle>>;

    /// Flags a message as deleted.
    async fn delete_message(&mut self, message: &MessageHandle) -> Result<()>;
}
