//! Fetched messages and their lazily parsed MIME structure.

use std::path::Path;

use chrono::{DateTime, Utc};
use mail_parser::{Message, MessageParser};
use serde::Serialize;

use super::error::{MailboxError, Result};
use super::extract::{save_attachments, AllowedExtensions};

/// Header metadata of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageDetails {
    pub date: Option<DateTime<Utc>>,
    pub sender: String,
    pub subject: String,
}

/// Parse state of a message body.
enum Reader {
    /// Raw body as returned by the server, not parsed yet.
    Pending(Vec<u8>),
    /// Parsed MIME tree.
    Parsed(Box<Message<'static>>),
    /// The server returned no body, or parsing already failed.
    Unavailable,
}

/// A message from the result set of a mailbox search.
///
/// The body is parsed on first access and the parsed tree is kept for
/// later calls. A handle is only meaningful for the session that produced
/// it and must not be used after the message was deleted.
pub struct MessageHandle {
    uid: u32,
    internal_date: Option<DateTime<Utc>>,
    reader: Reader,
    details: Option<MessageDetails>,
}

impl MessageHandle {
    /// Creates a handle from a fetched body.
    pub fn new(uid: u32, internal_date: Option<DateTime<Utc>>, body: Option<Vec<u8>>) -> Self {
        let reader = match body {
            Some(raw) => Reader::Pending(raw),
            None => Reader::Unavailable,
        };
        Self {
            uid,
            internal_date,
            reader,
            details: None,
        }
    }

    pub fn uid(&self) -> u32 {
        self.uid
    }

    /// Returns the metadata populated by [`fetch_details`](Self::fetch_details).
    pub fn details(&self) -> Option<&MessageDetails> {
        self.details.as_ref()
    }

    /// Returns the parsed message, parsing the body on first use.
    fn reader(&mut self) -> Result<&Message<'static>> {
        if let Reader::Pending(raw) = &self.reader {
            match MessageParser::default().parse(raw).map(Message::into_owned) {
                Some(message) => self.reader = Reader::Parsed(Box::new(message)),
                None => {
                    self.reader = Reader::Unavailable;
                    return Err(MailboxError::ParseError(format!(
                        "UID {}: malformed message",
                        self.uid
                    )));
                }
            }
        }

        match &self.reader {
            Reader::Parsed(message) => Ok(message.as_ref()),
            _ => Err(MailboxError::ParseError(format!(
                "UID {}: server did not return a usable message body",
                self.uid
            ))),
        }
    }

    /// Populates date, sender and subject from the top-level header.
    ///
    /// Calling it again reuses the already parsed message.
    pub fn fetch_details(&mut self) -> Result<&MessageDetails> {
        if self.details.is_none() {
            let uid = self.uid;
            let internal_date = self.internal_date;
            let message = self.reader()?;

            let sender = message
                .from()
                .and_then(|addr| addr.first())
                .and_then(|addr| addr.address())
                .map(str::to_string)
                .ok_or_else(|| {
                    MailboxError::ParseError(format!("UID {}: message has no From address", uid))
                })?;

            let date = message
                .date()
                .and_then(|d| DateTime::<Utc>::from_timestamp(d.to_timestamp(), 0))
                .or(internal_date);

            let subject = message.subject().unwrap_or_default().to_string();

            self.details = Some(MessageDetails {
                date,
                sender,
                subject,
            });
        }

        self.details
            .as_ref()
            .ok_or_else(|| MailboxError::ParseError(format!("UID {}: no details", self.uid)))
    }

    /// Writes the allowed attachments into `destination` and returns how
    /// many files were written.
    pub async fn extract_attachments(
        &mut self,
        allowed: &AllowedExtensions,
        destination: &Path,
    ) -> Result<usize> {
        let message = self.reader()?;
        save_attachments(message, allowed, destination).await
    }
}

impl std::fmt::Debug for MessageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.reader {
            Reader::Pending(_) => "pending",
            Reader::Parsed(_) => "parsed",
            Reader::Unavailable => "unavailable",
        };
        f.debug_struct("MessageHandle")
            .field("uid", &self.uid)
            .field("internal_date", &self.internal_date)
            .field("reader", &state)
            .field("details", &self.details)
            .finish()
    }
}
