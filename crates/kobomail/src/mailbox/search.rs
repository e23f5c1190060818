//! Search predicate construction.
//!
//! A predicate always carries exactly one matcher. Sub-address tags are
//! matched against the recipient header, subject tags against the subject.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How messages meant for the device are recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagType {
    /// `user+flag@domain` sub-addressing.
    Plus,
    /// Subject contains the flag.
    Subject,
}

impl fmt::Display for FlagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagType::Plus => write!(f, "plus"),
            FlagType::Subject => write!(f, "subject"),
        }
    }
}

/// The single matcher of a [`SearchPredicate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Recipient address contains the tagged address.
    Address(String),
    /// Subject contains the given text.
    Subject(String),
}

/// The compiled matcher passed to the mailbox search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPredicate {
    unseen_only: bool,
    matcher: Matcher,
}

impl SearchPredicate {
    /// Builds the predicate for the account `account` from the configured
    /// flag type and value.
    ///
    /// For [`FlagType::Plus`] the tag is inserted right before the first `@`
    /// of the account address. An address without `@` is used unchanged.
    pub fn build(account: &str, flag_type: FlagType, flag_value: &str, unseen_only: bool) -> Self {
        let matcher = match flag_type {
            FlagType::Plus => {
                Matcher::Address(account.replacen('@', &format!("+{}@", flag_value), 1))
            }
            FlagType::Subject => Matcher::Subject(flag_value.to_string()),
        };

        Self {
            unseen_only,
            matcher,
        }
    }

    /// Returns whether only unread messages are matched.
    pub fn unseen_only(&self) -> bool {
        self.unseen_only
    }

    /// Returns the matcher.
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Renders the predicate as IMAP SEARCH criteria.
    pub fn to_imap_query(&self) -> String {
        let mut query = String::new();
        if self.unseen_only {
            query.push_str("UNSEEN ");
        }

        match &self.matcher {
            Matcher::Address(address) => {
                query.push_str("TO ");
                query.push_str(&quote(address));
            }
            Matcher::Subject(subject) => {
                query.push_str("SUBJECT ");
                query.push_str(&quote(subject));
            }
        }

        query
    }

    /// Checks a message against the predicate the way a server would.
    ///
    /// `recipients` are the addresses of the `To` header. Substring
    /// matching is case-insensitive, as in IMAP SEARCH.
    pub fn matches(&self, recipients: &[&str], subject: &str, seen: bool) -> bool {
        if self.unseen_only && seen {
            return false;
        }

        match &self.matcher {
            Matcher::Address(address) => {
                let needle = address.to_lowercase();
                recipients
                    .iter()
                    .any(|r| r.to_lowercase().contains(&needle))
            }
            Matcher::Subject(text) => subject.to_lowercase().contains(&text.to_lowercase()),
        }
    }
}

impl fmt::Display for SearchPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_imap_query())
    }
}

/// Quotes a string for use in an IMAP command.
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
