//! In-memory collaborators for running the pipeline without a server.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use kobomail::mailbox::{
    self, AllowedExtensions, FlagType, Mailbox, MailboxError, MessageHandle, SearchPredicate,
};
use kobomail::notify::{self, CompletionNotifier, StatusDialog};
use kobomail::{Pipeline, PipelineConfig};

use super::builders::EmailBuilder;

pub const ACCOUNT: &str = "reader@example.com";

struct FakeMessage {
    uid: u32,
    to: String,
    subject: String,
    seen: bool,
    raw: Vec<u8>,
}

/// A selected mailbox held in memory.
///
/// Search applies the predicate the way an IMAP server would; deletions
/// are recorded by UID.
#[derive(Default)]
pub struct FakeMailbox {
    messages: Vec<FakeMessage>,
    deleted: Vec<u32>,
    fail_deletes: bool,
}

impl FakeMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an unread message and returns its UID.
    pub fn add(&mut self, email: &EmailBuilder) -> u32 {
        self.push(email, false)
    }

    pub fn add_seen(&mut self, email: &EmailBuilder) -> u32 {
        self.push(email, true)
    }

    fn push(&mut self, email: &EmailBuilder, seen: bool) -> u32 {
        let uid = self.messages.len() as u32 + 1;
        self.messages.push(FakeMessage {
            uid,
            to: email.recipient().to_string(),
            subject: email.subject_line().to_string(),
            seen,
            raw: email.build(),
        });
        uid
    }

    pub fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub fn deleted(&self) -> &[u32] {
        &self.deleted
    }
}

#[async_trait]
impl Mailbox for FakeMailbox {
    async fn search(&mut self, predicate: &SearchPredicate) -> mailbox::Result<Vec<MessageHandle>> {
        Ok(self
            .messages
            .iter()
            .filter(|m| predicate.matches(&[m.to.as_str()], &m.subject, m.seen))
            .map(|m| MessageHandle::new(m.uid, None, Some(m.raw.clone())))
            .collect())
    }

    async fn delete_message(&mut self, message: &MessageHandle) -> mailbox::Result<()> {
        if self.fail_deletes {
            return Err(MailboxError::ProtocolError("STORE rejected".to_string()));
        }
        self.deleted.push(message.uid());
        Ok(())
    }
}

/// Records the counts it was completed with.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    calls: Arc<Mutex<Vec<usize>>>,
}

impl RecordingNotifier {
    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionNotifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn complete(&self, processed: usize) -> notify::Result<()> {
        self.calls.lock().unwrap().push(processed);
        Ok(())
    }
}

/// Temporary library folder plus pipeline wiring.
pub struct TestHarness {
    temp_dir: TempDir,
    pub library_dir: PathBuf,
    pub notifier: RecordingNotifier,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let library_dir = temp_dir.path().join("KoboMailLibrary");
        Self {
            temp_dir,
            library_dir,
            notifier: RecordingNotifier::default(),
        }
    }

    pub fn temp_path(&self) -> &std::path::Path {
        self.temp_dir.path()
    }

    /// Plus-addressed `kobo` tag, epub/kepub/pdf allowed, no deletion.
    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            host: "imap.example.com".to_string(),
            port: 993,
            user: ACCOUNT.to_string(),
            folder: "INBOX".to_string(),
            predicate: SearchPredicate::build(ACCOUNT, FlagType::Plus, "kobo", false),
            allowed_extensions: AllowedExtensions::new(["epub", "kepub", "pdf"]),
            library_path: self.library_dir.clone(),
            delete_processed: false,
        }
    }

    pub fn pipeline(&self, config: PipelineConfig) -> Pipeline {
        self.pipeline_with(config, Box::new(self.notifier.clone()))
    }

    pub fn pipeline_with(
        &self,
        config: PipelineConfig,
        notifier: Box<dyn CompletionNotifier>,
    ) -> Pipeline {
        Pipeline::new(Arc::new(config), StatusDialog::disabled(), notifier)
    }

    /// Sorted file names in the library folder.
    pub fn library_files(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.library_dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
