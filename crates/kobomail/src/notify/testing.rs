//! In-memory bus for notifier tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::sync::mpsc;

use super::bus::{LibraryBus, ScanKind};
use super::error::{NotifyError, Result};

/// Records every call and, when configured, emits one signal a fixed time
/// after a rescan was triggered.
///
/// Signals only reach a subscription that existed when the rescan was
/// triggered and whose member matches, like a D-Bus match rule.
pub(crate) struct RecordingBus {
    calls: Mutex<Vec<String>>,
    subscriber: Mutex<Option<(String, mpsc::UnboundedSender<String>)>>,
    broadcasts: Vec<String>,
    reply: Option<(String, Duration)>,
    fail_dialogs: bool,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            subscriber: Mutex::new(None),
            broadcasts: Vec::new(),
            reply: None,
            fail_dialogs: false,
        }
    }

    pub fn replying(signal: &str, after: Duration) -> Self {
        Self {
            reply: Some((signal.to_string(), after)),
            ..Self::new()
        }
    }

    /// Emits `signal` as soon as a rescan is triggered, ahead of the reply.
    pub fn broadcasting(mut self, signal: &str) -> Self {
        self.broadcasts.push(signal.to_string());
        self
    }

    pub fn failing_dialogs(mut self) -> Self {
        self.fail_dialogs = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn dialog_result(&self) -> Result<()> {
        if self.fail_dialogs {
            return Err(NotifyError::Io(std::io::Error::other("dialog unavailable")));
        }
        Ok(())
    }
}

#[async_trait]
impl LibraryBus for RecordingBus {
    async fn subscribe(&self, signal: &str) -> Result<BoxStream<'static, String>> {
        self.record(format!("subscribe:{}", signal));
        let (tx, rx) = mpsc::unbounded_channel();
        *self.subscriber.lock().unwrap() = Some((signal.to_string(), tx));

        Ok(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|signal| (signal, rx))
        })
        .boxed())
    }

    async fn trigger_rescan(&self, kind: ScanKind) -> Result<()> {
        self.record(format!("rescan:{}", kind));

        let Some((member, tx)) = self.subscriber.lock().unwrap().clone() else {
            return Ok(());
        };
        for signal in &self.broadcasts {
            if *signal == member {
                let _ = tx.send(signal.clone());
            }
        }
        if let Some((signal, delay)) = self.reply.clone() {
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if signal == member {
                    let _ = tx.send(signal);
                }
            });
        }
        Ok(())
    }

    async fn dialog_create(&self, title: &str, body: &str) -> Result<()> {
        self.record(format!("dialog_create:{}:{}", title, body));
        self.dialog_result()
    }

    async fn dialog_set_body(&self, body: &str) -> Result<()> {
        self.record(format!("dialog_set_body:{}", body));
        self.dialog_result()
    }

    async fn dialog_set_accept(&self, label: &str) -> Result<()> {
        self.record(format!("dialog_set_accept:{}", label));
        self.dialog_result()
    }
}
