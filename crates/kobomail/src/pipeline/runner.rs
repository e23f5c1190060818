use std::sync::Arc;

use secrecy::SecretString;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::KoboMailConfig;
use crate::error::KoboMailError;
use crate::integrations::{self, IntegrationPaths};
use crate::mailbox::{ImapConnection, ImapSession, Mailbox};
use crate::notify::{
    select_notifier, Capability, CompletionNotifier, Notification, NotifySettings, StatusDialog,
};

use super::config::PipelineConfig;
use super::error::PipelineError;
use super::summary::RunSummary;

const STARTING: &str = "Starting up, please wait.";

/// One pass over the mailbox: search, save attachments, optionally delete,
/// then hand the count to the completion notifier.
///
/// Messages are handled one after another on the single session. The first
/// failure ends the run.
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    dialog: StatusDialog,
    notifier: Box<dyn CompletionNotifier>,
}

impl Pipeline {
    pub fn new(
        config: Arc<PipelineConfig>,
        dialog: StatusDialog,
        notifier: Box<dyn CompletionNotifier>,
    ) -> Self {
        Self {
            config,
            dialog,
            notifier,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs against the configured IMAP server. The session is logged out
    /// before the notifier runs, also when processing failed.
    pub async fn run(&self, password: &SecretString) -> Result<RunSummary, PipelineError> {
        self.dialog.show(STARTING, false).await;

        let mut session = match self.open_session(password).await {
            Ok(session) => session,
            Err(e) => return Err(self.report_failure(e).await),
        };

        let result = self.process(&mut session).await;
        session.logout().await;

        let summary = result?;
        self.finish(&summary).await;
        Ok(summary)
    }

    /// [`process`](Self::process) followed by [`finish`](Self::finish), on
    /// an already selected mailbox.
    pub async fn run_with_mailbox<M>(&self, mailbox: &mut M) -> Result<RunSummary, PipelineError>
    where
        M: Mailbox + ?Sized,
    {
        let summary = self.process(mailbox).await?;
        self.finish(&summary).await;
        Ok(summary)
    }

    /// Processes every matching message of `mailbox`.
    ///
    /// A failure is logged and shown to the user before it is returned.
    pub async fn process<M>(&self, mailbox: &mut M) -> Result<RunSummary, PipelineError>
    where
        M: Mailbox + ?Sized,
    {
        match self.process_messages(mailbox).await {
            Ok(summary) => Ok(summary),
            Err(e) => Err(self.report_failure(e).await),
        }
    }

    /// Hands the number of saved files to the notifier. Notifier errors do
    /// not fail the run.
    pub async fn finish(&self, summary: &RunSummary) {
        let notifier = self.notifier.name();
        debug!(notifier, ebooks = summary.ebooks_processed, "Completing run");

        if let Err(e) = self.notifier.complete(summary.ebooks_processed).await {
            error!(notifier, error = %e, "Could not notify the reader about new ebooks");
        }
    }

    async fn open_session(&self, password: &SecretString) -> Result<ImapSession, PipelineError> {
        let config = &self.config;

        let connection = ImapConnection::connect(&config.host, config.port)
            .await
            .map_err(|source| PipelineError::Connect {
                host: config.host.clone(),
                port: config.port,
                source,
            })?;
        info!(host = %config.host, port = config.port, "Connected to IMAP server");

        let mut session = connection
            .login(&config.user, password)
            .await
            .map_err(PipelineError::Authenticate)?;
        info!(user = %config.user, "Authenticated to IMAP server");

        match session.select_mailbox(&config.folder).await {
            Ok(mailbox) => {
                info!(name = %mailbox.name, exists = mailbox.exists, "IMAP mailbox selected");
                Ok(session)
            }
            Err(source) => {
                session.logout().await;
                Err(PipelineError::SelectMailbox {
                    folder: config.folder.clone(),
                    source,
                })
            }
        }
    }

    async fn process_messages<M>(&self, mailbox: &mut M) -> Result<RunSummary, PipelineError>
    where
        M: Mailbox + ?Sized,
    {
        let config = &self.config;
        let mut summary = RunSummary::default();

        let mut messages = mailbox
            .search(&config.predicate)
            .await
            .map_err(PipelineError::Fetch)?;
        summary.messages_found = messages.len();
        info!(
            number_of_emails_found = summary.messages_found,
            criteria = %config.predicate,
            "Fetched emails"
        );

        if messages.is_empty() {
            return Ok(summary);
        }

        self.dialog
            .update(
                &format!(
                    "Found {} emails to process. Please wait...",
                    summary.messages_found
                ),
                false,
            )
            .await;

        for message in messages.iter_mut() {
            let span = info_span!("message", uid = message.uid());

            async {
                let details = message.fetch_details().map_err(PipelineError::Message)?;
                info!(
                    sender = %details.sender,
                    subject = %details.subject,
                    date = ?details.date,
                    "Processing message"
                );

                let written = message
                    .extract_attachments(&config.allowed_extensions, &config.library_path)
                    .await
                    .map_err(PipelineError::Attachment)?;
                summary.ebooks_processed += written;
                if written == 0 {
                    debug!("Message had no allowed attachments");
                }

                if config.delete_processed {
                    info!("Deleting message");
                    mailbox
                        .delete_message(message)
                        .await
                        .map_err(PipelineError::Delete)?;
                    summary.messages_deleted += 1;
                }
                Ok::<(), PipelineError>(())
            }
            .instrument(span)
            .await?;
        }

        info!(
            ebooks = summary.ebooks_processed,
            deleted = summary.messages_deleted,
            "Finished processing messages"
        );
        Ok(summary)
    }

    async fn report_failure(&self, error: PipelineError) -> PipelineError {
        error!(error = %error, "Run failed");
        self.dialog.show(&error.to_string(), true).await;
        error
    }
}

/// Runs KoboMail once with `config`, using what the capability probe found
/// for notifications.
///
/// The device integration files below `paths` are refreshed first. A failure
/// there is reported but does not stop the mailbox run.
pub async fn run(
    config: &KoboMailConfig,
    capability: &Capability,
    paths: &IntegrationPaths,
) -> Result<RunSummary, KoboMailError> {
    debug!(
        config = %serde_json::to_string(config).unwrap_or_default(),
        capability = ?capability,
        "Starting run"
    );

    let Notification { dialog, notifier } =
        select_notifier(capability, &NotifySettings::from(config));

    if let Err(e) = integrations::prepare(paths, &config.application_config) {
        error!(error = %e, "Could not prepare the device integration");
        dialog
            .show(&format!("Failed to prepare device integration: {}", e), true)
            .await;
    }

    let password = match config.imap_config.password() {
        Ok(password) => password,
        Err(e) => {
            error!(error = %e, "Could not resolve the IMAP password");
            dialog
                .show(&format!("Failed to read IMAP password: {}", e), true)
                .await;
            return Err(e.into());
        }
    };

    if !config.application_config.library_path.exists() {
        warn!(
            path = %config.application_config.library_path.display(),
            "Library folder does not exist yet, it will be created"
        );
    }

    let pipeline = Pipeline::new(
        Arc::new(PipelineConfig::from_config(config)),
        dialog,
        notifier,
    );
    Ok(pipeline.run(&password).await?)
}
