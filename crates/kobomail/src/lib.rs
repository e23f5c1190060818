pub mod config;
pub mod error;
pub mod integrations;
pub mod logging;
pub mod mailbox;
pub mod notify;
pub mod pipeline;
pub mod secrets;

pub use config::{load_config, load_config_from_str, KoboMailConfig};
pub use error::{ConfigError, KoboMailError, Result};
pub use integrations::{IntegrationError, IntegrationPaths};
pub use mailbox::{Mailbox, MailboxError, MessageHandle, SearchPredicate};
pub use notify::{Capability, CompletionNotifier, NotifyError, StatusDialog};
pub use pipeline::{Pipeline, PipelineConfig, PipelineError, RunSummary};
pub use secrets::{resolve_secret, SecretError};
