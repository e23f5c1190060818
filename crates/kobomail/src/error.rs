use std::path::PathBuf;
use thiserror::Error;

use crate::integrations::IntegrationError;
use crate::mailbox::MailboxError;
use crate::notify::NotifyError;
use crate::pipeline::PipelineError;
use crate::secrets::SecretError;

#[derive(Error, Debug)]
pub enum KoboMailError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Password error: {0}")]
    Secret(#[from] SecretError),

    #[error("Mailbox error: {0}")]
    Mailbox(#[from] MailboxError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Integration error: {0}")]
    Integration(#[from] IntegrationError),

    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    #[error("Failed to set up logging: {0}")]
    Logging(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config TOML: {0}")]
    ParseToml(#[from] toml::de::Error),

    #[error("Config validation failed: {field}: {message}")]
    Validation { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, KoboMailError>;
