//! IMAP password resolution.
//!
//! The password can be written into the config file, kept in a separate
//! file next to it, or passed through the environment. The first non-empty
//! source wins:
//!
//! 1. `imap_pwd`
//! 2. `imap_pwd_file`
//! 3. `imap_pwd_env`

use std::path::Path;

use secrecy::SecretString;

/// Error type for secret resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No IMAP password configured (set imap_pwd, imap_pwd_file or imap_pwd_env)")]
    NoSourceProvided,

    #[error("Failed to read password file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Password file '{path}' is empty")]
    EmptyFile { path: String },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

/// Result type for secret resolution.
pub type Result<T> = std::result::Result<T, SecretError>;

/// Resolves a secret from the first configured source.
///
/// File contents and environment values are trimmed, since both usually
/// end with a newline. Empty strings count as "not configured".
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&Path>,
    env_var: Option<&str>,
) -> Result<SecretString> {
    if let Some(value) = direct.filter(|v| !v.is_empty()) {
        return Ok(SecretString::from(value));
    }

    if let Some(path) = file_path.filter(|p| !p.as_os_str().is_empty()) {
        let content = std::fs::read_to_string(path).map_err(|e| SecretError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(SecretError::EmptyFile {
                path: path.display().to_string(),
            });
        }
        return Ok(SecretString::from(trimmed));
    }

    if let Some(name) = env_var.filter(|n| !n.is_empty()) {
        return match std::env::var(name) {
            Ok(value) => Ok(SecretString::from(value.trim())),
            Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                name: name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                name: name.to_string(),
            }),
        };
    }

    Err(SecretError::NoSourceProvided)
}

/// Checks if at least one secret source is configured.
pub fn has_secret_source(
    direct: Option<&str>,
    file_path: Option<&Path>,
    env_var: Option<&str>,
) -> bool {
    direct.is_some_and(|s| !s.is_empty())
        || file_path.is_some_and(|p| !p.as_os_str().is_empty())
        || env_var.is_some_and(|s| !s.is_empty())
}
