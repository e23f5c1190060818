use std::path::Path;

use crate::config::schema::KoboMailConfig;
use crate::error::ConfigError;

/// Reads and validates the config file at `path`.
///
/// A relative `imap_pwd_file` is resolved against the directory of the
/// config file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<KoboMailConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut config = load_config_from_str(&content)?;

    if let (Some(pwd_file), Some(dir)) = (&config.imap_config.imap_pwd_file, path.parent()) {
        if pwd_file.is_relative() {
            config.imap_config.imap_pwd_file = Some(dir.join(pwd_file));
        }
    }

    Ok(config)
}

pub fn load_config_from_str(content: &str) -> Result<KoboMailConfig, ConfigError> {
    let config: KoboMailConfig = toml::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &KoboMailConfig) -> Result<(), ConfigError> {
    let imap = &config.imap_config;

    if imap.imap_host.trim().is_empty() {
        return Err(ConfigError::invalid("imap_host", "must not be empty"));
    }
    if imap.imap_port == 0 {
        return Err(ConfigError::invalid("imap_port", "must be between 1 and 65535"));
    }
    if imap.imap_user.trim().is_empty() {
        return Err(ConfigError::invalid("imap_user", "must not be empty"));
    }
    if imap.imap_folder.trim().is_empty() {
        return Err(ConfigError::invalid("imap_folder", "must not be empty"));
    }
    if imap.email_flag.trim().is_empty() {
        return Err(ConfigError::invalid("email_flag", "must not be empty"));
    }

    let processing = &config.processing_config;
    if processing.allowed_extensions().is_empty() {
        return Err(ConfigError::invalid(
            "filetypes",
            "at least one file extension is required",
        ));
    }
    if processing.rescan_timeout == 0 {
        return Err(ConfigError::invalid(
            "rescan_timeout",
            "must be at least one second",
        ));
    }

    Ok(())
}
