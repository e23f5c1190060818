use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

use crate::mailbox::{AllowedExtensions, FlagType, SearchPredicate};
use crate::notify::hotplug::DEFAULT_STATUS_PIPE;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KoboMailConfig {
    pub imap_config: ImapConfig,
    pub processing_config: ProcessingConfig,
    #[serde(default)]
    pub application_config: ApplicationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImapConfig {
    pub imap_host: String,
    #[serde(default = "default_imap_port")]
    pub imap_port: u16,
    pub imap_user: String,
    #[serde(default, serialize_with = "redact")]
    pub imap_pwd: Option<SecretString>,
    #[serde(default)]
    pub imap_pwd_file: Option<PathBuf>,
    #[serde(default)]
    pub imap_pwd_env: Option<String>,
    #[serde(default = "default_imap_folder")]
    pub imap_folder: String,
    pub email_flag_type: FlagType,
    pub email_flag: String,
    #[serde(default)]
    pub email_unseen: bool,
}

fn default_imap_port() -> u16 {
    993
}

fn default_imap_folder() -> String {
    "INBOX".to_string()
}

fn redact<S: Serializer>(value: &Option<SecretString>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(_) => serializer.serialize_str("[REDACTED]"),
        None => serializer.serialize_none(),
    }
}

impl ImapConfig {
    /// Search predicate selecting the messages meant for the device.
    pub fn search_predicate(&self) -> SearchPredicate {
        SearchPredicate::build(
            &self.imap_user,
            self.email_flag_type,
            &self.email_flag,
            self.email_unseen,
        )
    }

    /// Resolves the password from `imap_pwd`, `imap_pwd_file` or
    /// `imap_pwd_env`, in that order.
    pub fn password(&self) -> crate::secrets::Result<SecretString> {
        crate::secrets::resolve_secret(
            self.imap_pwd.as_ref().map(|pwd| pwd.expose_secret()),
            self.imap_pwd_file.as_deref(),
            self.imap_pwd_env.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    #[serde(default)]
    pub email_delete: bool,
    pub filetypes: Vec<String>,
    #[serde(default)]
    pub full_rescan: bool,
    /// Seconds to wait for the library rescan to finish.
    #[serde(default = "default_rescan_timeout")]
    pub rescan_timeout: u64,
}

fn default_rescan_timeout() -> u64 {
    30
}

impl ProcessingConfig {
    pub fn allowed_extensions(&self) -> AllowedExtensions {
        AllowedExtensions::new(&self.filetypes)
    }

    pub fn rescan_timeout(&self) -> Duration {
        Duration::from_secs(self.rescan_timeout)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    #[serde(default = "default_true")]
    pub create_nickelmenu_entry: bool,
    #[serde(default)]
    pub run_on_wifi_connect: bool,
    #[serde(default = "default_true")]
    pub show_notifications: bool,
    #[serde(default = "default_library_path")]
    pub library_path: PathBuf,
    #[serde(default = "default_hardware_status_pipe")]
    pub hardware_status_pipe: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_library_path() -> PathBuf {
    PathBuf::from("/mnt/onboard/KoboMailLibrary")
}

fn default_hardware_status_pipe() -> PathBuf {
    PathBuf::from(DEFAULT_STATUS_PIPE)
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            create_nickelmenu_entry: true,
            run_on_wifi_connect: false,
            show_notifications: true,
            library_path: default_library_path(),
            hardware_status_pipe: default_hardware_status_pipe(),
        }
    }
}
