use std::path::PathBuf;

use crate::config::KoboMailConfig;
use crate::mailbox::{AllowedExtensions, SearchPredicate};

/// The parts of the configuration a run needs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub folder: String,
    pub predicate: SearchPredicate,
    pub allowed_extensions: AllowedExtensions,
    pub library_path: PathBuf,
    pub delete_processed: bool,
}

impl PipelineConfig {
    pub fn from_config(config: &KoboMailConfig) -> Self {
        let imap = &config.imap_config;
        Self {
            host: imap.imap_host.clone(),
            port: imap.imap_port,
            user: imap.imap_user.clone(),
            folder: imap.imap_folder.clone(),
            predicate: imap.search_predicate(),
            allowed_extensions: config.processing_config.allowed_extensions(),
            library_path: config.application_config.library_path.clone(),
            delete_processed: config.processing_config.email_delete,
        }
    }
}
