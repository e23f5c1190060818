//! Files KoboMail places into the reader's system.
//!
//! These are a NickelMenu entry for manual runs, udev rules that start a
//! run whenever the network comes up, and the cleanup of the NickelSeries
//! plugin that older releases shipped.

pub mod nickelmenu;
pub mod nickelseries;
pub mod udev;

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ApplicationConfig;

pub use nickelmenu::prepare_nickelmenu;
pub use udev::prepare_wifi_trigger;

#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

#[derive(Error, Debug)]
pub enum IntegrationError {
    #[error("Failed to write '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove '{path}': {source}")]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("NickelMenu was not found, cannot run with manual execution type")]
    NickelMenuMissing,
}

pub type Result<T> = std::result::Result<T, IntegrationError>;

/// Locations of the integration files on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationPaths {
    pub nickelmenu_dir: PathBuf,
    pub nickelmenu_entry: PathBuf,
    pub udev_rules: PathBuf,
    pub nickelseries_plugin: PathBuf,
}

impl Default for IntegrationPaths {
    fn default() -> Self {
        Self {
            nickelmenu_dir: PathBuf::from("/mnt/onboard/.adds/nm"),
            nickelmenu_entry: PathBuf::from("/mnt/onboard/.adds/nm/kobomail"),
            udev_rules: PathBuf::from("/etc/udev/rules.d/97-kobomail.rules"),
            nickelseries_plugin: PathBuf::from("/usr/local/Kobo/imageformats/libns.so"),
        }
    }
}

impl IntegrationPaths {
    /// The default paths moved below `root`.
    pub fn under(root: &Path) -> Self {
        let rebase = |path: PathBuf| -> PathBuf {
            let relative: PathBuf = path
                .components()
                .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
                .collect();
            root.join(relative)
        };

        let defaults = Self::default();
        Self {
            nickelmenu_dir: rebase(defaults.nickelmenu_dir),
            nickelmenu_entry: rebase(defaults.nickelmenu_entry),
            udev_rules: rebase(defaults.udev_rules),
            nickelseries_plugin: rebase(defaults.nickelseries_plugin),
        }
    }
}

/// Sets up the run trigger and the menu entry as configured.
pub fn prepare(paths: &IntegrationPaths, config: &ApplicationConfig) -> Result<()> {
    prepare_wifi_trigger(paths, config.run_on_wifi_connect)?;
    prepare_nickelmenu(paths, config.create_nickelmenu_entry)?;
    Ok(())
}

/// Removes every integration file. The library folder is left alone.
///
/// All removals are attempted; the first failure is returned.
pub fn uninstall(paths: &IntegrationPaths) -> Result<()> {
    let results = [
        udev::remove_rules(paths),
        nickelmenu::remove_entry(paths),
        nickelseries::uninstall(paths),
    ];

    let mut first_error = None;
    for result in results {
        if let Err(e) = result {
            warn!(error = %e, "Uninstall step failed");
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

pub(crate) fn file_exists(path: &Path) -> bool {
    path.is_file()
}

pub(crate) fn write_file(path: &Path, content: &str) -> Result<()> {
    debug!(file = %path.display(), "Writing file");
    let to_error = |source| IntegrationError::WriteFile {
        path: path.to_path_buf(),
        source,
    };

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(FILE_MODE);
    }

    let mut file = options.open(path).map_err(to_error)?;
    file.write_all(content.as_bytes()).map_err(to_error)?;
    Ok(())
}

/// Removes `path` if it is a file. Returns whether something was removed.
pub(crate) fn remove_file(path: &Path) -> Result<bool> {
    if !file_exists(path) {
        return Ok(false);
    }
    debug!(file = %path.display(), "Removing file");
    std::fs::remove_file(path).map_err(|source| IntegrationError::RemoveFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(true)
}
