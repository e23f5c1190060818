//! NickelSeries plugin left behind by earlier KoboMail packages.

use tracing::debug;

use super::{file_exists, remove_file, IntegrationPaths, Result};

pub fn is_installed(paths: &IntegrationPaths) -> bool {
    file_exists(&paths.nickelseries_plugin)
}

/// Deletes the plugin binary if present.
pub fn uninstall(paths: &IntegrationPaths) -> Result<bool> {
    debug!(
        file = %paths.nickelseries_plugin.display(),
        "Removing NickelSeries binary file"
    );
    remove_file(&paths.nickelseries_plugin)
}
