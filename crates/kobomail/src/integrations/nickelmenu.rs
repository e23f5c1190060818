//! NickelMenu entry for starting a run by hand.

use tracing::debug;

use super::{file_exists, remove_file, write_file, IntegrationPaths, Result};

/// The menu entry. The launcher path is relative to the device root.
pub const MENU_ENTRY: &str =
    "menu_item:main:KoboMail:cmd_spawn:quiet:exec usr/local/kobomail/kobomail_launcher.sh manual";

/// NickelMenu counts as installed when its config directory exists.
pub fn is_installed(paths: &IntegrationPaths) -> bool {
    paths.nickelmenu_dir.is_dir()
}

pub fn entry_found(paths: &IntegrationPaths) -> bool {
    let found = file_exists(&paths.nickelmenu_entry);
    debug!(
        file = %paths.nickelmenu_entry.display(),
        found,
        "Checking if NickelMenu configuration file is present"
    );
    found
}

pub fn deploy_entry(paths: &IntegrationPaths) -> Result<()> {
    write_file(&paths.nickelmenu_entry, &format!("{}\n", MENU_ENTRY))
}

pub fn remove_entry(paths: &IntegrationPaths) -> Result<bool> {
    remove_file(&paths.nickelmenu_entry)
}

/// Makes the menu entry present exactly when NickelMenu is installed and
/// entries are wanted.
pub fn prepare_nickelmenu(paths: &IntegrationPaths, create_entry: bool) -> Result<()> {
    let wanted = create_entry && is_installed(paths);

    if entry_found(paths) {
        if !wanted {
            debug!("Unwanted NickelMenu configuration file found, removing");
            remove_entry(paths)?;
        }
    } else if wanted {
        debug!("NickelMenu configuration file not found, deploying template");
        deploy_entry(paths)?;
    }
    Ok(())
}
