//! udev rules that start a run when a network interface comes up.

use tracing::debug;

use super::nickelmenu;
use super::{file_exists, remove_file, write_file, IntegrationError, IntegrationPaths, Result};

const LAUNCHER: &str = "/usr/local/kobomail/kobomail_launcher.sh";
const CONFIG_SETUP: &str = "/usr/local/kobomail/kobomail_config_setup.sh";

/// Contents of the rules file.
pub fn rules() -> String {
    [
        format!(r#"KERNEL=="eth*", ACTION=="add", RUN+="{}""#, LAUNCHER),
        format!(r#"KERNEL=="wlan*", ACTION=="add", RUN+="{}""#, LAUNCHER),
        format!(r#"KERNEL=="lo", RUN+="{}""#, CONFIG_SETUP),
    ]
    .iter()
    .map(|rule| format!("{}\n", rule))
    .collect()
}

pub fn rules_found(paths: &IntegrationPaths) -> bool {
    let found = file_exists(&paths.udev_rules);
    debug!(
        file = %paths.udev_rules.display(),
        found,
        "Checking if udev rules file is present"
    );
    found
}

pub fn deploy_rules(paths: &IntegrationPaths) -> Result<()> {
    write_file(&paths.udev_rules, &rules())
}

pub fn remove_rules(paths: &IntegrationPaths) -> Result<bool> {
    remove_file(&paths.udev_rules)
}

/// Installs the rules when runs should follow network connects, removes
/// them otherwise.
///
/// Without the rules the only way to start a run is the NickelMenu entry,
/// so NickelMenu must then be installed.
pub fn prepare_wifi_trigger(paths: &IntegrationPaths, run_on_wifi_connect: bool) -> Result<()> {
    if run_on_wifi_connect {
        if !rules_found(paths) {
            debug!("KoboMail udev rules not found, deploying template");
            deploy_rules(paths)?;
        }
        return Ok(());
    }

    if !nickelmenu::is_installed(paths) {
        return Err(IntegrationError::NickelMenuMissing);
    }
    if rules_found(paths) {
        debug!("KoboMail udev rules found, removing");
        remove_rules(paths)?;
    }
    Ok(())
}
