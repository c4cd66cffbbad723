//! Background update check scheduled shortly after launch.

use tokio::task::JoinHandle;

use crate::state::controller::UpdateController;
use crate::state::settings::UpdaterSettings;
use crate::state::updater::{CheckOptions, UpdateStatus};

/// Spawn the startup check. Returns `None` when auto-check is disabled.
pub fn spawn_startup_check(
    controller: UpdateController,
    settings: &UpdaterSettings,
) -> Option<JoinHandle<()>> {
    if !settings.auto_check {
        log::debug!("Startup update check disabled");
        return None;
    }

    let delay = settings.auto_check_delay();
    let auto_download = settings.auto_download;

    Some(tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        controller.check_for_updates(CheckOptions::silent()).await;

        if auto_download && controller.status() == UpdateStatus::Available {
            controller.download_update().await;
        }
    }))
}
