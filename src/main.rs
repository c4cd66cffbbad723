use std::sync::Arc;

use anyhow::Context as _;
use omo_updater::state::{ConfigManager, LogNotifier, UpdaterSettings};
use omo_updater::{
    CheckOptions, ControllerOptions, HttpPlatform, UpdateController, UpdatePlatform, UpdateStatus,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let settings = match ConfigManager::new().and_then(|config| config.load_settings()) {
        Ok(settings) => settings,
        Err(err) => {
            log::warn!("Failed to load updater settings, using defaults: {err:#}");
            UpdaterSettings::default()
        }
    };

    let platform = HttpPlatform::new(&settings).context("Failed to initialize updater")?;
    if !platform.is_supported() {
        log::info!("Updater disabled: not a packaged build or no endpoint configured");
        return Ok(());
    }
    log::info!("Running v{}", platform.current_version());

    let controller = UpdateController::new(
        Arc::new(platform),
        Arc::new(LogNotifier),
        Arc::new(settings.locale),
        ControllerOptions::from_settings(&settings),
    );

    // Report download progress in 10% steps
    let mut updates = controller.subscribe();
    let reporter = tokio::spawn(async move {
        let mut last_step = None;
        while updates.changed().await.is_ok() {
            let progress = updates.borrow_and_update().progress;
            let step = progress.and_then(|p| p.percent()).map(|pct| pct / 10);
            if step.is_some() && step != last_step {
                last_step = step;
                if let Some(p) = progress {
                    log::info!("Downloaded {} of {} bytes", p.downloaded, p.total);
                }
            }
        }
    });

    controller.check_for_updates(CheckOptions::default()).await;

    if let Some(update) = controller.state().update {
        let released = update
            .released_at()
            .map(|at| format!(" (released {})", at.format("%Y-%m-%d")))
            .unwrap_or_default();
        log::info!("Update v{} available{released}", update.version);
        if let Some(notes) = &update.body {
            log::info!("Release notes:\n{notes}");
        }

        controller.download_update().await;
        controller.install_update().await;
    }

    reporter.abort();

    let state = controller.state();
    if state.status == UpdateStatus::Error {
        anyhow::bail!("Update failed: {}", state.error.unwrap_or_default());
    }
    Ok(())
}
