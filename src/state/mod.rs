// Updater state management

pub mod config;
pub mod controller;
pub mod failure;
pub mod settings;
pub mod status;
pub mod updater;

pub use config::ConfigManager;
pub use controller::{ControllerOptions, UpdateController};
pub use failure::CheckFailure;
pub use settings::UpdaterSettings;
pub use status::{LogNotifier, Notifier, StatusLevel, StatusMessage};
pub use updater::{
    Artifact, CheckOptions, ControllerState, DownloadEvent, DownloadProgress, UpdateDescriptor,
    UpdateStatus,
};
