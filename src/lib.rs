pub mod error;
pub mod i18n;
pub mod platform;
pub mod startup;
pub mod state;

pub use error::{Error, Result};
pub use platform::{HttpPlatform, UpdatePlatform};
pub use state::{
    CheckOptions, ControllerOptions, ControllerState, DownloadEvent, DownloadProgress,
    UpdateController, UpdateDescriptor, UpdateStatus,
};
