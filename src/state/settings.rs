//! Updater settings with persistence.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::i18n::Locale;

/// Updater settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterSettings {
    /// Manifest URL. Supports `{{target}}`, `{{arch}}` and `{{current_version}}`.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_check_timeout_secs")]
    pub check_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub auto_check: bool,
    #[serde(default = "default_auto_check_delay_secs")]
    pub auto_check_delay_secs: u64,
    #[serde(default)]
    pub auto_download: bool,
    #[serde(default)]
    pub extra_targets: Vec<String>,
    #[serde(default)]
    pub locale: Locale,
    #[serde(default)]
    pub force_enabled: bool,
}

impl Default for UpdaterSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            check_timeout_secs: default_check_timeout_secs(),
            auto_check: true,
            auto_check_delay_secs: default_auto_check_delay_secs(),
            auto_download: false,
            extra_targets: Vec::new(),
            locale: Locale::default(),
            force_enabled: false,
        }
    }
}

impl UpdaterSettings {
    /// A zero timeout falls back to the default.
    pub fn check_timeout(&self) -> Duration {
        match self.check_timeout_secs {
            0 => Duration::from_secs(DEFAULT_CHECK_TIMEOUT_SECS),
            secs => Duration::from_secs(secs),
        }
    }

    pub fn auto_check_delay(&self) -> Duration {
        Duration::from_secs(self.auto_check_delay_secs)
    }
}

/// Per-target timeout applied to every remote check.
pub const DEFAULT_CHECK_TIMEOUT_SECS: u64 = 12;

fn default_check_timeout_secs() -> u64 {
    DEFAULT_CHECK_TIMEOUT_SECS
}

fn default_auto_check_delay_secs() -> u64 {
    3
}

fn default_true() -> bool {
    true
}
