//! Update lifecycle data: status, descriptor, download progress.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    #[default]
    Idle,
    Checking,
    Available,
    Downloading,
    Downloaded,
    Installing,
    Installed,
    Error,
}

impl UpdateStatus {
    pub fn label(self) -> &'static str {
        match self {
            UpdateStatus::Idle => "idle",
            UpdateStatus::Checking => "checking",
            UpdateStatus::Available => "available",
            UpdateStatus::Downloading => "downloading",
            UpdateStatus::Downloaded => "downloaded",
            UpdateStatus::Installing => "installing",
            UpdateStatus::Installed => "installed",
            UpdateStatus::Error => "error",
        }
    }

    /// Statuses that carry a descriptor of the discovered version.
    pub fn has_update(self) -> bool {
        matches!(
            self,
            UpdateStatus::Available
                | UpdateStatus::Downloading
                | UpdateStatus::Downloaded
                | UpdateStatus::Installing
                | UpdateStatus::Installed
        )
    }
}

/// Where the platform fetches the installer for a descriptor from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub target: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// A remote version newer than the running one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDescriptor {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
}

impl UpdateDescriptor {
    pub fn new(version: impl Into<String>) -> Self {
        Self { version: version.into(), date: None, body: None, artifact: None }
    }

    /// Release timestamp, when `date` is a valid RFC 3339 string.
    pub fn released_at(&self) -> Option<DateTime<FixedOffset>> {
        self.date.as_deref().and_then(|d| DateTime::parse_from_rfc3339(d).ok())
    }
}

/// Events delivered by the platform while an artifact downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadEvent {
    Started { content_length: Option<u64> },
    Progress { chunk_length: u64 },
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub downloaded: u64,
    /// Zero until the first `Started` event (or when the server sends no length).
    pub total: u64,
}

impl DownloadProgress {
    /// Fold a single download event into the running counters.
    pub fn apply(&mut self, event: &DownloadEvent) {
        match *event {
            DownloadEvent::Started { content_length } => {
                self.total = content_length.unwrap_or(0);
                self.downloaded = 0;
            }
            DownloadEvent::Progress { chunk_length } => {
                self.downloaded = self.downloaded.saturating_add(chunk_length);
                if self.total > 0 {
                    self.downloaded = self.downloaded.min(self.total);
                }
            }
            DownloadEvent::Finished => {
                if self.total > 0 {
                    self.downloaded = self.total;
                }
            }
        }
    }

    pub fn percent(&self) -> Option<u8> {
        if self.total == 0 {
            return None;
        }
        Some(((self.downloaded.saturating_mul(100)) / self.total).min(100) as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    /// Suppress notifications (background checks).
    pub silent: bool,
    /// Open the update dialog when a newer version is found.
    pub open_if_available: bool,
}

impl CheckOptions {
    pub fn silent() -> Self {
        Self { silent: true, ..Self::default() }
    }
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self { silent: false, open_if_available: true }
    }
}

/// Everything UI consumers observe about the updater.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ControllerState {
    pub is_open: bool,
    pub status: UpdateStatus,
    pub update: Option<UpdateDescriptor>,
    pub progress: Option<DownloadProgress>,
    pub error: Option<String>,
    /// Install succeeded but the automatic relaunch did not.
    pub needs_manual_restart: bool,
}
