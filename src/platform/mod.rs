//! Platform update primitives consumed by the controller.

pub mod http;
pub mod install;

use std::path::Path;

use futures::channel::mpsc::UnboundedSender;
use futures::future::BoxFuture;

use crate::error::Result;
use crate::state::updater::{DownloadEvent, UpdateDescriptor};

pub use http::HttpPlatform;

/// The native update mechanism of the packaged desktop shell.
pub trait UpdatePlatform: Send + Sync {
    /// Whether update primitives are reachable at all (packaged shell, endpoint configured).
    fn is_supported(&self) -> bool;

    /// Ask the remote for a newer version. `None` target means the running build's own.
    fn check<'a>(
        &'a self,
        target: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Option<UpdateDescriptor>>>;

    /// Fetch the artifact for `update`, reporting through `events`.
    ///
    /// The future owns `events` and drops it when it completes, which ends the stream.
    fn download<'a>(
        &'a self,
        update: &'a UpdateDescriptor,
        events: UnboundedSender<DownloadEvent>,
    ) -> BoxFuture<'a, Result<()>>;

    fn install<'a>(&'a self, update: &'a UpdateDescriptor) -> BoxFuture<'a, Result<()>>;

    fn relaunch(&self) -> BoxFuture<'_, Result<()>>;
}

/// Labels historically used for the macOS universal (combined-architecture) build.
const MACOS_UNIVERSAL_TARGETS: &[&str] =
    &["darwin-universal", "universal-apple-darwin", "macos-universal"];

/// Targets to probe in order. `None` stands for the default target.
pub fn candidate_targets(os: &str, extra: &[String]) -> Vec<Option<String>> {
    let mut targets = vec![None];
    if os == "macos" {
        targets.extend(MACOS_UNIVERSAL_TARGETS.iter().map(|t| Some(t.to_string())));
    }
    for target in extra {
        let target = Some(target.clone());
        if !targets.contains(&target) {
            targets.push(target);
        }
    }
    targets
}

/// `{os}-{arch}` of the running build, with macOS spelled `darwin`.
pub fn default_target() -> String {
    let os = match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    };
    format!("{os}-{}", std::env::consts::ARCH)
}

/// Whether this process runs from an installed build rather than a dev checkout.
pub fn is_packaged_shell() -> bool {
    match std::env::current_exe() {
        Ok(exe) => is_packaged_exe(&exe, std::env::consts::OS),
        Err(e) => {
            log::debug!("Cannot get current exe: {e}");
            false
        }
    }
}

fn is_packaged_exe(exe: &Path, os: &str) -> bool {
    if os == "macos" {
        return install::app_bundle_of(exe).is_some();
    }
    let parts: Vec<_> = exe.components().map(|c| c.as_os_str().to_string_lossy()).collect();
    !parts.windows(2).any(|w| w[0] == "target" && (w[1] == "debug" || w[1] == "release"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_platform_probes_single_target() {
        assert_eq!(candidate_targets("linux", &[]), vec![None]);
        assert_eq!(candidate_targets("windows", &[]), vec![None]);
    }

    #[test]
    fn macos_falls_back_to_universal_labels_in_order() {
        let targets = candidate_targets("macos", &[]);
        assert_eq!(
            targets,
            vec![
                None,
                Some("darwin-universal".to_string()),
                Some("universal-apple-darwin".to_string()),
                Some("macos-universal".to_string()),
            ]
        );
    }

    #[test]
    fn extra_targets_are_appended_without_duplicates() {
        let extra = vec!["darwin-universal".to_string(), "darwin-legacy".to_string()];
        let targets = candidate_targets("macos", &extra);
        assert_eq!(targets.len(), 5);
        assert_eq!(targets.last(), Some(&Some("darwin-legacy".to_string())));
    }

    #[test]
    fn default_target_has_os_and_arch() {
        let target = default_target();
        assert!(target.ends_with(std::env::consts::ARCH));
        assert!(!target.starts_with("macos"));
    }

    #[test]
    fn cargo_target_dir_is_not_packaged() {
        assert!(!is_packaged_exe(Path::new("/src/omo/target/debug/omo-updater"), "linux"));
        assert!(is_packaged_exe(Path::new("/usr/bin/omo-updater"), "linux"));
    }

    #[test]
    fn macos_requires_app_bundle() {
        assert!(is_packaged_exe(
            Path::new("/Applications/OMO Switch.app/Contents/MacOS/omo-switch"),
            "macos"
        ));
        assert!(!is_packaged_exe(Path::new("/usr/local/bin/omo-switch"), "macos"));
    }
}
