//! Apply a downloaded artifact in place and restart into it.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};

const FALLBACK_BUNDLE: &str = "/Applications/OMO Switch.app";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// macOS zip holding an `.app` bundle.
    AppBundleZip,
    /// Windows setup program or MSI package.
    Installer,
    /// A replacement for the running executable (AppImage, bare binary).
    Executable,
}

impl ArtifactKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("zip") => ArtifactKind::AppBundleZip,
            Some("exe") | Some("msi") => ArtifactKind::Installer,
            _ => ArtifactKind::Executable,
        }
    }
}

/// What to start once the new version is in place.
#[derive(Debug, Clone)]
pub enum RelaunchTarget {
    Bundle(PathBuf),
    Executable(PathBuf),
    /// An external installer owns the restart; only exit.
    ExitOnly,
}

/// `Foo.app` for an executable at `Foo.app/Contents/MacOS/foo`.
pub fn app_bundle_of(exe: &Path) -> Option<PathBuf> {
    let bundle = exe.parent()?.parent()?.parent()?;
    if bundle.extension().is_some_and(|e| e == "app") { Some(bundle.to_path_buf()) } else { None }
}

/// Install `artifact` over the running application. Blocking; run off the event loop.
pub fn install_artifact(artifact: &Path) -> Result<RelaunchTarget> {
    let exe = std::env::current_exe()?;

    match ArtifactKind::from_path(artifact) {
        ArtifactKind::AppBundleZip => {
            let app_bundle = app_bundle_of(&exe).unwrap_or_else(|| {
                log::info!("Not running from .app bundle, will install to {FALLBACK_BUNDLE}");
                PathBuf::from(FALLBACK_BUNDLE)
            });
            install_app_bundle(&app_bundle, artifact)?;
            Ok(RelaunchTarget::Bundle(app_bundle))
        }
        ArtifactKind::Installer => {
            launch_installer(artifact)?;
            Ok(RelaunchTarget::ExitOnly)
        }
        ArtifactKind::Executable => {
            replace_executable(&exe, artifact)?;
            Ok(RelaunchTarget::Executable(exe))
        }
    }
}

/// Extract the zip next to the bundle, swap bundles keeping a backup until the move succeeds.
fn install_app_bundle(app_bundle: &Path, zip_path: &Path) -> Result<()> {
    let parent = app_bundle.parent().unwrap_or_else(|| Path::new("/tmp"));
    let temp_dir = parent.join(".omo-update-tmp");
    let _ = fs::remove_dir_all(&temp_dir);
    fs::create_dir_all(&temp_dir)?;

    let extract = Command::new("ditto").args(["-x", "-k"]).arg(zip_path).arg(&temp_dir).output()?;
    if !extract.status.success() {
        let _ = fs::remove_dir_all(&temp_dir);
        return Err(Error::Install(format!(
            "ditto extraction failed: {}",
            String::from_utf8_lossy(&extract.stderr)
        )));
    }

    let extracted_app = fs::read_dir(&temp_dir)?.find_map(|e| {
        let path = e.ok()?.path();
        if path.extension().is_some_and(|ext| ext == "app") { Some(path) } else { None }
    });
    let Some(extracted_app) = extracted_app else {
        let _ = fs::remove_dir_all(&temp_dir);
        return Err(Error::Install("no .app found in extracted update".to_string()));
    };

    let result = if app_bundle.exists() {
        swap_bundle(app_bundle, &extracted_app)
    } else {
        fs::rename(&extracted_app, app_bundle).map_err(|e| {
            Error::Install(format!("failed to move app to {}: {e}", app_bundle.display()))
        })
    };

    let _ = fs::remove_dir_all(&temp_dir);
    if result.is_ok() {
        let _ = fs::remove_file(zip_path);
    }
    result
}

fn swap_bundle(app_bundle: &Path, extracted_app: &Path) -> Result<()> {
    let backup = app_bundle.with_extension("app.bak");
    let _ = fs::remove_dir_all(&backup);

    fs::rename(app_bundle, &backup)
        .map_err(|e| Error::Install(format!("failed to move current app to backup: {e}")))?;

    if let Err(e) = fs::rename(extracted_app, app_bundle) {
        let _ = fs::rename(&backup, app_bundle);
        return Err(Error::Install(format!("failed to move extracted app into place: {e}")));
    }

    let _ = fs::remove_dir_all(&backup);
    Ok(())
}

fn launch_installer(artifact: &Path) -> Result<()> {
    let is_msi = artifact.extension().is_some_and(|e| e.eq_ignore_ascii_case("msi"));

    let spawned = if is_msi {
        Command::new("msiexec").arg("/i").arg(artifact).arg("/passive").spawn()
    } else {
        Command::new(artifact).spawn()
    };
    spawned.map(|_| ()).map_err(|e| Error::Install(format!("failed to start installer: {e}")))
}

/// Stage the new binary beside the old one, then rename over it.
fn replace_executable(exe: &Path, artifact: &Path) -> Result<()> {
    let staged = exe.with_extension("new");
    fs::copy(artifact, &staged)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&staged, fs::Permissions::from_mode(0o755))?;
    }

    if let Err(e) = fs::rename(&staged, exe) {
        let _ = fs::remove_file(&staged);
        return Err(Error::Install(format!("failed to replace {}: {e}", exe.display())));
    }
    let _ = fs::remove_file(artifact);
    Ok(())
}

/// Start the new version, then exit this process. Returns only on failure.
pub fn relaunch(target: &RelaunchTarget) -> Result<()> {
    let spawned = match target {
        RelaunchTarget::Bundle(bundle) => Command::new("open").arg("-n").arg(bundle).spawn(),
        RelaunchTarget::Executable(exe) => {
            Command::new(exe).args(std::env::args_os().skip(1)).spawn()
        }
        RelaunchTarget::ExitOnly => {
            log::info!("Installer launched, exiting");
            std::process::exit(0);
        }
    };

    spawned.map_err(|e| Error::Relaunch(e.to_string()))?;
    log::info!("Relaunched, exiting current process");
    std::process::exit(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_kind_from_extension() {
        assert_eq!(ArtifactKind::from_path(Path::new("a/OMO.zip")), ArtifactKind::AppBundleZip);
        assert_eq!(ArtifactKind::from_path(Path::new("setup.EXE")), ArtifactKind::Installer);
        assert_eq!(ArtifactKind::from_path(Path::new("omo.msi")), ArtifactKind::Installer);
        assert_eq!(ArtifactKind::from_path(Path::new("omo.AppImage")), ArtifactKind::Executable);
        assert_eq!(ArtifactKind::from_path(Path::new("omo")), ArtifactKind::Executable);
    }

    #[test]
    fn app_bundle_of_exe_inside_bundle() {
        let exe = Path::new("/Applications/OMO Switch.app/Contents/MacOS/omo");
        assert_eq!(app_bundle_of(exe), Some(PathBuf::from("/Applications/OMO Switch.app")));
        assert_eq!(app_bundle_of(Path::new("/usr/local/bin/omo")), None);
    }

    #[cfg(unix)]
    #[test]
    fn replace_executable_swaps_contents() {
        let dir = tempfile::TempDir::new().expect("failed to create temp dir");
        let exe = dir.path().join("omo");
        let artifact = dir.path().join("download.bin");
        fs::write(&exe, b"old").unwrap();
        fs::write(&artifact, b"new").unwrap();

        replace_executable(&exe, &artifact).expect("replace failed");

        assert_eq!(fs::read(&exe).unwrap(), b"new");
        assert!(!artifact.exists());
        assert!(!exe.with_extension("new").exists());
    }
}
