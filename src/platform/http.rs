//! Updater backed by a static JSON release manifest served over HTTP.
//!
//! Manifest format:
//!
//! ```json
//! {
//!   "version": "2.3.0",
//!   "notes": "…",
//!   "pub_date": "2026-03-01T12:00:00Z",
//!   "platforms": {
//!     "darwin-aarch64": { "url": "https://…/OMO-Switch.zip", "sha256": "…" }
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use futures::StreamExt as _;
use futures::channel::mpsc::UnboundedSender;
use futures::future::{BoxFuture, FutureExt as _};
use parking_lot::Mutex;
use semver::Version;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt as _;

use super::install::{self, RelaunchTarget};
use super::{UpdatePlatform, default_target, is_packaged_shell};
use crate::error::{Error, Result};
use crate::state::settings::UpdaterSettings;
use crate::state::updater::{Artifact, DownloadEvent, UpdateDescriptor};

#[derive(Debug, Deserialize)]
struct Manifest {
    version: String,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    pub_date: Option<String>,
    #[serde(default)]
    platforms: HashMap<String, PlatformEntry>,
}

#[derive(Debug, Deserialize)]
struct PlatformEntry {
    url: String,
    #[serde(default)]
    sha256: Option<String>,
}

pub struct HttpPlatform {
    client: reqwest::Client,
    endpoint: String,
    current_version: Version,
    supported: bool,
    cache_dir: PathBuf,
    /// Version and path of the last completed download.
    downloaded: Mutex<Option<(String, PathBuf)>>,
    relaunch_target: Mutex<Option<RelaunchTarget>>,
}

impl HttpPlatform {
    pub fn new(settings: &UpdaterSettings) -> Result<Self> {
        let supported = settings.force_enabled || is_packaged_shell();
        Self::with_options(
            settings.endpoint.clone(),
            env!("CARGO_PKG_VERSION"),
            supported,
            default_cache_dir(),
        )
    }

    pub fn with_options(
        endpoint: impl Into<String>,
        current_version: &str,
        supported: bool,
        cache_dir: PathBuf,
    ) -> Result<Self> {
        let current_version = parse_version(current_version)?;
        let client =
            reqwest::Client::builder().user_agent(format!("OMO-Switch/{current_version}")).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            current_version,
            supported,
            cache_dir,
            downloaded: Mutex::new(None),
            relaunch_target: Mutex::new(None),
        })
    }

    pub fn current_version(&self) -> &Version {
        &self.current_version
    }

    /// Path of the downloaded artifact for `version`, if any.
    pub fn downloaded_artifact(&self, version: &str) -> Option<PathBuf> {
        match &*self.downloaded.lock() {
            Some((v, path)) if v == version => Some(path.clone()),
            _ => None,
        }
    }

    fn manifest_url(&self, target: &str) -> String {
        self.endpoint
            .replace("{{target}}", target)
            .replace("{{arch}}", std::env::consts::ARCH)
            .replace("{{current_version}}", &self.current_version.to_string())
    }

    fn evaluate(&self, manifest: Manifest, target: &str) -> Result<Option<UpdateDescriptor>> {
        let remote = parse_version(&manifest.version)?;
        if remote <= self.current_version {
            log::debug!("Remote v{remote} is not newer than v{}", self.current_version);
            return Ok(None);
        }

        let entry = manifest
            .platforms
            .get(target)
            .ok_or_else(|| Error::TargetNotFound(target.to_string()))?;

        Ok(Some(UpdateDescriptor {
            version: remote.to_string(),
            date: manifest.pub_date,
            body: manifest.notes.filter(|n| !n.trim().is_empty()),
            artifact: Some(Artifact {
                target: target.to_string(),
                url: entry.url.clone(),
                sha256: entry.sha256.clone(),
            }),
        }))
    }

    async fn fetch_manifest(&self, target: &str) -> Result<Option<UpdateDescriptor>> {
        let url = self.manifest_url(target);
        log::debug!("Fetching update manifest: {url}");

        let resp = self.client.get(&url).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::ManifestNotFound(url));
        }
        let manifest: Manifest = resp.error_for_status()?.json().await?;
        self.evaluate(manifest, target)
    }

    async fn fetch_artifact(
        &self,
        artifact: &Artifact,
        path: &Path,
        events: &UnboundedSender<DownloadEvent>,
    ) -> Result<()> {
        let resp = self.client.get(&artifact.url).send().await?.error_for_status()?;
        let content_length = resp.content_length();
        let _ = events.unbounded_send(DownloadEvent::Started { content_length });

        let mut file = tokio::fs::File::create(path).await?;
        let mut hasher = Sha256::new();
        let mut stream = resp.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            hasher.update(&chunk);
            let _ = events
                .unbounded_send(DownloadEvent::Progress { chunk_length: chunk.len() as u64 });
        }
        file.flush().await?;

        if let Some(expected) = &artifact.sha256 {
            let actual = format!("{:x}", hasher.finalize());
            if !actual.eq_ignore_ascii_case(expected.trim()) {
                return Err(Error::Checksum { expected: expected.clone(), actual });
            }
        }

        let _ = events.unbounded_send(DownloadEvent::Finished);
        Ok(())
    }
}

impl UpdatePlatform for HttpPlatform {
    fn is_supported(&self) -> bool {
        self.supported && !self.endpoint.trim().is_empty()
    }

    fn check<'a>(
        &'a self,
        target: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Option<UpdateDescriptor>>> {
        async move {
            let target = target.map(str::to_string).unwrap_or_else(default_target);
            self.fetch_manifest(&target).await
        }
        .boxed()
    }

    fn download<'a>(
        &'a self,
        update: &'a UpdateDescriptor,
        events: UnboundedSender<DownloadEvent>,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let artifact =
                update.artifact.as_ref().ok_or_else(|| Error::NoArtifact(update.version.clone()))?;

            tokio::fs::create_dir_all(&self.cache_dir).await?;
            let path = self.cache_dir.join(artifact_file_name(&artifact.url, &update.version));
            log::info!("Downloading v{} to {}", update.version, path.display());

            if let Err(e) = self.fetch_artifact(artifact, &path, &events).await {
                let _ = tokio::fs::remove_file(&path).await;
                return Err(e);
            }

            *self.downloaded.lock() = Some((update.version.clone(), path));
            Ok(())
        }
        .boxed()
    }

    fn install<'a>(&'a self, update: &'a UpdateDescriptor) -> BoxFuture<'a, Result<()>> {
        async move {
            let path = self
                .downloaded_artifact(&update.version)
                .ok_or_else(|| Error::NoArtifact(update.version.clone()))?;

            let target = tokio::task::spawn_blocking(move || install::install_artifact(&path))
                .await
                .map_err(|e| Error::Install(e.to_string()))??;

            *self.relaunch_target.lock() = Some(target);
            *self.downloaded.lock() = None;
            Ok(())
        }
        .boxed()
    }

    fn relaunch(&self) -> BoxFuture<'_, Result<()>> {
        async move {
            let target = self
                .relaunch_target
                .lock()
                .clone()
                .ok_or_else(|| Error::Relaunch("no installed update to relaunch".to_string()))?;
            install::relaunch(&target)
        }
        .boxed()
    }
}

fn parse_version(raw: &str) -> Result<Version> {
    let trimmed = raw.trim();
    Ok(Version::parse(trimmed.strip_prefix('v').unwrap_or(trimmed))?)
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir().unwrap_or_else(std::env::temp_dir).join("com.omo-switch.app")
}

/// Last URL path segment, so the installer can dispatch on the extension.
fn artifact_file_name(url: &str, version: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.path_segments()?.next_back().map(str::to_string))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("omo-update-{version}"))
}
