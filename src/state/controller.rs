//! Self-update controller: check, download, install, relaunch.
//!
//! All state lives in a [`watch`] channel owned by the controller. Each of the
//! three operations keeps at most one task in flight. The task is spawned onto
//! the runtime, so dropping a caller never stops it; callers arriving while one
//! runs await the same shared handle instead of starting another.
//!
//! Checks carry a sequence number. A check applies its result only if its number
//! is still the latest when it settles, so a slow check started before a
//! [`UpdateController::reset`] can never overwrite newer state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::StreamExt as _;
use futures::channel::mpsc;
use futures::future::{BoxFuture, FutureExt as _, Shared};
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::i18n::{Localizer, MessageKey};
use crate::platform::{UpdatePlatform, candidate_targets};
use crate::state::failure::check_failure_text;
use crate::state::settings::UpdaterSettings;
use crate::state::status::{Notifier, StatusMessage};
use crate::state::updater::{
    CheckOptions, ControllerState, DownloadProgress, UpdateDescriptor, UpdateStatus,
};

type Flight = Shared<BoxFuture<'static, ()>>;

struct InFlight {
    id: u64,
    task: Flight,
}

/// Holder for the single running task of one operation category.
#[derive(Default)]
struct FlightSlot(Mutex<Option<InFlight>>);

impl FlightSlot {
    /// Join the running task, or spawn one built by `start`. `start` returning `None` is a
    /// no-op. Must be called from within a tokio runtime.
    fn join_or_start(
        &self,
        start: impl FnOnce() -> Option<(u64, BoxFuture<'static, ()>)>,
    ) -> Option<Flight> {
        let mut slot = self.0.lock();
        if let Some(flight) = slot.as_ref() {
            return Some(flight.task.clone());
        }
        let (id, fut) = start()?;
        let handle = tokio::spawn(fut);
        let task = handle
            .map(move |joined| {
                if let Err(e) = joined {
                    log::error!("Update task {id} ended abnormally: {e}");
                }
            })
            .boxed()
            .shared();
        *slot = Some(InFlight { id, task: task.clone() });
        Some(task)
    }

    /// Clear the slot if it still holds task `id`.
    fn release(&self, id: u64) {
        let mut slot = self.0.lock();
        if slot.as_ref().is_some_and(|flight| flight.id == id) {
            *slot = None;
        }
    }

    fn detach(&self) {
        self.0.lock().take();
    }

    fn is_busy(&self) -> bool {
        self.0.lock().is_some()
    }
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Applied to each target probe separately.
    pub check_timeout: Duration,
    /// Targets to probe in order; `None` is the running build's default target.
    pub targets: Vec<Option<String>>,
}

impl ControllerOptions {
    pub fn from_settings(settings: &UpdaterSettings) -> Self {
        Self {
            check_timeout: settings.check_timeout(),
            targets: candidate_targets(std::env::consts::OS, &settings.extra_targets),
        }
    }
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self::from_settings(&UpdaterSettings::default())
    }
}

struct Inner {
    platform: Arc<dyn UpdatePlatform>,
    notifier: Arc<dyn Notifier>,
    localizer: Arc<dyn Localizer>,
    options: ControllerOptions,
    state: watch::Sender<ControllerState>,
    check_seq: AtomicU64,
    /// Bumped by reset; download/install results from an older epoch are dropped.
    epoch: AtomicU64,
    flight_ids: AtomicU64,
    checking: FlightSlot,
    downloading: FlightSlot,
    installing: FlightSlot,
}

/// Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct UpdateController {
    inner: Arc<Inner>,
}

impl UpdateController {
    pub fn new(
        platform: Arc<dyn UpdatePlatform>,
        notifier: Arc<dyn Notifier>,
        localizer: Arc<dyn Localizer>,
        options: ControllerOptions,
    ) -> Self {
        let (state, _) = watch::channel(ControllerState::default());
        Self {
            inner: Arc::new(Inner {
                platform,
                notifier,
                localizer,
                options,
                state,
                check_seq: AtomicU64::new(0),
                epoch: AtomicU64::new(0),
                flight_ids: AtomicU64::new(0),
                checking: FlightSlot::default(),
                downloading: FlightSlot::default(),
                installing: FlightSlot::default(),
            }),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ControllerState {
        self.inner.state.borrow().clone()
    }

    pub fn status(&self) -> UpdateStatus {
        self.inner.state.borrow().status
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<ControllerState> {
        self.inner.state.subscribe()
    }

    pub fn is_checking(&self) -> bool {
        self.inner.checking.is_busy()
    }

    pub fn open(&self) {
        self.inner.state.send_modify(|s| s.is_open = true);
    }

    pub fn close(&self) {
        self.inner.state.send_modify(|s| s.is_open = false);
    }

    /// Return to the initial state. Operations still in flight finish in the
    /// background but their results are discarded.
    pub fn reset(&self) {
        let inner = &self.inner;
        inner.epoch.fetch_add(1, Ordering::SeqCst);
        inner.check_seq.fetch_add(1, Ordering::SeqCst);
        inner.checking.detach();
        inner.downloading.detach();
        inner.installing.detach();
        inner.state.send_replace(ControllerState::default());
        log::debug!("Update controller reset");
    }

    /// Ask the remote for a newer version.
    ///
    /// Joins a check already in flight; the options of the call that started it apply.
    pub async fn check_for_updates(&self, options: CheckOptions) {
        let inner = &self.inner;
        if !inner.platform.is_supported() {
            log::debug!("Update check skipped: updater not available");
            return;
        }

        let task = inner.checking.join_or_start(|| {
            let status = inner.state.borrow().status;
            let settled = matches!(
                status,
                UpdateStatus::Idle | UpdateStatus::Error | UpdateStatus::Available
            );
            if !settled {
                log::debug!("Update check skipped while {}", status.label());
                return None;
            }
            let seq = inner.check_seq.fetch_add(1, Ordering::SeqCst) + 1;
            let runner = Arc::clone(inner);
            Some((seq, async move { runner.run_check(seq, options).await }.boxed()))
        });

        if let Some(task) = task {
            task.await;
        }
    }

    /// Download the artifact of the current update.
    pub async fn download_update(&self) {
        let inner = &self.inner;
        if !inner.platform.is_supported() {
            return;
        }

        let task = inner.downloading.join_or_start(|| {
            let (status, update) = {
                let state = inner.state.borrow();
                (state.status, state.update.clone())
            };
            let update = update?;
            if matches!(
                status,
                UpdateStatus::Checking
                    | UpdateStatus::Downloading
                    | UpdateStatus::Downloaded
                    | UpdateStatus::Installing
                    | UpdateStatus::Installed
            ) {
                log::debug!("Download skipped while {}", status.label());
                return None;
            }
            let id = inner.next_flight_id();
            let runner = Arc::clone(inner);
            Some((id, async move { runner.run_download(id, update).await }.boxed()))
        });

        if let Some(task) = task {
            task.await;
        }
    }

    /// Install the downloaded update, then relaunch. Only valid once downloaded.
    pub async fn install_update(&self) {
        let inner = &self.inner;
        if !inner.platform.is_supported() {
            return;
        }

        let task = inner.installing.join_or_start(|| {
            let (status, update) = {
                let state = inner.state.borrow();
                (state.status, state.update.clone())
            };
            let update = update?;
            if status != UpdateStatus::Downloaded {
                log::debug!("Install skipped while {}", status.label());
                return None;
            }
            let id = inner.next_flight_id();
            let runner = Arc::clone(inner);
            Some((id, async move { runner.run_install(id, update).await }.boxed()))
        });

        if let Some(task) = task {
            task.await;
        }
    }
}

impl Inner {
    fn next_flight_id(&self) -> u64 {
        self.flight_ids.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn notify(&self, message: StatusMessage) {
        self.notifier.notify(message);
    }

    /// Download and install failures prefix the raw error with the localized headline.
    fn failure_text(&self, key: MessageKey, raw: &str) -> String {
        format!("{}: {raw}", self.localizer.text(key))
    }

    async fn run_check(self: Arc<Self>, seq: u64, options: CheckOptions) {
        log::info!("Checking for updates (#{seq})");
        self.state.send_modify(|s| {
            s.status = UpdateStatus::Checking;
            s.update = None;
            s.progress = None;
            s.error = None;
        });

        let result = self.probe_targets().await;
        self.checking.release(seq);

        if self.check_seq.load(Ordering::SeqCst) != seq {
            log::debug!("Discarding stale update check #{seq}");
            return;
        }

        match result {
            Ok(None) => {
                log::info!("No update available");
                self.state.send_modify(|s| {
                    s.status = UpdateStatus::Idle;
                    s.update = None;
                });
                if !options.silent {
                    self.notify(StatusMessage::success(self.localizer.text(MessageKey::UpToDate)));
                }
            }
            Ok(Some(update)) => {
                log::info!("Update found: v{}", update.version);
                self.state.send_modify(|s| {
                    s.status = UpdateStatus::Available;
                    s.update = Some(update);
                    if options.open_if_available {
                        s.is_open = true;
                    }
                });
            }
            Err(e) => {
                let raw = e.to_string();
                log::warn!("Update check failed: {raw}");
                self.state.send_modify(|s| {
                    s.status = UpdateStatus::Error;
                    s.error = Some(raw.clone());
                });
                if !options.silent {
                    self.notify(StatusMessage::error(check_failure_text(
                        &raw,
                        self.localizer.as_ref(),
                    )));
                }
            }
        }
    }

    /// First target that answers wins; otherwise the last error is returned.
    async fn probe_targets(&self) -> Result<Option<UpdateDescriptor>> {
        let timeout = self.options.check_timeout;
        let mut last_error = None;

        for target in &self.options.targets {
            let label = target.as_deref().unwrap_or("default");
            let probe = self.platform.check(target.as_deref());
            match tokio::time::timeout(timeout, probe).await {
                Ok(Ok(found)) => return Ok(found),
                Ok(Err(e)) => {
                    log::warn!("Update check for target {label} failed: {e}");
                    last_error = Some(e);
                }
                Err(_) => {
                    log::warn!("Update check for target {label} timed out");
                    last_error = Some(Error::Timeout(timeout.as_secs()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Unsupported("no update targets".to_string())))
    }

    async fn run_download(self: Arc<Self>, id: u64, update: UpdateDescriptor) {
        let epoch = self.epoch.load(Ordering::SeqCst);
        log::info!("Downloading update v{}", update.version);
        self.state.send_modify(|s| {
            s.status = UpdateStatus::Downloading;
            s.progress = Some(DownloadProgress::default());
            s.error = None;
        });

        let (events_tx, mut events_rx) = mpsc::unbounded();
        let download = self.platform.download(&update, events_tx);
        let pump = async {
            while let Some(event) = events_rx.next().await {
                if self.epoch.load(Ordering::SeqCst) != epoch {
                    continue;
                }
                self.state.send_modify(|s| {
                    if let Some(progress) = s.progress.as_mut() {
                        progress.apply(&event);
                    }
                });
            }
        };
        let (result, ()) = futures::join!(download, pump);
        self.downloading.release(id);

        if self.epoch.load(Ordering::SeqCst) != epoch {
            log::debug!("Discarding download result after reset");
            return;
        }

        match result {
            Ok(()) => {
                log::info!("Update v{} downloaded", update.version);
                self.state.send_modify(|s| s.status = UpdateStatus::Downloaded);
                self.notify(StatusMessage::success(
                    self.localizer.text(MessageKey::DownloadComplete),
                ));
            }
            Err(e) => {
                let raw = e.to_string();
                log::error!("Update download failed: {raw}");
                self.state.send_modify(|s| {
                    s.status = UpdateStatus::Error;
                    s.progress = None;
                    s.error = Some(raw.clone());
                });
                let text = self.failure_text(MessageKey::DownloadFailed, &raw);
                self.notify(StatusMessage::error(text));
            }
        }
    }

    async fn run_install(self: Arc<Self>, id: u64, update: UpdateDescriptor) {
        let epoch = self.epoch.load(Ordering::SeqCst);
        log::info!("Installing update v{}", update.version);
        self.state.send_modify(|s| {
            s.status = UpdateStatus::Installing;
            s.progress = None;
            s.error = None;
        });

        let result = self.platform.install(&update).await;

        if self.epoch.load(Ordering::SeqCst) != epoch {
            log::debug!("Discarding install result after reset");
            self.installing.release(id);
            return;
        }

        match result {
            Ok(()) => {
                log::info!("Update v{} installed, relaunching", update.version);
                self.state.send_modify(|s| s.status = UpdateStatus::Installed);
                self.notify(StatusMessage::success(
                    self.localizer.text(MessageKey::InstallComplete),
                ));

                // Install stays successful even when the relaunch does not happen.
                if let Err(e) = self.platform.relaunch().await {
                    log::warn!("Relaunch after update failed: {e}");
                    self.state.send_modify(|s| s.needs_manual_restart = true);
                    self.notify(StatusMessage::info(
                        self.localizer.text(MessageKey::RestartManually),
                    ));
                }
            }
            Err(e) => {
                let raw = e.to_string();
                log::error!("Update install failed: {raw}");
                self.state.send_modify(|s| {
                    s.status = UpdateStatus::Error;
                    s.error = Some(raw.clone());
                });
                let text = self.failure_text(MessageKey::InstallFailed, &raw);
                self.notify(StatusMessage::error(text));
            }
        }

        self.installing.release(id);
    }
}
