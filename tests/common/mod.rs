//! Scripted platform and notifier doubles shared by the integration tests.
//!
//! `MockPlatform` answers each `check`/`download`/`install` call with the next
//! scripted step. Delays go through `tokio::time::sleep`, so tests running with
//! `start_paused = true` advance instantly but still interleave deterministically.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use futures::channel::mpsc::UnboundedSender;
use futures::future::{BoxFuture, FutureExt as _};
use omo_updater::i18n::Locale;
use omo_updater::state::{Notifier, StatusLevel, StatusMessage};
use omo_updater::{
    ControllerOptions, DownloadEvent, Error, Result, UpdateController, UpdateDescriptor,
    UpdatePlatform,
};
use parking_lot::Mutex;

pub enum CheckOutcome {
    Found(UpdateDescriptor),
    UpToDate,
    Fail(String),
    /// Never resolves; only the controller's timeout ends it.
    Hang,
}

pub struct CheckStep {
    pub delay: Duration,
    pub outcome: CheckOutcome,
}

impl CheckStep {
    pub fn found(version: &str) -> Self {
        Self { delay: Duration::ZERO, outcome: CheckOutcome::Found(UpdateDescriptor::new(version)) }
    }

    pub fn up_to_date() -> Self {
        Self { delay: Duration::ZERO, outcome: CheckOutcome::UpToDate }
    }

    pub fn fail(message: &str) -> Self {
        Self { delay: Duration::ZERO, outcome: CheckOutcome::Fail(message.to_string()) }
    }

    pub fn hang() -> Self {
        Self { delay: Duration::ZERO, outcome: CheckOutcome::Hang }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

pub struct DownloadStep {
    pub events: Vec<DownloadEvent>,
    /// Pause before each event.
    pub delay: Duration,
    pub result: std::result::Result<(), String>,
}

impl DownloadStep {
    pub fn ok(events: Vec<DownloadEvent>) -> Self {
        Self { events, delay: Duration::ZERO, result: Ok(()) }
    }

    pub fn fail(events: Vec<DownloadEvent>, message: &str) -> Self {
        Self { events, delay: Duration::ZERO, result: Err(message.to_string()) }
    }

    pub fn paced(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// The download from the end-to-end scenarios: 1000 bytes in two 400-byte chunks.
pub fn thousand_byte_download() -> DownloadStep {
    DownloadStep::ok(vec![
        DownloadEvent::Started { content_length: Some(1000) },
        DownloadEvent::Progress { chunk_length: 400 },
        DownloadEvent::Progress { chunk_length: 400 },
        DownloadEvent::Finished,
    ])
}

#[derive(Default)]
pub struct MockPlatform {
    unsupported: AtomicBool,
    checks: Mutex<VecDeque<CheckStep>>,
    downloads: Mutex<VecDeque<DownloadStep>>,
    installs: Mutex<VecDeque<(Duration, std::result::Result<(), String>)>>,
    relaunch_error: Mutex<Option<String>>,
    pub check_calls: Mutex<Vec<Option<String>>>,
    pub download_calls: AtomicUsize,
    pub install_calls: AtomicUsize,
    pub relaunch_calls: AtomicUsize,
}

impl MockPlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_supported(&self, supported: bool) {
        self.unsupported.store(!supported, Ordering::SeqCst);
    }

    pub fn push_check(&self, step: CheckStep) {
        self.checks.lock().push_back(step);
    }

    pub fn push_download(&self, step: DownloadStep) {
        self.downloads.lock().push_back(step);
    }

    pub fn push_install(&self, result: std::result::Result<(), String>) {
        self.installs.lock().push_back((Duration::ZERO, result));
    }

    pub fn push_slow_install(&self, delay: Duration) {
        self.installs.lock().push_back((delay, Ok(())));
    }

    pub fn fail_relaunch(&self, message: &str) {
        *self.relaunch_error.lock() = Some(message.to_string());
    }

    pub fn check_count(&self) -> usize {
        self.check_calls.lock().len()
    }

    pub fn checked_targets(&self) -> Vec<Option<String>> {
        self.check_calls.lock().clone()
    }
}

impl UpdatePlatform for MockPlatform {
    fn is_supported(&self) -> bool {
        !self.unsupported.load(Ordering::SeqCst)
    }

    fn check<'a>(
        &'a self,
        target: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Option<UpdateDescriptor>>> {
        self.check_calls.lock().push(target.map(str::to_string));
        let step = self.checks.lock().pop_front().unwrap_or_else(CheckStep::up_to_date);

        async move {
            if !step.delay.is_zero() {
                tokio::time::sleep(step.delay).await;
            }
            match step.outcome {
                CheckOutcome::Found(update) => Ok(Some(update)),
                CheckOutcome::UpToDate => Ok(None),
                CheckOutcome::Fail(message) => Err(Error::Platform(message)),
                CheckOutcome::Hang => futures::future::pending().await,
            }
        }
        .boxed()
    }

    fn download<'a>(
        &'a self,
        _update: &'a UpdateDescriptor,
        events: UnboundedSender<DownloadEvent>,
    ) -> BoxFuture<'a, Result<()>> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        let step = self.downloads.lock().pop_front().unwrap_or_else(thousand_byte_download);

        async move {
            for event in step.events {
                if !step.delay.is_zero() {
                    tokio::time::sleep(step.delay).await;
                }
                let _ = events.unbounded_send(event);
            }
            step.result.map_err(Error::Platform)
        }
        .boxed()
    }

    fn install<'a>(&'a self, _update: &'a UpdateDescriptor) -> BoxFuture<'a, Result<()>> {
        self.install_calls.fetch_add(1, Ordering::SeqCst);
        let (delay, result) = self.installs.lock().pop_front().unwrap_or((Duration::ZERO, Ok(())));

        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result.map_err(Error::Install)
        }
        .boxed()
    }

    fn relaunch(&self) -> BoxFuture<'_, Result<()>> {
        self.relaunch_calls.fetch_add(1, Ordering::SeqCst);
        let error = self.relaunch_error.lock().clone();
        async move {
            match error {
                Some(message) => Err(Error::Relaunch(message)),
                None => Ok(()),
            }
        }
        .boxed()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<StatusMessage>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<StatusMessage> {
        self.messages.lock().clone()
    }

    pub fn of_level(&self, level: StatusLevel) -> Vec<String> {
        self.messages.lock().iter().filter(|m| m.level == level).map(|m| m.text.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: StatusMessage) {
        self.messages.lock().push(message);
    }
}

pub fn options(targets: Vec<Option<&str>>) -> ControllerOptions {
    ControllerOptions {
        check_timeout: Duration::from_secs(12),
        targets: targets.into_iter().map(|t| t.map(str::to_string)).collect(),
    }
}

/// Controller over `platform` probing only the default target, English messages.
pub fn controller(platform: &Arc<MockPlatform>) -> (UpdateController, Arc<RecordingNotifier>) {
    controller_with(platform, options(vec![None]))
}

pub fn controller_with(
    platform: &Arc<MockPlatform>,
    options: ControllerOptions,
) -> (UpdateController, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let controller = UpdateController::new(
        platform.clone(),
        notifier.clone(),
        Arc::new(Locale::En),
        options,
    );
    (controller, notifier)
}
