//! Transient user notifications.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

impl StatusMessage {
    pub fn success(text: impl Into<String>) -> Self {
        Self { level: StatusLevel::Success, text: text.into() }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self { level: StatusLevel::Info, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { level: StatusLevel::Error, text: text.into() }
    }
}

/// Fire-and-forget sink for toast-style messages.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: StatusMessage);
}

/// Routes notifications into the log. Used by the headless runner.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: StatusMessage) {
        match message.level {
            StatusLevel::Success | StatusLevel::Info => log::info!("{}", message.text),
            StatusLevel::Error => log::error!("{}", message.text),
        }
    }
}
