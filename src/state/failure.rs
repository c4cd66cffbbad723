//! Classification of check failures for user-facing notifications.

use crate::i18n::{Localizer, MessageKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckFailure {
    ManifestNotFound,
    KeyMisconfigured,
    Network,
    Unclassified,
}

impl CheckFailure {
    pub fn classify(raw: &str) -> Self {
        let msg = raw.to_lowercase();

        let not_found = msg.contains("404") || msg.contains("not found");
        let manifest = msg.contains("manifest")
            || msg.contains("latest.json")
            || msg.contains("release json");
        if not_found && manifest {
            return CheckFailure::ManifestNotFound;
        }

        if msg.contains("pubkey") || msg.contains("public key") {
            return CheckFailure::KeyMisconfigured;
        }

        const NETWORK_HINTS: &[&str] = &[
            "failed to connect",
            "connection refused",
            "connection reset",
            "error sending request",
            "dns error",
            "timed out",
            "timeout",
            "network",
        ];
        if NETWORK_HINTS.iter().any(|hint| msg.contains(hint)) {
            return CheckFailure::Network;
        }

        CheckFailure::Unclassified
    }

    pub fn message_key(self) -> Option<MessageKey> {
        match self {
            CheckFailure::ManifestNotFound => Some(MessageKey::ManifestMissing),
            CheckFailure::KeyMisconfigured => Some(MessageKey::KeyMisconfigured),
            CheckFailure::Network => Some(MessageKey::NetworkUnreachable),
            CheckFailure::Unclassified => None,
        }
    }
}

/// Notification text for a failed check. Unclassified errors are shown verbatim.
pub fn check_failure_text(raw: &str, localizer: &dyn Localizer) -> String {
    match CheckFailure::classify(raw).message_key() {
        Some(key) => localizer.text(key),
        None if raw.trim().is_empty() => localizer.text(MessageKey::CheckFailed),
        None => raw.to_string(),
    }
}
