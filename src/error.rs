use thiserror::Error;

/// Updater error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid version: {0}")]
    Version(#[from] semver::Error),

    #[error("update check timed out after {0}s")]
    Timeout(u64),

    #[error("update manifest not found (HTTP 404): {0}")]
    ManifestNotFound(String),

    #[error("the update manifest has no `{0}` artifact")]
    TargetNotFound(String),

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    Checksum { expected: String, actual: String },

    #[error("no downloaded artifact for version {0}")]
    NoArtifact(String),

    #[error("Install failed: {0}")]
    Install(String),

    #[error("Relaunch failed: {0}")]
    Relaunch(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Message reported by an external update mechanism, kept verbatim.
    #[error("{0}")]
    Platform(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Connect and timeout failures keep a recognizable wording for classification.
        if err.is_connect() {
            Error::Network(format!("failed to connect: {err}"))
        } else if err.is_timeout() {
            Error::Network(format!("request timed out: {err}"))
        } else {
            Error::Http(err)
        }
    }
}

/// Convenience Result type using our Error
pub type Result<T> = std::result::Result<T, Error>;
