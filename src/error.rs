use thiserror::Error;

/// Failures surfaced by the content loader and search paths.
#[derive(Debug, Error)]
pub enum ReaderError {
    /// The manifest could not be fetched or decoded.
    #[error("manifest unavailable: {locator}: {reason}")]
    ManifestUnavailable { locator: String, reason: String },

    /// The manifest was fetched but has no usable `files` sequence.
    #[error("manifest has unexpected shape: {0}")]
    CorruptedManifestShape(String),

    /// A single sub-chapter could not be fetched or decoded.
    #[error("sub-chapter unavailable: {file}: {reason}")]
    SubchapterUnavailable { file: String, reason: String },

    /// The worker channel closed or answered with something undecodable.
    #[error("worker transport failure: {0}")]
    WorkerTransport(String),

    /// The worker answered with an explicit `error` message.
    #[error("worker reported: {0}")]
    WorkerReported(String),

    /// A persisted edit record could not be decoded.
    #[error("malformed stored edit for id {id}: {reason}")]
    MalformedStoredEdit { id: String, reason: String },

    /// The requested chapter / sub-chapter is not in the manifest.
    #[error("position not found: chapter {chapter}, sub-chapter {subchapter_index}")]
    PositionNotFound {
        chapter: i64,
        subchapter_index: usize,
    },

    /// Reading or writing durable state failed.
    #[error("state store: {0:#}")]
    State(#[from] anyhow::Error),
}

impl ReaderError {
    pub fn subchapter(file: &str, reason: impl std::fmt::Display) -> Self {
        Self::SubchapterUnavailable {
            file: file.to_owned(),
            reason: reason.to_string(),
        }
    }

    /// Whether this failure should end navigation rather than degrade.
    pub fn is_fatal_to_navigation(&self) -> bool {
        matches!(
            self,
            Self::ManifestUnavailable { .. } | Self::CorruptedManifestShape(_)
        )
    }
}

pub type Result<T, E = ReaderError> = std::result::Result<T, E>;
