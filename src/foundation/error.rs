/// Convenience result alias used across the crate.
pub type CanvasResult<T> = Result<T, CanvasError>;

#[derive(thiserror::Error, Debug)]
/// Top-level error type for editor state, storage and generation plumbing.
pub enum CanvasError {
    /// Input failed structural or numeric validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// A media reference could not be decoded or fetched.
    #[error("media error: {0}")]
    Media(String),

    /// Asset or key-value storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The external generation collaborator failed.
    #[error("generation error: {0}")]
    Generation(String),

    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Any other error with context.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CanvasError {
    /// Build [`CanvasError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build [`CanvasError::Media`].
    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media(msg.into())
    }

    /// Build [`CanvasError::Generation`].
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    /// Build [`CanvasError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// `true` when this error is a storage quota rejection.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::Storage(StorageError::QuotaExceeded { .. }))
    }
}

impl From<serde_json::Error> for CanvasError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[derive(thiserror::Error, Debug)]
/// Failures reported by storage collaborators.
///
/// Quota exhaustion is kept apart from every other failure so the save cycle can retry with
/// degraded retention instead of giving up.
pub enum StorageError {
    /// The backing store refused the write because it is full.
    #[error("quota exceeded writing '{slot}' ({needed} bytes)")]
    QuotaExceeded {
        /// Slot or key being written.
        slot: String,
        /// Size of the rejected payload.
        needed: usize,
    },

    /// The requested key does not exist.
    #[error("missing key '{0}'")]
    Missing(String),

    /// Underlying IO failure.
    #[error("io failure on '{path}': {source}")]
    Io {
        /// Path or key that failed.
        path: String,
        /// Source IO error.
        #[source]
        source: std::io::Error,
    },

    /// Generic backend failure.
    #[error("{0}")]
    Backend(String),
}

impl StorageError {
    /// Wrap an IO error with the path it failed on.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
