//! Pipeline error type.
//!
//! Errors carry a closed `ErrorKind` so callers can tell recoverable
//! degradation apart from fatal failure without string matching. Encoding
//! anomalies (unseen category, missing feature) are *not* errors — they are
//! recovered locally with documented defaults and never reach this type.

/// Closed enumeration of failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Training dataset path did not resolve.
    DataNotFound,
    /// Neither persisted artifact exists.
    ArtifactMissing,
    /// Exactly one artifact exists, or the pair tokens disagree.
    ArtifactInconsistent,
    /// Dataset rows could not be ingested into a usable training set.
    Dataset,
    /// Model invocation itself failed (non-finite output, empty ensemble).
    Prediction,
    /// Filesystem or serialization failure outside the artifact pair checks.
    Io,
    /// Invalid configuration value (ratios, seeds, thresholds, paths).
    InvalidConfig,
}

impl ErrorKind {
    /// Process exit code for this kind.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::InvalidConfig => 2,
            ErrorKind::DataNotFound | ErrorKind::Dataset => 3,
            ErrorKind::ArtifactMissing | ErrorKind::ArtifactInconsistent => 4,
            ErrorKind::Prediction => 5,
            ErrorKind::Io => 6,
        }
    }
}

#[derive(Clone)]
pub struct PipelineError {
    kind: ErrorKind,
    message: String,
}

impl PipelineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for PipelineError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_stable_exit_codes() {
        assert_eq!(ErrorKind::InvalidConfig.exit_code(), 2);
        assert_eq!(ErrorKind::DataNotFound.exit_code(), 3);
        assert_eq!(ErrorKind::ArtifactMissing.exit_code(), 4);
        assert_eq!(ErrorKind::ArtifactInconsistent.exit_code(), 4);
        assert_eq!(ErrorKind::Prediction.exit_code(), 5);
    }

    #[test]
    fn display_shows_message_only() {
        let err = PipelineError::new(ErrorKind::DataNotFound, "no dataset at /tmp/x");
        assert_eq!(err.to_string(), "no dataset at /tmp/x");
        assert_eq!(err.kind(), ErrorKind::DataNotFound);
    }
}
