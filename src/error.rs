use thiserror::Error;
use tokio::task::JoinError;

#[derive(Debug, Clone, Error)]
pub enum VerifierError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Invalid input format: {0}")]
    Format(String),

    #[error("verification error: {0}")]
    Verification(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Worker failed: {0}")]
    WorkerFailed(String),
}

impl VerifierError {
    /// Per-address failures are absorbed by the worker that hit them;
    /// everything else aborts the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, VerifierError::Verification(_))
    }
}

impl From<std::io::Error> for VerifierError {
    fn from(err: std::io::Error) -> Self {
        VerifierError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for VerifierError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            VerifierError::Io(err.to_string())
        } else {
            VerifierError::Format(err.to_string())
        }
    }
}

impl From<JoinError> for VerifierError {
    fn from(err: JoinError) -> Self {
        VerifierError::WorkerFailed(err.to_string())
    }
}
