//! Error types for the staff portal.

use crate::onboarding::state::StepId;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

}

/// File upload errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid upload path: {0}")]
    InvalidPath(String),

    #[error("Upload of {path} failed: {reason}")]
    UploadFailed { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A step draft failed its validator. Lists every failing field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Step {step} is incomplete: missing {}", .missing.join(", "))]
pub struct ValidationError {
    pub step: StepId,
    pub missing: Vec<&'static str>,
}

/// Errors surfaced by the onboarding controller.
///
/// None of these are fatal: the worst case is "stay on the current step".
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to save onboarding progress: {0}")]
    Persistence(#[from] DatabaseError),

    #[error("Failed to upload document: {0}")]
    Upload(#[from] StorageError),

    #[error("Onboarding is already completed")]
    Completed,

    #[error("Cannot edit {requested} while {active} is the active step")]
    InactiveStep { requested: StepId, active: StepId },

    #[error("Invalid draft: {0}")]
    InvalidDraft(String),

    #[error("File for {field} is {size} bytes; the limit is {max}")]
    FileTooLarge { field: String, size: usize, max: usize },
}

impl OnboardingError {
    /// Whether retrying the same action can succeed without user edits.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Upload(_))
    }
}
