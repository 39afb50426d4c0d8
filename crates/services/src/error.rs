//! Shared error types for the services crate.

use thiserror::Error;

use lab_core::model::RecordError;

use crate::activity::Stage;

/// Errors emitted by the activity state machine.
///
/// Note the split with [`crate::activity::Submission`]: a rejected stage
/// input is a normal outcome the student recovers from by resubmitting,
/// while these are host programming errors — input fed to the wrong
/// stage, or mutation attempted after the record froze.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ActivityError {
    #[error("expected input for stage \"{expected}\", session is at stage \"{actual}\"")]
    StageMismatch { expected: Stage, actual: Stage },

    #[error("activity already completed")]
    Completed,

    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Errors absorbed inside the feedback provider; callers of the provider
/// trait only ever see fallback text.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FeedbackError {
    #[error("feedback service is not configured")]
    Disabled,

    #[error("feedback service returned an empty response")]
    EmptyResponse,

    #[error("feedback request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by the report exporter. Surfaced to the user as a
/// one-shot notice; the frozen record is untouched and export can simply
/// be retried.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
