//! Core error types.

use thiserror::Error;

/// Errors from tables and the step registry.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("row has {actual} cells but the table has {expected} columns")]
    RowLength { expected: usize, actual: usize },

    #[error("step value '{step_value}' is claimed by both '{first}' and '{second}'")]
    DuplicateStep {
        step_value: String,
        first: String,
        second: String,
    },

    #[error("expected {expected} step values, got {actual}")]
    ValueCountMismatch { expected: usize, actual: usize },

    #[error("step not implemented: {step_value}")]
    StepNotFound { step_value: String },

    #[error("step '{step_value}' failed: {source}")]
    StepFailed {
        step_value: String,
        #[source]
        source: StepFailure,
    },
}

/// Failure reported by a step implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StepFailure {
    pub message: String,
}

impl StepFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
