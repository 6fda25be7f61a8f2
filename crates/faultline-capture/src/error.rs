//! Error types for the capture pipeline.

use faultline_host::HostError;
use faultline_sink::MailError;
use thiserror::Error;

/// A failure inside a capture, routed to the crash handler.
///
/// None of these ever reach the caller of `capture`.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The caller's enrichment callback failed.
    #[error("Enrichment callback failed: {0}")]
    Enrich(#[source] anyhow::Error),

    /// A registered extension failed.
    #[error("Extension '{name}' failed: {error}")]
    Extension {
        /// Extension name.
        name: String,
        /// The failure.
        #[source]
        error: anyhow::Error,
    },

    /// A host context part could not be read.
    #[error("Host context error: {0}")]
    Host(#[from] HostError),

    /// The mail transport failed.
    #[error("Mail delivery failed: {0}")]
    Mail(#[from] MailError),

    /// Runtime facts could not be read.
    #[error("Environment unavailable: {0}")]
    Environment(String),

    /// A collaborator panicked.
    #[error("{stage} panicked: {message}")]
    Panicked {
        /// The pipeline stage that was running.
        stage: &'static str,
        /// The panic message.
        message: String,
    },
}

impl CaptureError {
    /// Create a panic error for a pipeline stage.
    pub fn panicked(stage: &'static str, message: impl Into<String>) -> Self {
        Self::Panicked {
            stage,
            message: message.into(),
        }
    }
}

/// Misuse of a [`ThresholdTimer`](crate::ThresholdTimer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    /// `start` was called on a running timer.
    #[error("Timer already started")]
    AlreadyStarted,

    /// `start` was called after the timer stopped.
    #[error("Timer already stopped")]
    Stopped,
}

/// Result type for timer operations.
pub type TimerResult<T> = Result<T, TimerError>;
