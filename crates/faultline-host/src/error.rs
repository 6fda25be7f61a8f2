//! Error types for host context collection.

use std::fmt;

use thiserror::Error;

/// The part of the host context being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPart {
    /// Authenticated identity.
    Identity,
    /// Request metadata.
    Request,
    /// Request body stream.
    RequestBody,
    /// Response metadata.
    Response,
    /// Session state.
    Session,
}

impl fmt::Display for HostPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostPart::Identity => write!(f, "identity"),
            HostPart::Request => write!(f, "request"),
            HostPart::RequestBody => write!(f, "request body"),
            HostPart::Response => write!(f, "response"),
            HostPart::Session => write!(f, "session"),
        }
    }
}

/// Errors reading the host context.
#[derive(Debug, Error)]
pub enum HostError {
    /// The part is not available right now.
    #[error("Host {part} unavailable: {reason}")]
    Unavailable {
        /// The part that could not be read.
        part: HostPart,
        /// Why it is unavailable.
        reason: String,
    },

    /// The host panicked while the part was read.
    #[error("Host {part} reader panicked: {message}")]
    Panicked {
        /// The part being read.
        part: HostPart,
        /// The panic message.
        message: String,
    },
}

impl HostError {
    /// Create an unavailable error.
    pub fn unavailable(part: HostPart, reason: impl Into<String>) -> Self {
        HostError::Unavailable {
            part,
            reason: reason.into(),
        }
    }

    /// The part that failed.
    pub fn part(&self) -> HostPart {
        match self {
            HostError::Unavailable { part, .. }
            | HostError::Panicked { part, .. } => *part,
        }
    }
}

/// Result type for host operations.
pub type HostResult<T> = std::result::Result<T, HostError>;
