//! Error types for record sinks.

use thiserror::Error;

/// Errors delivering a record by email.
#[derive(Debug, Error)]
pub enum MailError {
    /// The transport could not send the message.
    #[error("Mail transport failed: {0}")]
    Transport(String),

    /// The server refused a recipient.
    #[error("Recipient rejected: {recipient}")]
    Rejected {
        /// The refused address.
        recipient: String,
    },

    /// IO error talking to the mail server.
    #[error("Mail IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for mail delivery.
pub type MailResult<T> = Result<T, MailError>;
