//! Email notification of captured records.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use faultline_core::{CaptureConfig, CategorizedRecord, EventKind, truncate};

use crate::error::MailResult;

/// A rendered email message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    /// Sender address.
    pub from: String,
    /// Recipient addresses.
    pub to: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html_body: String,
}

/// Delivers rendered messages. Implemented by the host's mail client.
pub trait MailTransport: Send + Sync {
    /// Send a message.
    fn send(&self, message: &MailMessage) -> MailResult<()>;
}

/// A transport that keeps messages in memory.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: RwLock<Vec<MailMessage>>,
}

impl MemoryTransport {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far.
    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.read().clone()
    }

    /// Number of messages sent.
    pub fn len(&self) -> usize {
        self.sent.read().len()
    }

    /// Check if nothing was sent.
    pub fn is_empty(&self) -> bool {
        self.sent.read().is_empty()
    }
}

impl MailTransport for MemoryTransport {
    fn send(&self, message: &MailMessage) -> MailResult<()> {
        self.sent.write().push(message.clone());
        Ok(())
    }
}

/// Drops each message as an `.eml` file into a pickup directory, for a
/// local mail relay to send.
#[derive(Debug, Clone)]
pub struct PickupDirectoryTransport {
    dir: PathBuf,
}

impl PickupDirectoryTransport {
    /// Write messages into `dir`, which must already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn render(message: &MailMessage) -> String {
        format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nMIME-Version: 1.0\r\nContent-Type: text/html; charset=utf-8\r\n\r\n{}",
            message.from,
            message.to.join(", "),
            message.subject.replace(['\r', '\n'], " "),
            message.html_body
        )
    }
}

impl MailTransport for PickupDirectoryTransport {
    fn send(&self, message: &MailMessage) -> MailResult<()> {
        let path = self.dir.join(format!("{}.eml", uuid::Uuid::new_v4()));
        fs::write(&path, Self::render(message))?;
        tracing::debug!(event = "mail_dropped", path = %path.display());
        Ok(())
    }
}

/// Builds and sends one email per record.
///
/// Every record goes to `email_to`; `Fatal` records also go to
/// `fatal_email_to`. Nothing is sent when no recipient applies.
pub struct MailSink {
    transport: Arc<dyn MailTransport>,
    from: String,
    to: Option<String>,
    fatal_to: Option<String>,
    subject_prefix: String,
    subject_message_length: usize,
}

impl MailSink {
    /// Create a sink from configuration.
    ///
    /// Returns `None` when no recipient is configured.
    pub fn from_config(config: &CaptureConfig, transport: Arc<dyn MailTransport>) -> Option<Self> {
        if !config.has_email_recipients() {
            return None;
        }
        Some(Self {
            transport,
            from: config.email_from.clone(),
            to: config.email_to.clone(),
            fatal_to: config.fatal_email_to.clone(),
            subject_prefix: config.subject_prefix.clone(),
            subject_message_length: config.subject_message_length,
        })
    }

    /// Build the subject line for a record.
    pub fn subject(&self, record: &CategorizedRecord) -> String {
        let message = truncate(record.message(), self.subject_message_length).unwrap_or_default();
        format!(
            "{}{}: {} ({})",
            self.subject_prefix,
            record.kind(),
            message,
            record.signature().unwrap_or("")
        )
    }

    /// Build the message for a record, if any recipient applies.
    pub fn build_message(&self, record: &CategorizedRecord) -> Option<MailMessage> {
        let mut to = Vec::new();
        if let Some(addr) = &self.to {
            to.push(addr.clone());
        }
        if record.kind() == EventKind::Fatal {
            if let Some(addr) = &self.fatal_to {
                to.push(addr.clone());
            }
        }
        if to.is_empty() {
            return None;
        }
        Some(MailMessage {
            from: self.from.clone(),
            to,
            subject: self.subject(record),
            html_body: record.render_report(),
        })
    }

    /// Send the record. Returns whether a message was sent.
    pub fn deliver(&self, record: &CategorizedRecord) -> MailResult<bool> {
        let Some(message) = self.build_message(record) else {
            return Ok(false);
        };
        self.transport.send(&message)?;
        tracing::debug!(
            event = "mail_sent",
            recipients = message.to.len(),
            subject = message.subject.as_str(),
            "Record mailed"
        );
        Ok(true)
    }
}

impl std::fmt::Debug for MailSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailSink")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("fatal_to", &self.fatal_to)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MailError;

    fn record(kind: EventKind, message: &str) -> CategorizedRecord {
        let mut record = CategorizedRecord::with_message(kind, message);
        record.set_signature("a1b2");
        record
    }

    #[test]
    fn test_no_recipients_no_sink() {
        let transport = Arc::new(MemoryTransport::new());
        assert!(MailSink::from_config(&CaptureConfig::default(), transport).is_none());
    }

    #[test]
    fn test_subject_line() {
        let config = CaptureConfig::default().with_email_to("ops@example.com").unwrap();
        let sink = MailSink::from_config(&config, Arc::new(MemoryTransport::new())).unwrap();

        let long = "x".repeat(80);
        let subject = sink.subject(&record(EventKind::Error, &long));
        assert_eq!(subject, format!("[Log] Error: {}... (a1b2)", "x".repeat(50)));

        let subject = sink.subject(&record(EventKind::Warning, "short"));
        assert_eq!(subject, "[Log] Warning: short (a1b2)");
    }

    #[test]
    fn test_fatal_recipient() {
        let config = CaptureConfig::default()
            .with_fatal_email_to("oncall@example.com")
            .unwrap();
        let transport = Arc::new(MemoryTransport::new());
        let sink = MailSink::from_config(&config, Arc::clone(&transport) as Arc<dyn MailTransport>).unwrap();

        assert!(!sink.deliver(&record(EventKind::Error, "e")).unwrap());
        assert!(sink.deliver(&record(EventKind::Fatal, "f")).unwrap());

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["oncall@example.com"]);
        assert_eq!(sent[0].from, "nobody@test.com");
        assert!(sent[0].html_body.contains("Fatal: f"));
    }

    #[test]
    fn test_transport_failure_propagates() {
        struct Down;
        impl MailTransport for Down {
            fn send(&self, _message: &MailMessage) -> MailResult<()> {
                Err(MailError::Transport("connection refused".into()))
            }
        }

        let config = CaptureConfig::default().with_email_to("ops@example.com").unwrap();
        let sink = MailSink::from_config(&config, Arc::new(Down)).unwrap();
        assert!(matches!(
            sink.deliver(&record(EventKind::Error, "e")),
            Err(MailError::Transport(_))
        ));
    }

    #[test]
    fn test_pickup_directory_writes_eml() {
        let dir = tempfile::tempdir().unwrap();
        let transport = PickupDirectoryTransport::new(dir.path());
        let message = MailMessage {
            from: "faults@example.com".into(),
            to: vec!["ops@example.com".into(), "oncall@example.com".into()],
            subject: "[Log] Fatal: down\r\nBcc: x@example.com".into(),
            html_body: "<p>down</p>".into(),
        };
        transport.send(&message).unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        let text = std::fs::read_to_string(files[0].as_ref().unwrap().path()).unwrap();
        assert!(text.contains("To: ops@example.com, oncall@example.com\r\n"));
        assert!(!text.contains("\r\nBcc:"));
        assert!(text.ends_with("\r\n\r\n<p>down</p>"));
    }

    #[test]
    fn test_pickup_directory_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let transport = PickupDirectoryTransport::new(dir.path().join("absent"));
        let message = MailMessage {
            from: "faults@example.com".into(),
            to: vec!["ops@example.com".into()],
            subject: "s".into(),
            html_body: String::new(),
        };
        assert!(matches!(transport.send(&message), Err(MailError::Io(_))));
    }
}
