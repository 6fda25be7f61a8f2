//! # Faultline - Categorized Diagnostic Records
//!
//! Faultline captures a snapshot of program and environment state when
//! something noteworthy happens: an error, a fault with a cause chain, or a
//! timed region running over budget. Each snapshot is a
//! [`CategorizedRecord`] with a deterministic call-site signature for
//! grouping recurring events.
//!
//! ## Features
//!
//! - **Categorized records**: Facts grouped by category, serializable to JSON
//!   and renderable as an HTML report
//! - **Signatures**: Short hex fingerprints of the top interesting stack frames
//! - **Redaction**: Sensitive request fields replaced by length placeholders
//! - **Isolation**: Failing collaborators never break the caller
//! - **Threshold timers**: `PerfIssue` records for slow regions
//!
//! ## Quick Start
//!
//! ```
//! use faultline::prelude::*;
//!
//! let collected = Arc::new(CollectingExtension::new(100));
//! let logger = Faultline::builder()
//!     .with_subject_prefix("[shop] ")
//!     .with_extension(Arc::clone(&collected) as Arc<dyn Extension>)
//!     .build()
//!     .unwrap();
//!
//! let record = logger
//!     .capture(
//!         CaptureRequest::new(EventKind::Error)
//!             .message("payment declined for order {0}")
//!             .arg(4411)
//!             .enrich(|record| {
//!                 record.set_user_data("Gateway", "stripe");
//!                 Ok(())
//!             }),
//!     )
//!     .unwrap();
//!
//! assert_eq!(record.message(), "payment declined for order 4411");
//! assert_eq!(collected.len(), 1);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Your Application                     │
//! ├─────────────────────────────────────────────────────────┤
//! │                   faultline (facade)                    │
//! │          Faultline Builder · default logger             │
//! ├─────────────────────────────────────────────────────────┤
//! │                   faultline-capture                     │
//! │   Logger pipeline · signatures · faults · timers        │
//! ├──────────────────┬───────────────────┬──────────────────┤
//! │  faultline-host  │  faultline-sink   │  faultline-core  │
//! │  (request facts) │  (mail, file,     │  (records,       │
//! │                  │   extensions)     │   redaction)     │
//! └──────────────────┴───────────────────┴──────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use faultline_capture::{CaptureError, LoggerBuilder, SharedLogger};
use faultline_core::{CaptureConfig, CategorizedRecord};
use faultline_host::HostContextProvider;
use faultline_sink::{Extension, FileExtension, LoggingExtension, MailTransport};

pub mod global;

// Re-export from sub-crates
pub use faultline_capture;
pub use faultline_core;
pub use faultline_host;
pub use faultline_sink;

pub use faultline_capture::{CaptureRequest, Fault, ThresholdTimer};
pub use faultline_core::{EventKind, FieldValue};
pub use global::{
    default_logger, log_capture, log_error, log_exception, log_fatal, log_info,
    log_invalid_code_path, log_perf_issue, log_warning, set_default_logger,
};

/// Main entry point for Faultline.
pub struct Faultline;

impl Faultline {
    /// Create a new logger builder.
    pub fn builder() -> FaultlineBuilder {
        FaultlineBuilder::new()
    }

    /// Create a logger with default configuration.
    pub fn with_defaults() -> Result<SharedLogger, FaultlineError> {
        FaultlineBuilder::new().build()
    }
}

/// Builder for configuring a logger.
pub struct FaultlineBuilder {
    config: CaptureConfig,
    logger: LoggerBuilder,
    json_file: Option<PathBuf>,
}

impl FaultlineBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: CaptureConfig::default(),
            logger: LoggerBuilder::new(),
            json_file: None,
        }
    }

    /// Replace the whole capture configuration.
    pub fn with_config(mut self, config: CaptureConfig) -> Self {
        self.config = config;
        self
    }

    // Capture limits

    /// Set the maximum captured form value length. Zero disables form capture.
    pub fn with_max_form_value_length(mut self, max: usize) -> Self {
        self.config.max_form_value_length = max;
        self
    }

    /// Set the maximum captured body length. Zero disables body capture.
    pub fn with_max_body_length(mut self, max: usize) -> Self {
        self.config.max_body_length = max;
        self
    }

    /// Include source file paths in the `CallStack` listing.
    pub fn with_file_paths_in_stack(mut self, enabled: bool) -> Self {
        self.config.include_file_paths_in_stack = enabled;
        self
    }

    /// Include session items.
    pub fn with_session_items(mut self, enabled: bool) -> Self {
        self.config.include_session_items = enabled;
        self
    }

    /// Set how many fault levels are flattened.
    pub fn with_max_exception_depth(mut self, depth: usize) -> Self {
        self.config.max_exception_depth = depth;
        self
    }

    /// Set the application version reported under `Process`.
    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.config.app_version = Some(version.into());
        self
    }

    // Email

    /// Mail every record to `address`. Checked at build time.
    pub fn with_email_to(mut self, address: impl Into<String>) -> Self {
        self.config.email_to = Some(address.into());
        self
    }

    /// Also mail `Fatal` records to `address`. Checked at build time.
    pub fn with_fatal_email_to(mut self, address: impl Into<String>) -> Self {
        self.config.fatal_email_to = Some(address.into());
        self
    }

    /// Set the sender address. Checked at build time.
    pub fn with_email_from(mut self, address: impl Into<String>) -> Self {
        self.config.email_from = address.into();
        self
    }

    /// Set the subject line prefix.
    pub fn with_subject_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.subject_prefix = prefix.into();
        self
    }

    /// Set the transport used for mail.
    pub fn with_mail_transport(mut self, transport: Arc<dyn MailTransport>) -> Self {
        self.logger = self.logger.with_mail_transport(transport);
        self
    }

    // Collaborators

    /// Read request facts from `provider`.
    pub fn with_host_context(mut self, provider: impl HostContextProvider + 'static) -> Self {
        self.logger = self.logger.with_host_context(provider);
        self
    }

    /// Only deliver records accepted by `predicate`.
    pub fn with_accept<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CategorizedRecord) -> bool + Send + Sync + 'static,
    {
        self.logger = self.logger.with_accept(predicate);
        self
    }

    /// Receive failures that happen inside captures.
    pub fn with_crash_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&CaptureError) + Send + Sync + 'static,
    {
        self.logger = self.logger.with_crash_handler(handler);
        self
    }

    // Sinks

    /// Add an extension.
    pub fn with_extension(mut self, extension: Arc<dyn Extension>) -> Self {
        self.logger = self.logger.with_extension(extension);
        self
    }

    /// Forward records to `tracing`.
    pub fn with_tracing(self) -> Self {
        self.with_extension(Arc::new(LoggingExtension::new()))
    }

    /// Append records to a JSON-lines file. Opened at build time.
    pub fn with_json_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.json_file = Some(path.into());
        self
    }

    /// Build the logger.
    pub fn build(self) -> Result<SharedLogger, FaultlineError> {
        let mut logger = self.logger.with_config(self.config);
        if let Some(path) = self.json_file {
            let file = FileExtension::open(&path).map_err(|source| FaultlineError::Io {
                path: path.clone(),
                source,
            })?;
            logger = logger.with_extension(Arc::new(file));
        }
        Ok(Arc::new(logger.build()?))
    }

    /// Build the logger and make it the process-wide default.
    pub fn install(self) -> Result<SharedLogger, FaultlineError> {
        let logger = self.build()?;
        global::set_default_logger(Arc::clone(&logger));
        Ok(logger)
    }
}

impl Default for FaultlineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors building a logger.
#[derive(Debug, thiserror::Error)]
pub enum FaultlineError {
    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] faultline_core::ConfigError),

    /// The JSON-lines file could not be opened.
    #[error("Failed to open {path}: {source}")]
    Io {
        /// The file path.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Main types
    pub use crate::{Faultline, FaultlineBuilder, FaultlineError};

    // Core types
    pub use faultline_core::{
        CaptureConfig, CategorizedRecord, EventKind, FieldMap, FieldValue, RecordId,
        RedactionPolicy,
    };

    // Capture types
    pub use faultline_capture::{
        CaptureError, CaptureRequest, Cancelled, Fault, Logger, SharedLogger, ThresholdTimer,
    };

    // Host types
    pub use faultline_host::{HostContext, HostContextProvider, RequestInfo, StaticHostContext};

    // Sink types
    pub use faultline_sink::{
        CollectingExtension, Extension, FileExtension, FnExtension, LoggingExtension,
        MailMessage, MailTransport, MemoryTransport, PickupDirectoryTransport,
    };

    // Common std types
    pub use std::sync::Arc;
    pub use std::time::Duration;
}
