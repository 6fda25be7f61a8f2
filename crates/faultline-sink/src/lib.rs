//! Faultline Sinks
//!
//! Destinations for completed records:
//!
//! - [`Extension`]: Callback notified with each record, isolated from failures
//! - [`ExtensionRegistry`]: Ordered list of extensions
//! - [`FileExtension`]: Appends records as JSON lines
//! - [`MailSink`]: Renders records as HTML email
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use faultline_core::{CategorizedRecord, EventKind};
//! use faultline_sink::{CollectingExtension, Extension, ExtensionRegistry};
//!
//! let registry = ExtensionRegistry::new();
//! let collected = Arc::new(CollectingExtension::new(100));
//! registry.register(Arc::clone(&collected) as Arc<dyn Extension>);
//!
//! let failures = registry.deliver(&CategorizedRecord::new(EventKind::Error));
//! assert!(failures.is_empty());
//! assert_eq!(collected.len(), 1);
//! ```

pub mod error;
pub mod extension;
pub mod file;
pub mod mail;

// Re-export main types
pub use error::{MailError, MailResult};
pub use extension::{
    CollectingExtension, Extension, ExtensionFailure, ExtensionRegistry, FnExtension,
    LoggingExtension,
};
pub use file::FileExtension;
pub use mail::{MailMessage, MailSink, MailTransport, MemoryTransport, PickupDirectoryTransport};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::extension::{Extension, ExtensionRegistry, FnExtension};
    pub use crate::mail::{MailSink, MailTransport};
}
