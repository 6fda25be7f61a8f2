//! Faultline Core - Categorized Diagnostic Records
//!
//! This crate provides the data side of the Faultline diagnostic capture
//! library:
//!
//! - [`CategorizedRecord`]: A snapshot of facts grouped into named categories
//! - [`FieldValue`]: The tagged value union stored in each field
//! - [`RedactionPolicy`]: Sensitive field detection and length placeholders
//! - [`CaptureConfig`]: Data-valued options of the capture pipeline
//!
//! # Quick Start
//!
//! ```
//! use faultline_core::prelude::*;
//!
//! let mut record = CategorizedRecord::with_message(EventKind::Warning, "cache miss storm");
//! record.set("Cache", "Misses", 1250);
//! record.set_user_data("Region", "eu-west");
//!
//! let json = record.to_json(false).unwrap();
//! let parsed = CategorizedRecord::from_json(&json).unwrap();
//! assert_eq!(parsed.get("Cache", "Misses"), record.get("Cache", "Misses"));
//!
//! let html = record.render_report();
//! assert!(html.contains("cache miss storm"));
//! ```

pub mod config;
pub mod error;
pub mod guard;
pub mod record;
pub mod redaction;
pub mod report;
pub mod template;
pub mod value;

// Re-export main types at crate root
pub use config::{CaptureConfig, DEFAULT_RUNTIME_NAMESPACES};
pub use error::{ConfigError, ConfigResult, RecordError, RecordResult};
pub use guard::{catch_panic, panic_message};
pub use record::{CategorizedRecord, EventKind, RecordId, USER_CATEGORY};
pub use redaction::{ELLIPSIS, RedactionPolicy, SENSITIVE_MARKERS, truncate};
pub use template::{format_template, has_placeholders};
pub use value::{FieldMap, FieldValue};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::CaptureConfig;
    pub use crate::record::{CategorizedRecord, EventKind, RecordId};
    pub use crate::redaction::RedactionPolicy;
    pub use crate::value::{FieldMap, FieldValue};
}
