//! Faultline Host Context
//!
//! This crate connects the capture pipeline to the hosting application's
//! current web context. It includes:
//!
//! - [`HostContext`]: Read-only view of identity, request, response and session
//! - [`HostContextProvider`]: Supplies the context for the current flow
//! - [`HostCollector`]: Copies context facts into a record with redaction
//!
//! # Example
//!
//! ```
//! use faultline_core::{CaptureConfig, CategorizedRecord, EventKind};
//! use faultline_host::{HostCollector, RequestInfo, StaticHostContext};
//!
//! let ctx = StaticHostContext::new().with_request(
//!     RequestInfo::new("POST", "/login").with_form_value("password", "hunter2"),
//! );
//!
//! let mut record = CategorizedRecord::new(EventKind::Error);
//! HostCollector::new(&CaptureConfig::default()).collect(&mut record, &ctx, &mut |_| {});
//! assert!(record.category("HttpRequest").is_some());
//! ```

pub mod collect;
pub mod context;
pub mod error;

// Re-export main types
pub use collect::{
    HostCollector, REQUEST_CATEGORY, RESPONSE_CATEGORY, SESSION_CATEGORY, USER_CATEGORY,
};
pub use context::{
    HostContext, HostContextProvider, Identity, RequestInfo, ResponseInfo, SessionInfo,
    StaticHostContext, UploadedFile,
};
pub use error::{HostError, HostPart, HostResult};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::collect::HostCollector;
    pub use crate::context::{HostContext, HostContextProvider, StaticHostContext};
    pub use crate::error::{HostError, HostResult};
}
