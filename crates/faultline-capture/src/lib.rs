//! Faultline Capture
//!
//! The capture pipeline and its algorithms:
//!
//! - [`Logger`]: Builds, enriches and delivers categorized records
//! - [`SignatureComputer`]: Call-site fingerprints from stack frames
//! - [`ExceptionFlattener`]: Bounded-depth nesting of fault chains
//! - [`ThresholdTimer`]: Emits `PerfIssue` records for slow regions
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use faultline_capture::{CaptureRequest, Logger};
//! use faultline_core::EventKind;
//! use faultline_sink::{CollectingExtension, Extension};
//!
//! let collected = Arc::new(CollectingExtension::new(10));
//! let logger = Logger::builder()
//!     .with_extension(Arc::clone(&collected) as Arc<dyn Extension>)
//!     .build()
//!     .unwrap();
//!
//! let record = logger
//!     .capture(CaptureRequest::new(EventKind::Warning).message("{0} jobs queued").arg(1200))
//!     .unwrap();
//! assert_eq!(record.message(), "1200 jobs queued");
//! assert!(record.signature().is_some());
//! assert_eq!(collected.len(), 1);
//! ```

pub mod environment;
pub mod error;
pub mod fault;
pub mod pipeline;
pub mod stack;
pub mod timer;

// Re-export main types
pub use environment::{COMPUTER_CATEGORY, EnvironmentCollector, PROCESS_CATEGORY, THREAD_CATEGORY};
pub use error::{CaptureError, TimerError, TimerResult};
pub use fault::{Cancelled, EXCEPTION_CATEGORY, ExceptionFlattener, Fault, INNER_EXCEPTION_FIELD};
pub use pipeline::{
    ARGS_CATEGORY, AcceptPredicate, CaptureRequest, CrashHandler, Logger, LoggerBuilder,
    SharedLogger,
};
pub use stack::{
    BacktraceFrames, CALL_STACK_CATEGORY, FrameSource, INTERNAL_FRAME_PREFIXES, SignatureComputer,
    StackFrame, frame_hash, parse_backtrace,
};
pub use timer::{PERF_CATEGORY, ThresholdTimer, TimerState};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::fault::{Cancelled, Fault};
    pub use crate::pipeline::{CaptureRequest, Logger, LoggerBuilder, SharedLogger};
    pub use crate::timer::ThresholdTimer;
}
