//! The process-wide default logger.
//!
//! Libraries that cannot thread a [`Logger`] through their call graph can
//! log through these functions. The default instance has no sinks until one
//! is installed with [`set_default_logger`] or
//! [`FaultlineBuilder::install`](crate::FaultlineBuilder::install).

use std::error::Error as StdError;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::RwLock;

use faultline_capture::{CaptureRequest, Logger, SharedLogger};
use faultline_core::CategorizedRecord;

static DEFAULT_LOGGER: OnceLock<RwLock<SharedLogger>> = OnceLock::new();

fn slot() -> &'static RwLock<SharedLogger> {
    DEFAULT_LOGGER.get_or_init(|| RwLock::new(Arc::new(Logger::default())))
}

/// Get the default logger.
pub fn default_logger() -> SharedLogger {
    Arc::clone(&slot().read())
}

/// Replace the default logger, returning the previous one.
pub fn set_default_logger(logger: SharedLogger) -> SharedLogger {
    tracing::debug!(event = "default_logger_replaced");
    std::mem::replace(&mut *slot().write(), logger)
}

/// Capture through the default logger.
pub fn log_capture(request: CaptureRequest<'_>) -> Option<CategorizedRecord> {
    default_logger().capture(request)
}

/// Capture an `Error` record through the default logger.
pub fn log_error(message: impl Into<String>) -> Option<CategorizedRecord> {
    default_logger().error(message)
}

/// Capture a `Warning` record through the default logger.
pub fn log_warning(message: impl Into<String>) -> Option<CategorizedRecord> {
    default_logger().warning(message)
}

/// Capture an `Info` record through the default logger.
pub fn log_info(message: impl Into<String>) -> Option<CategorizedRecord> {
    default_logger().info(message)
}

/// Capture a `Fatal` record through the default logger.
pub fn log_fatal(message: impl Into<String>) -> Option<CategorizedRecord> {
    default_logger().fatal(message)
}

/// Capture a `PerfIssue` record through the default logger.
pub fn log_perf_issue(message: impl Into<String>) -> Option<CategorizedRecord> {
    default_logger().perf_issue(message)
}

/// Capture an `InvalidCodePath` record through the default logger.
pub fn log_invalid_code_path(message: impl Into<String>) -> Option<CategorizedRecord> {
    default_logger().invalid_code_path(message)
}

/// Capture an `Exception` record for `error` through the default logger.
pub fn log_exception<E: StdError + 'static>(error: &E) -> Option<CategorizedRecord> {
    default_logger().exception(error)
}

/// Run `f` under a threshold timer on the default logger.
pub fn time<T>(budget: Duration, f: impl FnOnce() -> T) -> T {
    default_logger().time(budget, f)
}
