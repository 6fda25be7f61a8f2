//! Fault snapshots and exception flattening.

use std::backtrace::BacktraceStatus;
use std::error::Error as StdError;

use faultline_core::{CaptureConfig, CategorizedRecord, FieldMap, FieldValue};

/// Category holding the flattened fault.
pub const EXCEPTION_CATEGORY: &str = "Exception";

/// Field holding the nested cause.
pub const INNER_EXCEPTION_FIELD: &str = "InnerException";

/// Longest cause chain copied out of an error.
const MAX_CHAIN_LENGTH: usize = 32;

/// Cooperative cancellation.
///
/// A fault whose chain contains this error is not a failure; captures of it
/// are dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// An owned snapshot of an error and its causes.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    /// Error description.
    pub message: String,
    /// Name of the error type.
    pub type_name: String,
    /// Rendered stack trace, if one was captured.
    pub stack_trace: Option<String>,
    /// Numeric error code, such as an OS error number.
    pub error_code: Option<i64>,
    /// Extra data attached to the error.
    pub data: FieldMap,
    /// The underlying cause.
    pub cause: Option<Box<Fault>>,
    cancellation: bool,
}

impl Fault {
    /// Create a fault from a type name and message.
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            type_name: type_name.into(),
            stack_trace: None,
            error_code: None,
            data: FieldMap::new(),
            cause: None,
            cancellation: false,
        }
    }

    /// A cancellation signal.
    pub fn cancelled() -> Self {
        let mut fault = Self::new(std::any::type_name::<Cancelled>(), Cancelled.to_string());
        fault.cancellation = true;
        fault
    }

    /// Attach a stack trace.
    pub fn with_stack_trace(mut self, trace: impl Into<String>) -> Self {
        self.stack_trace = Some(trace.into());
        self
    }

    /// Attach an error code.
    pub fn with_error_code(mut self, code: i64) -> Self {
        self.error_code = Some(code);
        self
    }

    /// Attach a data value.
    pub fn with_data(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.data.insert(name.into(), value.into());
        self
    }

    /// Attach a cause.
    pub fn with_cause(mut self, cause: Fault) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Snapshot a typed error and its `source()` chain.
    pub fn from_error<E: StdError + 'static>(error: &E) -> Self {
        let mut fault = Self::from_dyn(error);
        fault.type_name = std::any::type_name::<E>().to_string();
        fault
    }

    /// Snapshot a type-erased error and its `source()` chain.
    pub fn from_dyn(error: &(dyn StdError + 'static)) -> Self {
        let chain = std::iter::successors(Some(error), |&e| e.source())
            .take(MAX_CHAIN_LENGTH)
            .collect::<Vec<_>>();
        Self::from_chain(&chain)
    }

    /// Snapshot an [`anyhow::Error`], including its backtrace when one was captured.
    pub fn from_anyhow(error: &anyhow::Error) -> Self {
        let chain = error.chain().take(MAX_CHAIN_LENGTH).collect::<Vec<_>>();
        let mut fault = Self::from_chain(&chain);
        let backtrace = error.backtrace();
        if backtrace.status() == BacktraceStatus::Captured {
            fault.stack_trace = Some(backtrace.to_string());
        }
        fault
    }

    fn from_chain(chain: &[&(dyn StdError + 'static)]) -> Self {
        let mut fault: Option<Fault> = None;
        for error in chain.iter().rev() {
            let mut level = Self::single(*error);
            level.cause = fault.map(Box::new);
            fault = Some(level);
        }
        fault.unwrap_or_else(|| Self::new("unknown", ""))
    }

    fn single(error: &(dyn StdError + 'static)) -> Self {
        if error.is::<Cancelled>() {
            return Self::cancelled();
        }
        let mut fault = Self::new(dyn_type_name(error), error.to_string());
        if let Some(io) = error.downcast_ref::<std::io::Error>() {
            fault.type_name = std::any::type_name::<std::io::Error>().to_string();
            fault.error_code = io.raw_os_error().map(i64::from);
            fault = fault.with_data("Kind", format!("{:?}", io.kind()));
        }
        fault
    }

    /// Whether this fault or any cause is a cancellation signal.
    pub fn is_cancellation(&self) -> bool {
        self.chain().any(|f| f.cancellation)
    }

    /// Iterate this fault and its causes, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &Fault> {
        std::iter::successors(Some(self), |&f| f.cause.as_deref())
    }
}

impl From<anyhow::Error> for Fault {
    fn from(error: anyhow::Error) -> Self {
        Self::from_anyhow(&error)
    }
}

impl From<std::io::Error> for Fault {
    fn from(error: std::io::Error) -> Self {
        Self::from_error(&error)
    }
}

/// Best-effort type label for a type-erased error: the leading identifier
/// of its `Debug` output.
fn dyn_type_name(error: &dyn StdError) -> String {
    let debug = format!("{:?}", error);
    let name: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
        .collect();
    if name.is_empty() {
        "dyn Error".to_string()
    } else {
        name
    }
}

/// Builds the nested `Exception` category from a fault chain.
#[derive(Debug, Clone, Copy)]
pub struct ExceptionFlattener {
    max_depth: usize,
}

impl ExceptionFlattener {
    /// Create a flattener expanding at most `max_depth` levels.
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Create a flattener from capture configuration.
    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new(config.max_exception_depth)
    }

    /// Maximum number of levels expanded.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Flatten `fault` into a field map. Causes deeper than the limit are
    /// left out.
    pub fn flatten(&self, fault: &Fault) -> FieldMap {
        self.level(fault, 1)
    }

    fn level(&self, fault: &Fault, depth: usize) -> FieldMap {
        let mut map = FieldMap::new();
        map.insert("Message".into(), fault.message.as_str().into());
        map.insert("Type".into(), fault.type_name.as_str().into());
        map.insert("StackTrace".into(), fault.stack_trace.clone().into());
        map.insert("ErrorCode".into(), fault.error_code.into());
        if !fault.data.is_empty() {
            map.insert("Data".into(), FieldValue::Map(fault.data.clone()));
        }
        if let Some(cause) = &fault.cause {
            if depth < self.max_depth {
                map.insert(
                    INNER_EXCEPTION_FIELD.into(),
                    FieldValue::Map(self.level(cause, depth + 1)),
                );
            }
        }
        map
    }

    /// Write the `Exception` category.
    pub fn apply(&self, record: &mut CategorizedRecord, fault: &Fault) {
        if self.max_depth == 0 {
            return;
        }
        let fields = self.flatten(fault);
        if let Some(category) = record.get_or_create_category(EXCEPTION_CATEGORY) {
            category.extend(fields);
        }
    }
}

impl Default for ExceptionFlattener {
    fn default() -> Self {
        Self::from_config(&CaptureConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_core::EventKind;

    #[derive(Debug, thiserror::Error)]
    #[error("checkout failed")]
    struct CheckoutError {
        #[source]
        source: std::io::Error,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("job aborted")]
    struct JobError(#[source] Cancelled);

    fn inner(map: &FieldMap) -> Option<&FieldMap> {
        map.get(INNER_EXCEPTION_FIELD).and_then(|v| v.as_map())
    }

    #[test]
    fn test_from_error_follows_sources() {
        let error = CheckoutError {
            source: std::io::Error::from_raw_os_error(2),
        };
        let fault = Fault::from_error(&error);

        assert_eq!(fault.message, "checkout failed");
        assert!(fault.type_name.ends_with("CheckoutError"));
        let cause = fault.cause.as_deref().unwrap();
        assert_eq!(cause.type_name, "std::io::error::Error");
        assert_eq!(cause.error_code, Some(2));
        assert!(cause.data.contains_key("Kind"));
        assert_eq!(fault.chain().count(), 2);
    }

    #[test]
    fn test_from_dyn_walks_erased_chain() {
        let error = CheckoutError {
            source: std::io::Error::other("socket closed"),
        };
        let erased: &(dyn StdError + 'static) = &error;
        let messages: Vec<String> = Fault::from_dyn(erased).chain().map(|f| f.message.clone()).collect();
        assert_eq!(messages, vec!["checkout failed", "socket closed"]);
    }

    #[test]
    fn test_self_referential_source_is_bounded() {
        #[derive(Debug)]
        struct Retrying;
        impl std::fmt::Display for Retrying {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "retrying")
            }
        }
        impl StdError for Retrying {
            fn source(&self) -> Option<&(dyn StdError + 'static)> {
                Some(self)
            }
        }

        assert_eq!(Fault::from_error(&Retrying).chain().count(), MAX_CHAIN_LENGTH);
    }

    #[test]
    fn test_cancellation_detected_in_chain() {
        assert!(Fault::cancelled().is_cancellation());
        assert!(Fault::from_error(&JobError(Cancelled)).is_cancellation());
        assert!(Fault::from_error(&Cancelled).is_cancellation());
        assert!(!Fault::new("Timeout", "slow").is_cancellation());
    }

    #[test]
    fn test_from_anyhow() {
        let error = anyhow::Error::new(std::io::Error::other("disk full")).context("saving cart");
        let fault = Fault::from(error);
        assert_eq!(fault.message, "saving cart");
        assert_eq!(fault.cause.as_deref().map(|c| c.message.as_str()), Some("disk full"));
    }

    #[test]
    fn test_flatten_with_cause() {
        let fault = Fault::new("OrderError", "order rejected")
            .with_error_code(17)
            .with_data("OrderId", 4411)
            .with_cause(Fault::new("DbError", "deadlock"));

        let mut record = CategorizedRecord::new(EventKind::Exception);
        ExceptionFlattener::default().apply(&mut record, &fault);

        assert_eq!(record.get(EXCEPTION_CATEGORY, "Type"), Some(&"OrderError".into()));
        assert_eq!(record.get(EXCEPTION_CATEGORY, "Message"), Some(&"order rejected".into()));
        assert_eq!(record.get(EXCEPTION_CATEGORY, "ErrorCode"), Some(&17.into()));
        assert!(record.get(EXCEPTION_CATEGORY, "StackTrace").unwrap().is_null());

        let exception = record.category(EXCEPTION_CATEGORY).unwrap();
        let nested = inner(exception).unwrap();
        assert_eq!(nested.get("Type").and_then(|v| v.as_str()), Some("DbError"));
        assert_eq!(nested.get("Message").and_then(|v| v.as_str()), Some("deadlock"));
        assert!(!nested.contains_key("Data"));
    }

    #[test]
    fn test_depth_is_bounded() {
        let fault = Fault::new("A", "a").with_cause(
            Fault::new("B", "b").with_cause(Fault::new("C", "c").with_cause(Fault::new("D", "d"))),
        );

        let three = ExceptionFlattener::new(3).flatten(&fault);
        let b = inner(&three).unwrap();
        let c = inner(b).unwrap();
        assert_eq!(c.get("Type").and_then(|v| v.as_str()), Some("C"));
        assert!(inner(c).is_none());

        let one = ExceptionFlattener::new(1).flatten(&fault);
        assert!(inner(&one).is_none());

        let mut record = CategorizedRecord::new(EventKind::Exception);
        ExceptionFlattener::new(0).apply(&mut record, &fault);
        assert!(record.category(EXCEPTION_CATEGORY).is_none());
    }
}
