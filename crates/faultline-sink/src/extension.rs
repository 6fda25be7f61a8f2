//! Extension callbacks notified with every finished record.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use faultline_core::{CategorizedRecord, EventKind, catch_panic};

/// A destination notified with each completed record.
pub trait Extension: Send + Sync {
    /// Name used when reporting failures.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Called with each completed record.
    fn on_record(&self, record: &CategorizedRecord) -> anyhow::Result<()>;
}

/// Adapts a closure into an [`Extension`].
pub struct FnExtension<F> {
    name: String,
    callback: F,
}

impl<F> FnExtension<F>
where
    F: Fn(&CategorizedRecord) -> anyhow::Result<()> + Send + Sync,
{
    /// Create a named closure extension.
    pub fn new(name: impl Into<String>, callback: F) -> Self {
        Self {
            name: name.into(),
            callback,
        }
    }
}

impl<F> Extension for FnExtension<F>
where
    F: Fn(&CategorizedRecord) -> anyhow::Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn on_record(&self, record: &CategorizedRecord) -> anyhow::Result<()> {
        (self.callback)(record)
    }
}

/// Forwards records to `tracing`.
pub struct LoggingExtension {
    /// Include the rendered JSON form in the event.
    pub include_json: bool,
}

impl LoggingExtension {
    /// Create a new logging extension.
    pub fn new() -> Self {
        Self {
            include_json: false,
        }
    }

    /// Include the JSON form of each record.
    pub fn with_json(mut self, enabled: bool) -> Self {
        self.include_json = enabled;
        self
    }
}

impl Default for LoggingExtension {
    fn default() -> Self {
        Self::new()
    }
}

impl Extension for LoggingExtension {
    fn name(&self) -> &str {
        "logging"
    }

    fn on_record(&self, record: &CategorizedRecord) -> anyhow::Result<()> {
        let json = if self.include_json {
            record.to_json(false)?
        } else {
            String::new()
        };
        let id = record.id();
        let signature = record.signature().unwrap_or("");
        match record.kind() {
            EventKind::Fatal | EventKind::Error | EventKind::Exception => {
                tracing::error!(
                    event = "record_captured",
                    kind = %record.kind(),
                    id = %id,
                    signature = signature,
                    json = json.as_str(),
                    "{}",
                    record.message()
                );
            }
            EventKind::Warning | EventKind::PerfIssue | EventKind::InvalidCodePath => {
                tracing::warn!(
                    event = "record_captured",
                    kind = %record.kind(),
                    id = %id,
                    signature = signature,
                    json = json.as_str(),
                    "{}",
                    record.message()
                );
            }
            EventKind::Info => {
                tracing::info!(
                    event = "record_captured",
                    kind = %record.kind(),
                    id = %id,
                    signature = signature,
                    json = json.as_str(),
                    "{}",
                    record.message()
                );
            }
        }
        Ok(())
    }
}

/// Keeps the most recent records in memory, oldest evicted first.
///
/// Useful for tests and for in-process dashboards that group recent
/// failures by signature.
pub struct CollectingExtension {
    recent: Mutex<VecDeque<CategorizedRecord>>,
    capacity: usize,
}

impl CollectingExtension {
    /// Keep at most `capacity` records.
    pub fn new(capacity: usize) -> Self {
        Self {
            recent: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    /// Records currently held, oldest first.
    pub fn records(&self) -> Vec<CategorizedRecord> {
        self.recent.lock().iter().cloned().collect()
    }

    /// The most recently delivered record.
    pub fn latest(&self) -> Option<CategorizedRecord> {
        self.recent.lock().back().cloned()
    }

    /// Records whose signature equals `signature`.
    pub fn with_signature(&self, signature: &str) -> Vec<CategorizedRecord> {
        self.recent
            .lock()
            .iter()
            .filter(|r| r.signature() == Some(signature))
            .cloned()
            .collect()
    }

    /// Remove and return every held record.
    pub fn take(&self) -> Vec<CategorizedRecord> {
        self.recent.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.recent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.lock().is_empty()
    }
}

impl Extension for CollectingExtension {
    fn name(&self) -> &str {
        "collecting"
    }

    fn on_record(&self, record: &CategorizedRecord) -> anyhow::Result<()> {
        if self.capacity == 0 {
            return Ok(());
        }
        let mut recent = self.recent.lock();
        if recent.len() == self.capacity {
            recent.pop_front();
        }
        recent.push_back(record.clone());
        Ok(())
    }
}

/// An extension that failed or panicked while handling a record.
#[derive(Debug)]
pub struct ExtensionFailure {
    /// The failing extension's name.
    pub extension: String,
    /// What went wrong.
    pub error: anyhow::Error,
}

/// Extensions notified with every finished record, in registration order.
///
/// Delivery works on a snapshot of the list, so an extension may register
/// further extensions without deadlocking; those see the next record.
pub struct ExtensionRegistry {
    extensions: RwLock<Arc<[Arc<dyn Extension>]>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self {
            extensions: RwLock::new(Arc::from(Vec::new())),
        }
    }

    /// Append an extension after those already registered.
    pub fn register(&self, extension: Arc<dyn Extension>) {
        let mut extensions = self.extensions.write();
        let mut next = extensions.to_vec();
        next.push(extension);
        *extensions = next.into();
    }

    /// Names of registered extensions, in delivery order.
    pub fn names(&self) -> Vec<String> {
        self.snapshot().iter().map(|e| e.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.extensions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.read().is_empty()
    }

    fn snapshot(&self) -> Arc<[Arc<dyn Extension>]> {
        Arc::clone(&self.extensions.read())
    }

    /// Notify every extension with `record`.
    ///
    /// Each extension runs even when an earlier one failed or panicked. The
    /// failures come back in delivery order.
    pub fn deliver(&self, record: &CategorizedRecord) -> Vec<ExtensionFailure> {
        let mut failures = Vec::new();
        for extension in self.snapshot().iter() {
            tracing::trace!(extension = extension.name(), id = %record.id(), "Delivering record");
            let error = match catch_panic(|| extension.on_record(record)) {
                Ok(Ok(())) => continue,
                Ok(Err(error)) => error,
                Err(message) => anyhow::anyhow!("extension panicked: {}", message),
            };
            failures.push(ExtensionFailure {
                extension: extension.name().to_string(),
                error,
            });
        }
        failures
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
