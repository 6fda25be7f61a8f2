//! The categorized event record.

use std::fmt;

use chrono::{DateTime, Local, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RecordError, RecordResult};
use crate::value::{FieldMap, FieldValue};

/// Name of the category used by [`CategorizedRecord::set_user_data`].
pub const USER_CATEGORY: &str = "User";

/// Kind (severity) of a captured event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A recoverable error.
    Error,
    /// Something unexpected but harmless.
    Warning,
    /// An unrecoverable error.
    Fatal,
    /// Informational event.
    Info,
    /// A captured fault.
    Exception,
    /// A duration budget was exceeded.
    PerfIssue,
    /// Code that should never run did run.
    InvalidCodePath,
}

impl EventKind {
    /// Get the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Error => "Error",
            EventKind::Warning => "Warning",
            EventKind::Fatal => "Fatal",
            EventKind::Info => "Info",
            EventKind::Exception => "Exception",
            EventKind::PerfIssue => "PerfIssue",
            EventKind::InvalidCodePath => "InvalidCodePath",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique identifier for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Create a new random record ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// A snapshot of diagnostic facts grouped into named categories.
///
/// Each category maps field names to [`FieldValue`]s. Category and field
/// insertion order is preserved for rendering. A category, once created,
/// stays the same mapping for the life of the record.
///
/// # Example
///
/// ```
/// use faultline_core::{CategorizedRecord, EventKind, FieldValue};
///
/// let mut record = CategorizedRecord::with_message(EventKind::Error, "disk full");
/// record.set("Storage", "FreeBytes", 0);
/// assert_eq!(record.get("Storage", "FreeBytes"), Some(&FieldValue::Int(0)));
/// assert!(record.get("Storage", "Missing").is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizedRecord {
    id: RecordId,
    kind: EventKind,
    message: String,
    created_at_local: DateTime<Local>,
    created_at_utc: DateTime<Utc>,
    #[serde(default)]
    signature: Option<String>,
    #[serde(default)]
    categories: IndexMap<String, FieldMap>,
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

impl CategorizedRecord {
    /// Create a record whose message is the kind name.
    pub fn new(kind: EventKind) -> Self {
        Self::with_message(kind, kind.as_str())
    }

    /// Create a record with a message.
    pub fn with_message(kind: EventKind, message: impl Into<String>) -> Self {
        let utc = Utc::now();
        Self {
            id: RecordId::new(),
            kind,
            message: message.into(),
            created_at_local: utc.with_timezone(&Local),
            created_at_utc: utc,
            signature: None,
            categories: IndexMap::new(),
        }
    }

    /// Get the record ID.
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Get the record kind.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Get the summary message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Local creation time.
    pub fn created_at_local(&self) -> DateTime<Local> {
        self.created_at_local
    }

    /// UTC creation time.
    pub fn created_at_utc(&self) -> DateTime<Utc> {
        self.created_at_utc
    }

    /// Get the dedup signature, once computed.
    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    /// Set the dedup signature.
    pub fn set_signature(&mut self, signature: impl Into<String>) {
        self.signature = Some(signature.into());
    }

    /// Set a field, creating the category if needed.
    ///
    /// Blank category or field names are ignored.
    pub fn set(&mut self, category: &str, field: &str, value: impl Into<FieldValue>) {
        if is_blank(field) {
            return;
        }
        if let Some(map) = self.get_or_create_category(category) {
            map.insert(field.to_string(), value.into());
        }
    }

    /// Get a field value.
    pub fn get(&self, category: &str, field: &str) -> Option<&FieldValue> {
        if is_blank(field) {
            return None;
        }
        self.category(category)?.get(field)
    }

    /// Get a category, creating it on first access.
    ///
    /// Returns `None` only for a blank name.
    pub fn get_or_create_category(&mut self, name: &str) -> Option<&mut FieldMap> {
        if is_blank(name) {
            return None;
        }
        Some(self.categories.entry(name.to_string()).or_default())
    }

    /// Get a category if it has been created.
    pub fn category(&self, name: &str) -> Option<&FieldMap> {
        if is_blank(name) {
            return None;
        }
        self.categories.get(name)
    }

    /// Get a category mutably if it has been created.
    pub fn category_mut(&mut self, name: &str) -> Option<&mut FieldMap> {
        if is_blank(name) {
            return None;
        }
        self.categories.get_mut(name)
    }

    /// Iterate categories in creation order.
    pub fn categories(&self) -> impl Iterator<Item = (&str, &FieldMap)> {
        self.categories.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of categories.
    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    /// Set a field in the `User` category.
    pub fn set_user_data(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.set(USER_CATEGORY, name, value);
    }

    /// Get a field from the `User` category.
    pub fn user_data(&self, name: &str) -> Option<&FieldValue> {
        self.get(USER_CATEGORY, name)
    }

    /// Serialize to the JSON transport form.
    pub fn to_json(&self, pretty: bool) -> RecordResult<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    /// Serialize to a JSON value.
    pub fn to_json_value(&self) -> RecordResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Parse a record from its JSON transport form.
    pub fn from_json(text: &str) -> RecordResult<Self> {
        if is_blank(text) {
            return Err(RecordError::EmptyInput);
        }
        Ok(serde_json::from_str(text)?)
    }
}

impl fmt::Display for CategorizedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_json(true) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}
