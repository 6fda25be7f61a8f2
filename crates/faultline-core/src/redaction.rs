//! Sensitive-field redaction and length truncation.

/// Field-name markers that flag a value as sensitive.
///
/// Matching is a case-insensitive substring test against the field name.
pub const SENSITIVE_MARKERS: &[&str] = &[
    "pwd",
    "pass",
    "auth",
    "ccnum",
    "ccno",
    "credit",
    "token",
    "card",
    "ssn",
    "socialsec",
    "ssnum",
    "secnumber",
];

/// Suffix appended to truncated values.
pub const ELLIPSIS: &str = "...";

/// Decides which captured fields are sensitive and how long values may be.
///
/// # Example
///
/// ```
/// use faultline_core::RedactionPolicy;
///
/// let policy = RedactionPolicy::standard();
/// assert!(policy.is_sensitive("UserPassword"));
/// assert_eq!(policy.placeholder("secret123"), "[removed for security] Length: 9");
/// ```
#[derive(Debug, Clone)]
pub struct RedactionPolicy {
    markers: Vec<String>,
}

impl RedactionPolicy {
    /// Create a policy from a set of markers.
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(|m| m.as_ref().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    /// The built-in marker set.
    pub fn standard() -> Self {
        Self::new(SENSITIVE_MARKERS)
    }

    /// Check if a field name is sensitive.
    pub fn is_sensitive(&self, name: &str) -> bool {
        if name.trim().is_empty() {
            return false;
        }
        let lowered = name.to_lowercase();
        self.markers.iter().any(|m| lowered.contains(m.as_str()))
    }

    /// Placeholder that reveals only the length of a value.
    pub fn placeholder(&self, value: &str) -> String {
        format!("[removed for security] Length: {}", value.chars().count())
    }

    /// Redact `value` when `name` is sensitive, otherwise return it unchanged.
    pub fn apply(&self, name: &str, value: &str) -> String {
        if self.is_sensitive(name) {
            self.placeholder(value)
        } else {
            value.to_string()
        }
    }
}

impl Default for RedactionPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Truncate `value` to `max` characters, appending [`ELLIPSIS`] when cut.
///
/// Returns `None` when `max` is zero, meaning capture of this field class is
/// disabled.
pub fn truncate(value: &str, max: usize) -> Option<String> {
    if max == 0 {
        return None;
    }
    match value.char_indices().nth(max) {
        Some((cut, _)) => Some(format!("{}{}", &value[..cut], ELLIPSIS)),
        None => Some(value.to_string()),
    }
}
