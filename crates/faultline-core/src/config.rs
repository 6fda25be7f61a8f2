//! Capture configuration.
//!
//! [`CaptureConfig`] holds every data-valued option of the capture pipeline.
//! Callbacks (accept predicate, crash handler, extensions) are configured on
//! the logger builder instead.

use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};
use crate::redaction::{RedactionPolicy, SENSITIVE_MARKERS};

/// Default runtime namespaces ignored when computing signatures.
pub const DEFAULT_RUNTIME_NAMESPACES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "<std::",
    "<core::",
    "<alloc::",
    "__rust",
    "__libc",
    "_start",
    "test::",
];

/// Options controlling what a capture collects and where it is mailed.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Maximum length of a captured form value.
    ///
    /// Longer values are truncated. Zero disables form capture. Defaults to 8192.
    pub max_form_value_length: usize,

    /// Maximum length of a captured request body.
    ///
    /// Zero disables body capture. Defaults to 32768.
    pub max_body_length: usize,

    /// Include source file paths in the `CallStack` category.
    pub include_file_paths_in_stack: bool,

    /// Include session items in the `HttpSession` category.
    pub include_session_items: bool,

    /// Field-name markers that flag a value as sensitive.
    pub sensitive_markers: Vec<String>,

    /// Maximum number of exception levels expanded, the root included.
    ///
    /// Defaults to 3.
    pub max_exception_depth: usize,

    /// Number of non-runtime frames folded into the signature.
    ///
    /// Defaults to 4.
    pub signature_frame_count: usize,

    /// Qualified-name prefixes treated as runtime/platform frames.
    pub runtime_namespaces: Vec<String>,

    /// Bound for messages derived from a fault description.
    pub message_summary_length: usize,

    /// Bound for the message part of an email subject line.
    pub subject_message_length: usize,

    /// Recipient of every captured record.
    pub email_to: Option<String>,

    /// Additional recipient for `Fatal` records.
    pub fatal_email_to: Option<String>,

    /// Sender address for email notifications.
    pub email_from: String,

    /// Prefix for email subject lines.
    pub subject_prefix: String,

    /// Version of the hosting application, reported in the `Process` category.
    pub app_version: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_form_value_length: 8192,
            max_body_length: 32768,
            include_file_paths_in_stack: false,
            include_session_items: false,
            sensitive_markers: SENSITIVE_MARKERS.iter().map(|s| s.to_string()).collect(),
            max_exception_depth: 3,
            signature_frame_count: 4,
            runtime_namespaces: DEFAULT_RUNTIME_NAMESPACES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            message_summary_length: 256,
            subject_message_length: 50,
            email_to: None,
            fatal_email_to: None,
            email_from: "nobody@test.com".to_string(),
            subject_prefix: "[Log] ".to_string(),
            app_version: None,
        }
    }
}

impl CaptureConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the form value length limit.
    pub fn with_max_form_value_length(mut self, max: usize) -> Self {
        self.max_form_value_length = max;
        self
    }

    /// Set the request body length limit.
    pub fn with_max_body_length(mut self, max: usize) -> Self {
        self.max_body_length = max;
        self
    }

    /// Include file paths in the call stack listing.
    pub fn with_file_paths_in_stack(mut self, enabled: bool) -> Self {
        self.include_file_paths_in_stack = enabled;
        self
    }

    /// Include session items.
    pub fn with_session_items(mut self, enabled: bool) -> Self {
        self.include_session_items = enabled;
        self
    }

    /// Set the exception unwind depth.
    pub fn with_max_exception_depth(mut self, depth: usize) -> Self {
        self.max_exception_depth = depth;
        self
    }

    /// Set the number of frames folded into the signature.
    pub fn with_signature_frame_count(mut self, count: usize) -> Self {
        self.signature_frame_count = count;
        self
    }

    /// Set the recipient of every record.
    pub fn with_email_to(mut self, address: impl Into<String>) -> ConfigResult<Self> {
        let address = address.into();
        validate_address(&address)?;
        self.email_to = Some(address);
        Ok(self)
    }

    /// Set the additional recipient for fatal records.
    pub fn with_fatal_email_to(mut self, address: impl Into<String>) -> ConfigResult<Self> {
        let address = address.into();
        validate_address(&address)?;
        self.fatal_email_to = Some(address);
        Ok(self)
    }

    /// Set the sender address.
    pub fn with_email_from(mut self, address: impl Into<String>) -> ConfigResult<Self> {
        let address = address.into();
        validate_address(&address)?;
        self.email_from = address;
        Ok(self)
    }

    /// Set the subject line prefix.
    pub fn with_subject_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.subject_prefix = prefix.into();
        self
    }

    /// Set the application version.
    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = Some(version.into());
        self
    }

    /// Check if any email recipient is configured.
    pub fn has_email_recipients(&self) -> bool {
        self.email_to.is_some() || self.fatal_email_to.is_some()
    }

    /// Build the redaction policy for the configured markers.
    pub fn redaction_policy(&self) -> RedactionPolicy {
        RedactionPolicy::new(&self.sensitive_markers)
    }

    /// Validate option values.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_address(&self.email_from)?;
        if let Some(to) = &self.email_to {
            validate_address(to)?;
        }
        if let Some(to) = &self.fatal_email_to {
            validate_address(to)?;
        }
        if self.signature_frame_count == 0 {
            return Err(ConfigError::Invalid(
                "signature_frame_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_address(address: &str) -> ConfigResult<()> {
    let valid = match address.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !address.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidEmailAddress(address.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CaptureConfig::default();
        assert_eq!(config.max_form_value_length, 8192);
        assert_eq!(config.max_body_length, 32768);
        assert!(!config.include_file_paths_in_stack);
        assert!(!config.include_session_items);
        assert_eq!(config.subject_prefix, "[Log] ");
        assert_eq!(config.max_exception_depth, 3);
        assert!(!config.has_email_recipients());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = CaptureConfig::new()
            .with_max_body_length(0)
            .with_session_items(true)
            .with_email_to("ops@example.com")
            .unwrap();

        assert_eq!(config.max_body_length, 0);
        assert!(config.include_session_items);
        assert!(config.has_email_recipients());
    }

    #[test]
    fn test_invalid_email_rejected() {
        assert!(matches!(
            CaptureConfig::new().with_email_to("not an address"),
            Err(ConfigError::InvalidEmailAddress(_))
        ));
        assert!(CaptureConfig::new().with_fatal_email_to("a@b@c").is_err());
    }

    #[test]
    fn test_from_toml() {
        let config = CaptureConfig::from_toml_str(
            r#"
            max_form_value_length = 16
            include_file_paths_in_stack = true
            email_to = "ops@example.com"
            subject_prefix = "[app] "
            "#,
        )
        .unwrap();

        assert_eq!(config.max_form_value_length, 16);
        assert!(config.include_file_paths_in_stack);
        assert_eq!(config.subject_prefix, "[app] ");
        assert_eq!(config.max_body_length, 32768);
    }

    #[test]
    fn test_from_toml_validates() {
        assert!(CaptureConfig::from_toml_str("email_to = \"nobody\"").is_err());
        assert!(CaptureConfig::from_toml_str("signature_frame_count = 0").is_err());
    }
}
