//! The capture pipeline.
//!
//! [`Logger::capture`] builds one [`CategorizedRecord`] per call:
//!
//! 1. Drop cancellation faults.
//! 2. Create the record and resolve its message.
//! 3. Collect host request, response and session facts.
//! 4. Compute the signature and `CallStack`.
//! 5. Collect thread, process and machine facts.
//! 6. Flatten the fault into `Exception`.
//! 7. Run the caller's enrichment callback.
//! 8. Apply the accept predicate.
//! 9. Mail the record, then notify extensions in order.
//!
//! Every collaborator call is isolated. Failures and panics go to the crash
//! handler and never reach the caller.

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use faultline_core::{
    CaptureConfig, CategorizedRecord, ConfigResult, EventKind, FieldValue, catch_panic,
    format_template, has_placeholders, truncate,
};
use faultline_host::{HostCollector, HostContextProvider};
use faultline_sink::{Extension, ExtensionRegistry, MailSink, MailTransport};

use crate::environment::EnvironmentCollector;
use crate::error::CaptureError;
use crate::fault::{ExceptionFlattener, Fault};
use crate::stack::{BacktraceFrames, FrameSource, SignatureComputer};
use crate::timer::ThresholdTimer;

/// Category holding message arguments that were not formatted.
pub const ARGS_CATEGORY: &str = "Args";

/// Decides whether a finished record is delivered.
pub type AcceptPredicate = dyn Fn(&CategorizedRecord) -> bool + Send + Sync;

/// Receives failures that happened inside a capture.
pub type CrashHandler = dyn Fn(&CaptureError) + Send + Sync;

type Enrich<'a> = Box<dyn FnOnce(&mut CategorizedRecord) -> anyhow::Result<()> + 'a>;

/// A logger shared between threads.
pub type SharedLogger = Arc<Logger>;

/// Arguments of one capture.
pub struct CaptureRequest<'a> {
    kind: EventKind,
    fault: Option<Fault>,
    template: Option<String>,
    args: Vec<FieldValue>,
    enrich: Option<Enrich<'a>>,
}

impl<'a> CaptureRequest<'a> {
    /// Start a request for `kind`.
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            fault: None,
            template: None,
            args: Vec::new(),
            enrich: None,
        }
    }

    /// Attach a fault.
    pub fn fault(mut self, fault: impl Into<Fault>) -> Self {
        self.fault = Some(fault.into());
        self
    }

    /// Attach a typed error and its causes.
    pub fn error<E: StdError + 'static>(mut self, error: &E) -> Self {
        self.fault = Some(Fault::from_error(error));
        self
    }

    /// Set the message template. `{0}`, `{1}`, ... refer to the arguments.
    pub fn message(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Append a message argument.
    pub fn arg(mut self, value: impl Into<FieldValue>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Append several message arguments.
    pub fn args<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        self.args.extend(values.into_iter().map(Into::into));
        self
    }

    /// Add facts to the record before it is delivered.
    pub fn enrich<F>(mut self, enrich: F) -> Self
    where
        F: FnOnce(&mut CategorizedRecord) -> anyhow::Result<()> + 'a,
    {
        self.enrich = Some(Box::new(enrich));
        self
    }

    /// The requested kind.
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

impl std::fmt::Debug for CaptureRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureRequest")
            .field("kind", &self.kind)
            .field("fault", &self.fault)
            .field("template", &self.template)
            .field("args", &self.args)
            .field("has_enrich", &self.enrich.is_some())
            .finish()
    }
}

/// Builds categorized records and delivers them to sinks.
pub struct Logger {
    config: CaptureConfig,
    signatures: SignatureComputer,
    flattener: ExceptionFlattener,
    environment: EnvironmentCollector,
    host: HostCollector,
    frames: Arc<dyn FrameSource>,
    host_provider: Option<Arc<dyn HostContextProvider>>,
    accept: Option<Arc<AcceptPredicate>>,
    crash_handler: Option<Arc<CrashHandler>>,
    mail: Option<MailSink>,
    extensions: ExtensionRegistry,
}

impl Logger {
    /// Create a logger builder.
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Get the capture configuration.
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Get the extension registry.
    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    /// Register an extension. Intended for setup time.
    pub fn register_extension(&self, extension: Arc<dyn Extension>) {
        self.extensions.register(extension);
    }

    /// Check if records are mailed.
    pub fn mails_records(&self) -> bool {
        self.mail.is_some()
    }

    /// Capture a record.
    ///
    /// Returns `None` when the fault is a cancellation or the accept
    /// predicate rejects the record.
    pub fn capture(&self, request: CaptureRequest<'_>) -> Option<CategorizedRecord> {
        let CaptureRequest {
            kind,
            fault,
            template,
            args,
            enrich,
        } = request;

        if fault.as_ref().is_some_and(Fault::is_cancellation) {
            debug!(event = "capture_cancelled", kind = %kind, "Dropping cancelled fault");
            return None;
        }

        let (message, unformatted) = self.resolve_message(kind, fault.as_ref(), template, args);
        let mut record = CategorizedRecord::with_message(kind, message);
        for (index, arg) in unformatted.into_iter().enumerate() {
            record.set(ARGS_CATEGORY, &index.to_string(), arg);
        }
        debug!(event = "capture_started", kind = %kind, id = %record.id());

        self.collect_host(&mut record);

        match catch_panic(|| self.frames.frames()) {
            Ok(frames) => {
                self.signatures.apply(&mut record, &frames);
            }
            Err(message) => self.report(CaptureError::panicked("stack walk", message)),
        }

        self.environment
            .collect(&mut record, &mut |error| self.report(error));

        if let Some(fault) = &fault {
            self.flattener.apply(&mut record, fault);
        }

        if let Some(enrich) = enrich {
            match catch_panic(|| enrich(&mut record)) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => self.report(CaptureError::Enrich(error)),
                Err(message) => {
                    self.report(CaptureError::panicked("enrichment callback", message))
                }
            }
        }

        if let Some(accept) = &self.accept {
            let accepted = catch_panic(|| accept(&record)).unwrap_or_else(|message| {
                self.report(CaptureError::panicked("accept predicate", message));
                true
            });
            if !accepted {
                debug!(event = "capture_rejected", kind = %kind, id = %record.id());
                return None;
            }
        }

        if let Some(mail) = &self.mail {
            match catch_panic(|| mail.deliver(&record)) {
                Ok(Ok(_)) => {}
                Ok(Err(error)) => self.report(CaptureError::Mail(error)),
                Err(message) => self.report(CaptureError::panicked("mail transport", message)),
            }
        }

        for failure in self.extensions.deliver(&record) {
            self.report(CaptureError::Extension {
                name: failure.extension,
                error: failure.error,
            });
        }

        debug!(
            event = "capture_finished",
            kind = %kind,
            id = %record.id(),
            signature = record.signature().unwrap_or(""),
            categories = record.category_count()
        );
        Some(record)
    }

    /// Resolve the record message. Returns the message and the arguments to
    /// store under `Args`.
    fn resolve_message(
        &self,
        kind: EventKind,
        fault: Option<&Fault>,
        template: Option<String>,
        args: Vec<FieldValue>,
    ) -> (String, Vec<FieldValue>) {
        match template.filter(|t| !t.trim().is_empty()) {
            Some(template) if has_placeholders(&template) => {
                (format_template(&template, &args), Vec::new())
            }
            Some(template) => (template, args),
            None => {
                let message = fault
                    .and_then(|f| truncate(&f.message, self.config.message_summary_length))
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| kind.as_str().to_string());
                (message, args)
            }
        }
    }

    fn collect_host(&self, record: &mut CategorizedRecord) {
        let Some(provider) = &self.host_provider else {
            return;
        };
        match catch_panic(|| provider.current()) {
            Ok(Some(ctx)) => {
                self.host
                    .collect(record, ctx.as_ref(), &mut |error| {
                        self.report(CaptureError::Host(error))
                    });
            }
            Ok(None) => {}
            Err(message) => self.report(CaptureError::panicked("host context provider", message)),
        }
    }

    /// Hand a failure to the crash handler.
    fn report(&self, error: CaptureError) {
        match &self.crash_handler {
            Some(handler) => {
                if let Err(message) = catch_panic(|| handler(&error)) {
                    warn!(event = "crash_handler_panicked", error = %error, panic = %message);
                }
            }
            None => warn!(event = "capture_failure", error = %error, "Capture failure discarded"),
        }
    }

    // Severity shortcuts

    /// Capture an `Error` record.
    pub fn error(&self, message: impl Into<String>) -> Option<CategorizedRecord> {
        self.capture(CaptureRequest::new(EventKind::Error).message(message))
    }

    /// Capture a `Warning` record.
    pub fn warning(&self, message: impl Into<String>) -> Option<CategorizedRecord> {
        self.capture(CaptureRequest::new(EventKind::Warning).message(message))
    }

    /// Capture an `Info` record.
    pub fn info(&self, message: impl Into<String>) -> Option<CategorizedRecord> {
        self.capture(CaptureRequest::new(EventKind::Info).message(message))
    }

    /// Capture a `Fatal` record.
    pub fn fatal(&self, message: impl Into<String>) -> Option<CategorizedRecord> {
        self.capture(CaptureRequest::new(EventKind::Fatal).message(message))
    }

    /// Capture a `PerfIssue` record.
    pub fn perf_issue(&self, message: impl Into<String>) -> Option<CategorizedRecord> {
        self.capture(CaptureRequest::new(EventKind::PerfIssue).message(message))
    }

    /// Capture an `InvalidCodePath` record.
    pub fn invalid_code_path(&self, message: impl Into<String>) -> Option<CategorizedRecord> {
        self.capture(CaptureRequest::new(EventKind::InvalidCodePath).message(message))
    }

    /// Capture an `Exception` record for an error.
    pub fn exception<E: StdError + 'static>(&self, error: &E) -> Option<CategorizedRecord> {
        self.capture(CaptureRequest::new(EventKind::Exception).error(error))
    }

    /// Create an idle threshold timer.
    pub fn timer(&self, budget: Duration) -> ThresholdTimer<'_> {
        ThresholdTimer::new(self, budget)
    }

    /// Run `f` under a started threshold timer.
    pub fn time<T>(&self, budget: Duration, f: impl FnOnce() -> T) -> T {
        let _timer = ThresholdTimer::started(self, budget);
        f()
    }
}

impl Default for Logger {
    fn default() -> Self {
        LoggerBuilder::new().assemble()
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("config", &self.config)
            .field("mail", &self.mail)
            .field("extensions", &self.extensions)
            .field("has_host_provider", &self.host_provider.is_some())
            .field("has_accept", &self.accept.is_some())
            .field("has_crash_handler", &self.crash_handler.is_some())
            .finish()
    }
}

/// Builder for configuring a [`Logger`].
pub struct LoggerBuilder {
    config: CaptureConfig,
    frames: Arc<dyn FrameSource>,
    host_provider: Option<Arc<dyn HostContextProvider>>,
    accept: Option<Arc<AcceptPredicate>>,
    crash_handler: Option<Arc<CrashHandler>>,
    mail_transport: Option<Arc<dyn MailTransport>>,
    extensions: Vec<Arc<dyn Extension>>,
}

impl LoggerBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: CaptureConfig::default(),
            frames: Arc::new(BacktraceFrames),
            host_provider: None,
            accept: None,
            crash_handler: None,
            mail_transport: None,
            extensions: Vec::new(),
        }
    }

    /// Replace the capture configuration.
    pub fn with_config(mut self, config: CaptureConfig) -> Self {
        self.config = config;
        self
    }

    /// Edit the capture configuration in place.
    pub fn configure(mut self, f: impl FnOnce(CaptureConfig) -> CaptureConfig) -> Self {
        self.config = f(self.config);
        self
    }

    /// Use a custom stack source.
    pub fn with_frame_source(mut self, source: impl FrameSource + 'static) -> Self {
        self.frames = Arc::new(source);
        self
    }

    /// Read request facts from `provider`.
    pub fn with_host_context(mut self, provider: impl HostContextProvider + 'static) -> Self {
        self.host_provider = Some(Arc::new(provider));
        self
    }

    /// Only deliver records accepted by `predicate`.
    pub fn with_accept<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CategorizedRecord) -> bool + Send + Sync + 'static,
    {
        self.accept = Some(Arc::new(predicate));
        self
    }

    /// Receive failures that happen inside captures.
    pub fn with_crash_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&CaptureError) + Send + Sync + 'static,
    {
        self.crash_handler = Some(Arc::new(handler));
        self
    }

    /// Send mail through `transport` when recipients are configured.
    pub fn with_mail_transport(mut self, transport: Arc<dyn MailTransport>) -> Self {
        self.mail_transport = Some(transport);
        self
    }

    /// Add an extension.
    pub fn with_extension(mut self, extension: Arc<dyn Extension>) -> Self {
        self.extensions.push(extension);
        self
    }

    /// Build the logger.
    pub fn build(self) -> ConfigResult<Logger> {
        self.config.validate()?;
        Ok(self.assemble())
    }

    fn assemble(self) -> Logger {
        let mail = self
            .mail_transport
            .and_then(|transport| MailSink::from_config(&self.config, transport));
        if mail.is_none() && self.config.has_email_recipients() {
            warn!(
                event = "mail_disabled",
                "Email recipients configured without a mail transport"
            );
        }

        let extensions = ExtensionRegistry::new();
        for extension in self.extensions {
            extensions.register(extension);
        }

        Logger {
            signatures: SignatureComputer::new(&self.config),
            flattener: ExceptionFlattener::from_config(&self.config),
            environment: EnvironmentCollector::new(&self.config),
            host: HostCollector::new(&self.config),
            frames: self.frames,
            host_provider: self.host_provider,
            accept: self.accept,
            crash_handler: self.crash_handler,
            mail,
            extensions,
            config: self.config,
        }
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
