//! Stack frames and call-site signatures.
//!
//! A signature groups records raised from the same call-site shape. It is
//! the XOR of a 32-bit hash of `"name#line"` for the first few frames that
//! are neither part of the capture machinery nor part of the Rust runtime.

use std::backtrace::Backtrace;

use faultline_core::{CaptureConfig, CategorizedRecord};

/// Category holding the frame listing.
pub const CALL_STACK_CATEGORY: &str = "CallStack";

/// Frame name prefixes belonging to the capture machinery itself.
///
/// These are skipped only while they form the top of the stack.
pub const INTERNAL_FRAME_PREFIXES: &[&str] = &[
    "faultline_capture::stack::",
    "<faultline_capture::stack::",
    "faultline_capture::pipeline::",
    "<faultline_capture::pipeline::",
    "faultline_capture::timer::",
    "<faultline_capture::timer::",
    "faultline_core::guard::",
    "faultline::global::",
];

/// One frame of a call stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Qualified function name.
    pub function: String,
    /// Source file, when debug info is available.
    pub file: Option<String>,
    /// Source line, when debug info is available.
    pub line: Option<u32>,
}

impl StackFrame {
    /// Create a frame with no location.
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            file: None,
            line: None,
        }
    }

    /// Set the source location.
    pub fn with_location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    /// Key hashed into the signature.
    pub fn key(&self) -> String {
        format!("{}#{}", self.function, self.line.unwrap_or(0))
    }

    fn describe(&self, include_file: bool) -> String {
        let mut text = self.function.clone();
        if let Some(line) = self.line {
            text.push_str(&format!(" #{}", line));
        }
        if include_file {
            if let Some(file) = &self.file {
                text.push_str(" @ ");
                text.push_str(file);
            }
        }
        text
    }
}

/// Yields the current call stack, innermost frame first.
pub trait FrameSource: Send + Sync {
    /// Capture the frames of the calling thread.
    fn frames(&self) -> Vec<StackFrame>;
}

/// Frames taken from [`std::backtrace::Backtrace`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktraceFrames;

impl FrameSource for BacktraceFrames {
    fn frames(&self) -> Vec<StackFrame> {
        parse_backtrace(&Backtrace::force_capture().to_string())
    }
}

/// Parse the display form of a [`Backtrace`].
///
/// Each frame is a `N: name` line, optionally followed by an
/// `at file:line:column` line. Inlined symbols appear as unnumbered name
/// lines and become frames of their own.
pub fn parse_backtrace(text: &str) -> Vec<StackFrame> {
    let mut frames: Vec<StackFrame> = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(location) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                let (file, line) = parse_location(location);
                frame.file = Some(file.to_string());
                frame.line = line;
            }
            continue;
        }
        let name = match line.split_once(": ") {
            Some((index, name)) if index.chars().all(|c| c.is_ascii_digit()) => name,
            _ => line,
        };
        frames.push(StackFrame::new(name));
    }
    frames
}

fn parse_location(location: &str) -> (&str, Option<u32>) {
    let mut parts = location.rsplitn(3, ':');
    let last = parts.next().unwrap_or(location);
    let middle = parts.next();
    let rest = parts.next();
    match (middle, rest) {
        // file:line:column
        (Some(line), Some(file)) if line.parse::<u32>().is_ok() && last.parse::<u32>().is_ok() => {
            (file, line.parse().ok())
        }
        // file:line
        (Some(_), _) if last.parse::<u32>().is_ok() => {
            let (file, line) = location.rsplit_once(':').unwrap_or((location, ""));
            (file, line.parse().ok())
        }
        _ => (location, None),
    }
}

/// Hash of one frame key.
pub fn frame_hash(key: &str) -> u32 {
    let digest = blake3::hash(key.as_bytes());
    let bytes = digest.as_bytes();
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Computes call-site signatures and the `CallStack` listing.
#[derive(Debug, Clone)]
pub struct SignatureComputer {
    frame_count: usize,
    runtime_namespaces: Vec<String>,
    internal_prefixes: Vec<String>,
    include_file_paths: bool,
}

impl SignatureComputer {
    /// Create a computer from capture configuration.
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            frame_count: config.signature_frame_count,
            runtime_namespaces: config.runtime_namespaces.clone(),
            internal_prefixes: INTERNAL_FRAME_PREFIXES.iter().map(|s| s.to_string()).collect(),
            include_file_paths: config.include_file_paths_in_stack,
        }
    }

    /// Replace the prefixes treated as capture machinery.
    pub fn with_internal_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.internal_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    fn is_runtime(&self, frame: &StackFrame) -> bool {
        self.runtime_namespaces
            .iter()
            .any(|ns| frame.function.starts_with(ns.as_str()))
    }

    fn is_internal(&self, frame: &StackFrame) -> bool {
        self.is_runtime(frame)
            || self
                .internal_prefixes
                .iter()
                .any(|p| frame.function.starts_with(p.as_str()))
    }

    /// Drop the leading run of internal frames.
    ///
    /// When every frame is internal the full stack is kept.
    pub fn external_frames<'a>(&self, frames: &'a [StackFrame]) -> &'a [StackFrame] {
        match frames.iter().position(|f| !self.is_internal(f)) {
            Some(start) => &frames[start..],
            None => frames,
        }
    }

    /// Compute the signature of `frames`, which must already be external.
    pub fn signature(&self, frames: &[StackFrame]) -> String {
        let hash = frames
            .iter()
            .filter(|f| !self.is_runtime(f))
            .take(self.frame_count)
            .fold(0u32, |acc, f| acc ^ frame_hash(&f.key()));
        format!("{:x}", hash)
    }

    /// Set the record's signature and write its `CallStack` category.
    pub fn apply(&self, record: &mut CategorizedRecord, frames: &[StackFrame]) -> String {
        let frames = self.external_frames(frames);
        let signature = self.signature(frames);
        for (index, frame) in frames.iter().enumerate() {
            record.set(
                CALL_STACK_CATEGORY,
                &index.to_string(),
                frame.describe(self.include_file_paths),
            );
        }
        record.set_signature(signature.clone());
        signature
    }
}

impl Default for SignatureComputer {
    fn default() -> Self {
        Self::new(&CaptureConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_core::EventKind;

    fn frames(names: &[(&str, u32)]) -> Vec<StackFrame> {
        names
            .iter()
            .map(|(name, line)| StackFrame::new(*name).with_location("src/app.rs", *line))
            .collect()
    }

    #[test]
    fn test_parse_backtrace() {
        let text = "   0: std::backtrace::Backtrace::create
             at /rustc/abc/library/std/src/backtrace.rs:331:13
   1: app::handlers::checkout
             at ./src/handlers.rs:42:9
      app::handlers::inlined_helper
             at ./src/handlers.rs:17:5
   2: main
   3: <unknown>";
        let parsed = parse_backtrace(text);
        assert_eq!(parsed.len(), 5);
        assert_eq!(parsed[0].function, "std::backtrace::Backtrace::create");
        assert_eq!(parsed[0].line, Some(331));
        assert_eq!(parsed[1].function, "app::handlers::checkout");
        assert_eq!(parsed[1].file.as_deref(), Some("./src/handlers.rs"));
        assert_eq!(parsed[1].line, Some(42));
        assert_eq!(parsed[2].function, "app::handlers::inlined_helper");
        assert_eq!(parsed[2].line, Some(17));
        assert_eq!(parsed[3], StackFrame::new("main"));
        assert_eq!(parsed[4].function, "<unknown>");
    }

    #[test]
    fn test_parse_location_without_column() {
        assert_eq!(parse_location("C:\\src\\a.rs:10"), ("C:\\src\\a.rs", Some(10)));
        assert_eq!(parse_location("src/a.rs:10:4"), ("src/a.rs", Some(10)));
        assert_eq!(parse_location("unknown"), ("unknown", None));
    }

    #[test]
    fn test_skips_leading_internal_frames_only() {
        let computer = SignatureComputer::default();
        let stack = frames(&[
            ("std::backtrace::Backtrace::force_capture", 1),
            ("faultline_capture::pipeline::Logger::capture", 2),
            ("app::run", 10),
            ("faultline_capture::pipeline::Logger::capture", 3),
            ("main", 20),
        ]);
        let external = computer.external_frames(&stack);
        assert_eq!(external.len(), 3);
        assert_eq!(external[0].function, "app::run");
        assert_eq!(external[1].function, "faultline_capture::pipeline::Logger::capture");
    }

    #[test]
    fn test_signature_xor_of_first_non_runtime_frames() {
        let computer = SignatureComputer::default();
        let stack = frames(&[
            ("app::a", 1),
            ("core::ops::function::FnOnce::call_once", 250),
            ("app::b", 2),
            ("app::c", 3),
            ("app::d", 4),
            ("app::e", 5),
        ]);
        let expected = frame_hash("app::a#1")
            ^ frame_hash("app::b#2")
            ^ frame_hash("app::c#3")
            ^ frame_hash("app::d#4");
        assert_eq!(computer.signature(&stack), format!("{:x}", expected));
    }

    #[test]
    fn test_signature_is_deterministic_and_line_sensitive() {
        let computer = SignatureComputer::default();
        let a = frames(&[("app::handler", 10), ("app::main", 50)]);
        let b = frames(&[("app::handler", 11), ("app::main", 50)]);
        assert_eq!(computer.signature(&a), computer.signature(&a.clone()));
        assert_ne!(computer.signature(&a), computer.signature(&b));
    }

    #[test]
    fn test_frames_beyond_count_are_ignored() {
        let computer = SignatureComputer::new(&CaptureConfig::default().with_signature_frame_count(2));
        let a = frames(&[("app::a", 1), ("app::b", 2), ("app::c", 3)]);
        let b = frames(&[("app::a", 1), ("app::b", 2), ("app::other", 99)]);
        assert_eq!(computer.signature(&a), computer.signature(&b));
    }

    #[test]
    fn test_apply_writes_call_stack() {
        let computer = SignatureComputer::new(&CaptureConfig::default().with_file_paths_in_stack(true));
        let stack = frames(&[
            ("faultline_capture::stack::BacktraceFrames::frames", 1),
            ("app::run", 10),
            ("main", 20),
        ]);
        let mut record = CategorizedRecord::new(EventKind::Error);
        let signature = computer.apply(&mut record, &stack);

        assert_eq!(record.signature(), Some(signature.as_str()));
        let call_stack = record.category(CALL_STACK_CATEGORY).unwrap();
        assert_eq!(call_stack.len(), 2);
        assert_eq!(
            record.get(CALL_STACK_CATEGORY, "0").and_then(|v| v.as_str()),
            Some("app::run #10 @ src/app.rs")
        );
    }

    #[test]
    fn test_backtrace_frames_not_empty() {
        assert!(!BacktraceFrames.frames().is_empty());
    }
}
