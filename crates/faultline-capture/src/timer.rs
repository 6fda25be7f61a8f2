//! Scoped elapsed-time budgets.

use std::time::{Duration, Instant};

use tracing::debug;

use faultline_core::{CategorizedRecord, EventKind};

use crate::error::{TimerError, TimerResult};
use crate::pipeline::{CaptureRequest, Logger};

/// Category holding timing facts of a `PerfIssue` record.
pub const PERF_CATEGORY: &str = "Perf";

/// Timer lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Created, not started.
    Idle,
    /// Measuring.
    Running,
    /// Finished. Further stops do nothing.
    Stopped,
}

/// Emits a `PerfIssue` record when a timed region exceeds its budget.
///
/// The check runs on [`stop`](Self::stop) or when the timer is dropped,
/// whichever comes first.
///
/// ```
/// use std::time::Duration;
/// use faultline_capture::Logger;
///
/// let logger = Logger::builder().build().unwrap();
/// {
///     let _timer = logger.timer(Duration::from_secs(5)).with_label("nightly export").start_now().unwrap();
///     // timed work
/// }
/// ```
pub struct ThresholdTimer<'a> {
    logger: &'a Logger,
    budget: Duration,
    label: Option<String>,
    started_at: Option<Instant>,
    state: TimerState,
}

impl<'a> ThresholdTimer<'a> {
    /// Create an idle timer.
    pub fn new(logger: &'a Logger, budget: Duration) -> Self {
        Self {
            logger,
            budget,
            label: None,
            started_at: None,
            state: TimerState::Idle,
        }
    }

    /// Create a timer that is already running.
    pub fn started(logger: &'a Logger, budget: Duration) -> Self {
        let mut timer = Self::new(logger, budget);
        timer.started_at = Some(Instant::now());
        timer.state = TimerState::Running;
        timer
    }

    /// Describe the timed region. Used as the record message.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Start and return the timer, for use in a `let` binding.
    pub fn start_now(mut self) -> TimerResult<Self> {
        self.start()?;
        Ok(self)
    }

    /// Start measuring.
    pub fn start(&mut self) -> TimerResult<()> {
        match self.state {
            TimerState::Idle => {}
            TimerState::Running => return Err(TimerError::AlreadyStarted),
            TimerState::Stopped => return Err(TimerError::Stopped),
        }
        self.started_at = Some(Instant::now());
        self.state = TimerState::Running;
        Ok(())
    }

    /// Stop measuring and check the budget.
    ///
    /// Returns the `PerfIssue` record when the budget was exceeded. An idle
    /// timer stays idle and can still be started.
    pub fn stop(&mut self) -> Option<CategorizedRecord> {
        if self.state != TimerState::Running {
            return None;
        }
        self.state = TimerState::Stopped;

        let elapsed = self.started_at.take()?.elapsed();
        if elapsed <= self.budget {
            return None;
        }
        debug!(
            event = "budget_exceeded",
            elapsed_ms = elapsed.as_millis() as u64,
            budget_ms = self.budget.as_millis() as u64
        );

        let budget = self.budget;
        let message = self
            .label
            .clone()
            .unwrap_or_else(|| format!("PerfLog > {:.2} secs", budget.as_secs_f64()));
        self.logger.capture(
            CaptureRequest::new(EventKind::PerfIssue)
                .message(message)
                .enrich(move |record| {
                    record.set(PERF_CATEGORY, "Elapsed", elapsed.as_secs_f64());
                    record.set(PERF_CATEGORY, "MaxThreshold", budget.as_secs_f64());
                    record.set(PERF_CATEGORY, "ElapsedMs", elapsed.as_millis() as u64);
                    record.set(PERF_CATEGORY, "MaxThresholdMs", budget.as_millis() as u64);
                    Ok(())
                }),
        )
    }

    /// Current state.
    pub fn state(&self) -> TimerState {
        self.state
    }

    /// The budget.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Time since start, while running.
    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at.map(|start| start.elapsed())
    }
}

impl Drop for ThresholdTimer<'_> {
    fn drop(&mut self) {
        // Unwinding through a timed region is not a budget breach.
        if std::thread::panicking() {
            return;
        }
        self.stop();
    }
}

impl std::fmt::Debug for ThresholdTimer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThresholdTimer")
            .field("budget", &self.budget)
            .field("label", &self.label)
            .field("state", &self.state)
            .finish()
    }
}
