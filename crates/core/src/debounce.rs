use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::task::JoinHandle;
use tracing::trace;

use crate::advisor::{trim_input, EmailAdvisor, ValidationResult};

pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

/// Receives the result of a debounced evaluation.
pub type ResultSink = Arc<dyn Fn(ValidationResult) + Send + Sync>;

/// Coalesces rapid validation requests so only the latest one is evaluated.
///
/// Each [`schedule`](Self::schedule) aborts the pending timer and arms a new
/// one. When a timer fires, blank candidates are dropped and anything else is
/// evaluated and handed to the sink exactly once. Must be used from within a
/// tokio runtime.
pub struct DebouncedValidator {
    advisor: EmailAdvisor,
    delay: Duration,
    sink: ResultSink,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl DebouncedValidator {
    pub fn new(advisor: EmailAdvisor, delay: Duration, sink: ResultSink) -> Self {
        Self {
            advisor,
            delay,
            sink,
            pending: Mutex::new(None),
        }
    }

    pub fn with_default_delay(advisor: EmailAdvisor, sink: ResultSink) -> Self {
        Self::new(advisor, DEFAULT_DELAY, sink)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replaces any pending evaluation with one for `candidate`.
    pub fn schedule(&self, candidate: impl Into<String>) {
        let candidate = candidate.into();
        let advisor = self.advisor.clone();
        let sink = self.sink.clone();
        // The deadline is fixed at call time, not when the task is first polled.
        let deadline = tokio::time::Instant::now() + self.delay;

        let mut pending = self.pending.lock().expect("debounce guard poisoned");
        if let Some(previous) = pending.take() {
            previous.abort();
        }

        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if trim_input(&candidate).is_empty() {
                trace!(stage = "advisor", "debounced candidate is blank, skipping");
                return;
            }
            sink(advisor.validate(&candidate));
        }));
    }
}

impl Drop for DebouncedValidator {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(handle) = pending.take() {
                handle.abort();
            }
        }
    }
}
