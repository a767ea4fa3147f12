//! The cooperative wait primitive.
//!
//! `ExpectationWaiter::wait` blocks the calling context until every expectation is fulfilled or the timeout
//! elapses. Between checks it yields to the [`RunLoop`] for at most one poll interval, so callbacks that fulfill
//! expectations get to run. Fulfillment is only observed at the top of each poll iteration.

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::expectation::Expectation;
use crate::failure::{Failure, FailureKind, FailureReporter};
use crate::location::SourceLocation;
use crate::run_loop::RunLoop;

/// Default time handed to the run loop between fulfillment checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How a wait resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Every expectation was fulfilled before the deadline.
    Satisfied,
    /// The deadline passed; `unmet` lists the labels that were never fulfilled.
    TimedOut { unmet: Vec<String> },
    /// The wait was called with no live expectations.
    NothingToWait,
}

impl WaitOutcome {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, WaitOutcome::Satisfied)
    }

    pub fn into_result(self) -> Result<(), WaitError> {
        match self {
            WaitOutcome::Satisfied => Ok(()),
            WaitOutcome::TimedOut { unmet } => Err(WaitError::Unmet(unmet)),
            WaitOutcome::NothingToWait => Err(WaitError::NothingToWait),
        }
    }
}

/// Error form of an unsuccessful [`WaitOutcome`], handed to completion handlers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaitError {
    #[error("{} expectation(s) not met: {}", .0.len(), .0.join(", "))]
    Unmet(Vec<String>),

    #[error("no expectations to wait for")]
    NothingToWait,
}

/// Polls a set of expectations against a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectationWaiter {
    poll_interval: Duration,
}

impl Default for ExpectationWaiter {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ExpectationWaiter {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Wait until every expectation in `expectations` is fulfilled or `timeout` elapses.
    ///
    /// Each expectation still unfulfilled at the end is reported once, at its creation site, and every
    /// expectation is closed to further fulfillment. An empty set is reported at `location` without blocking.
    #[tracing::instrument(skip_all, fields(count = expectations.len(), timeout_ms = timeout.as_millis() as u64))]
    pub fn wait(
        &self,
        expectations: &[Expectation],
        timeout: Duration,
        run_loop: &dyn RunLoop,
        reporter: &dyn FailureReporter,
        location: SourceLocation,
    ) -> WaitOutcome {
        if expectations.is_empty() {
            reporter.record(Failure::new(FailureKind::NothingToWait, location));
            return WaitOutcome::NothingToWait;
        }

        // `None` when the timeout is too large to represent: wait without a deadline.
        let deadline = Instant::now().checked_add(timeout);
        let mut polls = 0usize;
        loop {
            if expectations.iter().all(Expectation::is_fulfilled) {
                break;
            }
            let now = Instant::now();
            if deadline.is_some_and(|deadline| now >= deadline) {
                break;
            }
            // Never overshoot the deadline by more than the run loop's own latency.
            let slice = deadline.map_or(self.poll_interval, |deadline| self.poll_interval.min(deadline - now));
            run_loop.process_pending_work(slice);
            polls += 1;
        }

        let mut unmet = Vec::new();
        for expectation in expectations {
            if !expectation.is_fulfilled() {
                reporter.record(Failure::new(
                    FailureKind::Unmet {
                        label: expectation.label().to_string(),
                    },
                    expectation.location(),
                ));
                expectation.mark_reported();
                unmet.push(expectation.label().to_string());
            }
            expectation.close();
        }

        tracing::debug!(polls, unmet = unmet.len(), "wait resolved");
        if unmet.is_empty() {
            WaitOutcome::Satisfied
        } else {
            WaitOutcome::TimedOut { unmet }
        }
    }
}
