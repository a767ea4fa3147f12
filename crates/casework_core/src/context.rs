//! Per-unit test state.

use std::rc::Rc;
use std::time::Duration;

use crate::expectation::Expectation;
use crate::failure::{Failure, FailureKind, FailureReporter};
use crate::location::SourceLocation;
use crate::measure::{self, DEFAULT_ITERATIONS, Measurement};
use crate::run_loop::RunLoop;
use crate::waiter::{ExpectationWaiter, WaitError, WaitOutcome};

/// State owned by one test unit: its live expectations and the collaborators they report to.
///
/// A fresh context is built for every (variant, method) invocation, so nothing leaks between tests.
pub struct CaseContext {
    reporter: Rc<dyn FailureReporter>,
    run_loop: Rc<dyn RunLoop>,
    waiter: ExpectationWaiter,
    measure_iterations: usize,
    expectations: Vec<Expectation>,
}

impl CaseContext {
    pub fn new(reporter: Rc<dyn FailureReporter>, run_loop: Rc<dyn RunLoop>) -> Self {
        Self {
            reporter,
            run_loop,
            waiter: ExpectationWaiter::default(),
            measure_iterations: DEFAULT_ITERATIONS,
            expectations: Vec::new(),
        }
    }

    pub fn with_waiter(mut self, waiter: ExpectationWaiter) -> Self {
        self.waiter = waiter;
        self
    }

    pub fn with_measure_iterations(mut self, iterations: usize) -> Self {
        self.measure_iterations = iterations;
        self
    }

    pub fn reporter(&self) -> &dyn FailureReporter {
        self.reporter.as_ref()
    }

    pub fn run_loop(&self) -> &dyn RunLoop {
        self.run_loop.as_ref()
    }

    pub fn measure_iterations(&self) -> usize {
        self.measure_iterations
    }

    /// Number of expectations created since the last wait.
    pub fn live_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Create a pending expectation and register it for the next wait.
    #[track_caller]
    pub fn expectation(&mut self, label: impl Into<String>) -> Expectation {
        let expectation = Expectation::new(label.into(), SourceLocation::caller(), self.reporter.clone());
        self.expectations.push(expectation.clone());
        expectation
    }

    /// Schedule `task` on this unit's run loop after `delay`.
    pub fn dispatch_after(&self, delay: Duration, task: impl FnOnce() + 'static) {
        self.run_loop.dispatch_after(delay, Box::new(task));
    }

    /// Block until every live expectation is fulfilled or `timeout` elapses.
    ///
    /// Unmet expectations are reported; the live set is cleared either way.
    #[track_caller]
    pub fn wait_for_expectations(&mut self, timeout: Duration) -> WaitOutcome {
        let location = SourceLocation::caller();
        self.wait_at(timeout, location)
    }

    /// Like [`wait_for_expectations`](Self::wait_for_expectations), then hand the result to `on_complete`.
    ///
    /// `on_complete` is not called when there was nothing to wait for.
    #[track_caller]
    pub fn wait_for_expectations_with(
        &mut self,
        timeout: Duration,
        on_complete: impl FnOnce(Result<(), WaitError>),
    ) -> WaitOutcome {
        let location = SourceLocation::caller();
        let outcome = self.wait_at(timeout, location);
        if outcome != WaitOutcome::NothingToWait {
            on_complete(outcome.clone().into_result());
        }
        outcome
    }

    fn wait_at(&mut self, timeout: Duration, location: SourceLocation) -> WaitOutcome {
        let expectations = std::mem::take(&mut self.expectations);
        self.waiter.wait(
            &expectations,
            timeout,
            self.run_loop.as_ref(),
            self.reporter.as_ref(),
            location,
        )
    }

    /// Account for expectations that were created but never waited for.
    ///
    /// Each one is reported, closed and marked so that dropping it stays silent. Returns how many were found.
    pub fn finalize(&mut self) -> usize {
        let abandoned = std::mem::take(&mut self.expectations);
        for expectation in &abandoned {
            if expectation.is_fulfilled() {
                expectation.close();
                continue;
            }
            tracing::warn!(label = expectation.label(), "expectation never waited for");
            self.reporter.record(Failure::new(
                FailureKind::NeverWaited {
                    label: expectation.label().to_string(),
                },
                expectation.location(),
            ));
            expectation.mark_reported();
            expectation.close();
        }
        abandoned.iter().filter(|e| !e.is_fulfilled()).count()
    }

    /// Time `block` over the configured number of iterations and print a summary line.
    pub fn measure(&self, label: &str, block: impl FnMut()) -> Measurement {
        measure::measure_iterations(label, self.measure_iterations, block)
    }
}
