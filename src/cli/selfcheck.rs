//! Built-in self-check suites run by `casework run`.
//!
//! They exercise the harness end to end on the host: lifecycle hooks, run-loop driven expectations and the
//! measurement utility.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::{CaseContext, CaseState, Registry, suite};

/// The registry of every self-check variant, in run order.
pub fn registry() -> Registry {
    Registry::new()
        .with::<LifecycleSelfCheck>()
        .with::<ExpectationSelfCheck>()
        .with::<MeasureSelfCheck>()
}

#[derive(CaseState)]
pub struct LifecycleSelfCheck {
    cx: CaseContext,
    set_up_ran: bool,
}

#[suite]
impl LifecycleSelfCheck {
    fn set_up(&mut self) {
        self.set_up_ran = true;
    }

    fn test_set_up_runs_first(&mut self) {
        self.cx.assert_true(self.set_up_ran, "set_up ran before the test method");
    }

    fn test_instances_are_fresh(&mut self) {
        // A fresh instance gets its own context; nothing is left over from another unit.
        self.cx.assert_eq(self.cx.live_expectations(), 0, "no expectations carried over");
    }
}

#[derive(CaseState)]
pub struct ExpectationSelfCheck {
    cx: CaseContext,
}

#[suite]
impl ExpectationSelfCheck {
    fn test_dispatched_work_fulfills(&mut self) {
        let fired = self.cx.expectation("dispatched work ran");
        self.cx.dispatch_after(Duration::from_millis(20), move || fired.fulfill());
        let outcome = self.cx.wait_for_expectations(Duration::from_secs(2));
        self.cx.assert_true(outcome.is_satisfied(), "wait satisfied");
    }

    fn test_fulfilled_before_wait(&mut self) {
        let ready = self.cx.expectation("already done");
        ready.fulfill();
        let outcome = self.cx.wait_for_expectations(Duration::from_millis(1));
        self.cx.assert_true(outcome.is_satisfied(), "wait satisfied without polling");
    }

    fn test_several_expectations(&mut self) {
        let remaining = Rc::new(Cell::new(3));
        for i in 0..3u64 {
            let done = self.cx.expectation(format!("step {i}"));
            let remaining = remaining.clone();
            self.cx.dispatch_after(Duration::from_millis(5 * (3 - i)), move || {
                remaining.set(remaining.get() - 1);
                done.fulfill();
            });
        }
        self.cx.wait_for_expectations_with(Duration::from_secs(2), |result| {
            if let Err(err) = result {
                tracing::warn!(%err, "self-check wait failed");
            }
        });
        self.cx.assert_eq(remaining.get(), 0, "every step ran");
    }
}

#[derive(CaseState)]
pub struct MeasureSelfCheck {
    cx: CaseContext,
}

#[suite]
impl MeasureSelfCheck {
    fn test_measure_reports_samples(&mut self) {
        let measurement = self.cx.measure("busy loop", || {
            let mut total = 0u64;
            for i in 0..10_000u64 {
                total = total.wrapping_add(i);
            }
            std::hint::black_box(total);
        });
        let expected = self.cx.measure_iterations();
        self.cx.assert_eq(measurement.samples.len(), expected, "one sample per iteration");
        self.cx.assert_true(measurement.average() >= 0.0, "average is not negative");
    }
}
