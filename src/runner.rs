//! Test runner implementation
//!
//! Executes every discovered unit in discovery order on the calling thread:
//!
//! 1. build a fresh [`CaseContext`] and variant instance
//! 2. `set_up`
//! 3. invoke the test method
//! 4. `tear_down`
//! 5. finalize the context (expectations that were never waited for are reported)
//! 6. discard work the unit left scheduled on the run loop
//!
//! Failures are reported, never thrown: a unit that reports failures, or panics, still goes through every remaining
//! step, and the run always continues with the next unit.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::process;
use std::rc::Rc;

use casework_core::{
    CaseContext, ExpectationWaiter, Failure, FailureKind, FailureReporter, LogReporter, MainQueue, RunLoop,
    TallyReporter,
};

use crate::config::HarnessConfig;
use crate::discovery::{DiscoveredUnit, LiveUnit, Registry};
use crate::listener::{ConsoleListener, RunListener, RunSummary, SilentListener, UnitOutcome};

/// Drives discovery and execution for one registry.
pub struct TestRunner {
    registry: Registry,
    config: HarnessConfig,
    reporter: Rc<dyn FailureReporter>,
    run_loop: Rc<dyn RunLoop>,
    listener: Box<dyn RunListener>,
}

impl TestRunner {
    /// Runner with default configuration, a [`LogReporter`], a [`MainQueue`] and console narration.
    pub fn new(registry: Registry) -> Self {
        Self::with_config(registry, HarnessConfig::default())
    }

    pub fn with_config(registry: Registry, config: HarnessConfig) -> Self {
        let listener: Box<dyn RunListener> = if config.quiet {
            Box::new(SilentListener)
        } else {
            Box::new(ConsoleListener::stdout())
        };
        Self {
            registry,
            config,
            reporter: Rc::new(LogReporter::new()),
            run_loop: Rc::new(MainQueue::new()),
            listener,
        }
    }

    pub fn with_reporter(mut self, reporter: Rc<dyn FailureReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_run_loop(mut self, run_loop: Rc<dyn RunLoop>) -> Self {
        self.run_loop = run_loop;
        self
    }

    pub fn with_listener(mut self, listener: impl RunListener + 'static) -> Self {
        self.listener = Box::new(listener);
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// The units this runner would execute, in order.
    pub fn discover(&self) -> Vec<DiscoveredUnit> {
        self.registry.discover()
    }

    /// Run every unit and return `true` once all of them executed.
    ///
    /// Failures surface through the reporter, not through the return value.
    pub fn run_all(&mut self) -> bool {
        self.run();
        true
    }

    /// Run every unit, then terminate the process: exit code 0 when [`run_all`](Self::run_all) succeeds, 1
    /// otherwise. With `strict_exit`, any reported failure also exits 1.
    pub fn run_all_and_exit(&mut self) -> ! {
        let summary = self.run();
        let code = if self.config.strict_exit && !summary.is_clean() {
            1
        } else {
            0
        };
        tracing::debug!(code, "exiting after test run");
        process::exit(code)
    }

    /// Run every unit and return the totals.
    #[tracing::instrument(skip_all, fields(variants = self.registry.variant_names().len()))]
    pub fn run(&mut self) -> RunSummary {
        let tally = Rc::new(TallyReporter::new(self.reporter.clone()));
        let units = self.registry.discover();
        let mut summary = RunSummary::default();

        for (index, unit) in units.iter().enumerate() {
            let before = tally.count();
            self.run_unit(unit, tally.clone());
            let reported = tally.count() - before;

            let outcome = if reported == 0 {
                summary.passed += 1;
                UnitOutcome::Passed
            } else {
                summary.failed += 1;
                UnitOutcome::Failed(reported)
            };
            summary.units += 1;
            self.listener.on_unit_complete(unit, outcome);

            let last_of_variant = units
                .get(index + 1)
                .is_none_or(|next| next.variant() != unit.variant());
            if last_of_variant {
                self.listener.on_variant_complete(unit.variant());
            }
        }

        summary.failures = tally.count();
        tracing::info!(
            units = summary.units,
            passed = summary.passed,
            failed = summary.failed,
            "test run complete"
        );
        self.listener.on_run_complete(&summary);
        summary
    }

    fn run_unit(&mut self, unit: &DiscoveredUnit, reporter: Rc<TallyReporter>) {
        tracing::debug!(variant = unit.variant(), method = unit.method(), "running unit");
        let context = CaseContext::new(reporter.clone(), self.run_loop.clone())
            .with_waiter(ExpectationWaiter::new(self.config.poll_interval))
            .with_measure_iterations(self.config.measure_iterations);

        let mut live = unit.instantiate(context);
        guarded(&*reporter, "set_up", || live.set_up());
        self.listener.on_unit_start(unit);
        guarded(&*reporter, unit.method(), || live.invoke());
        guarded(&*reporter, "tear_down", || live.tear_down());
        finalize(&mut *live);

        // Callbacks this unit left scheduled must not fire during the next unit.
        let discarded = self.run_loop.discard_pending();
        if discarded > 0 {
            tracing::debug!(discarded, "discarded work left scheduled by the unit");
        }
    }
}

fn finalize(live: &mut dyn LiveUnit) {
    let abandoned = live.context().finalize();
    if abandoned > 0 {
        tracing::debug!(abandoned, "expectations were never waited for");
    }
}

/// Run one lifecycle step, turning a panic into a reported failure.
fn guarded(reporter: &dyn FailureReporter, step: &str, f: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        let message = panic_message(payload.as_ref());
        tracing::debug!(step, %message, "caught panic");
        reporter.record(Failure::unlocated(FailureKind::Panicked {
            message: format!("{message} (in {step})"),
        }));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run every unit of `registry` with default configuration.
pub fn run_all(registry: Registry) -> bool {
    TestRunner::new(registry).run_all()
}

/// Run every unit of `registry` with configuration from the environment, then exit the process.
pub fn run_all_and_exit(registry: Registry) -> ! {
    let config = HarnessConfig::from_env().unwrap_or_else(|err| {
        tracing::warn!(%err, "ignoring invalid configuration");
        HarnessConfig::default()
    });
    TestRunner::with_config(registry, config).run_all_and_exit()
}
