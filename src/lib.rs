#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
//! casework: a minimal test-execution harness
//!
//! casework runs test variants on hosts where a full test framework is unavailable. Variants register themselves
//! explicitly, the runner executes each discovered test method on a fresh instance with `set_up` / `tear_down`
//! hooks, and asynchronous work is awaited through expectations and a cooperative, run-loop-driven wait.
//!
//! ## Example
//!
//! ```ignore
//! use std::time::Duration;
//! use casework::{CaseContext, CaseState, Registry, suite};
//!
//! #[derive(CaseState)]
//! struct TimerTests {
//!     cx: CaseContext,
//! }
//!
//! #[suite]
//! impl TimerTests {
//!     fn test_timer_fires(&mut self) {
//!         let fired = self.cx.expectation("timer fired");
//!         self.cx.dispatch_after(Duration::from_millis(50), move || fired.fulfill());
//!         self.cx.wait_for_expectations(Duration::from_secs(1));
//!     }
//! }
//!
//! fn main() {
//!     casework::run_all_and_exit(Registry::new().with::<TimerTests>());
//! }
//! ```
//!
//! ## Panic Policy
//!
//! - **Library code**: reports failures through a `FailureReporter` and propagates errors with `Result`; no
//!   `unwrap`/`expect` (`#![deny(clippy::unwrap_used)]`).
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//! - **Test bodies run by the harness**: panics are caught per lifecycle step and reported as failures.

// The derive macros emit `::casework::` paths; this lets them resolve inside this crate too.
extern crate self as casework;

pub mod case;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod listener;
pub mod runner;

pub use case::{CaseState, TEST_PREFIX, TestCase, TestMethod, is_test_method_name};
pub use config::{ConfigError, HarnessConfig};
pub use discovery::{DiscoveredUnit, Registry};
pub use listener::{ConsoleListener, RunListener, RunSummary, SilentListener, UnitOutcome};
pub use runner::{TestRunner, run_all, run_all_and_exit};

pub use casework_core::{
    CaseContext, CollectingReporter, Expectation, ExpectationState, ExpectationWaiter, Failure, FailureKind,
    FailureReporter, LogReporter, MainQueue, Measurement, RunLoop, SourceLocation, TallyReporter, Task, WaitError,
    WaitOutcome, measure, measure_iterations,
};

#[cfg(feature = "tokio-host")]
pub use casework_core::TokioRunLoop;

pub use casework_derive::{CaseState, suite};
