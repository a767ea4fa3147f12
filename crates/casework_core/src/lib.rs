#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
//! Expectations, the cooperative waiter and host run loops for the casework harness.
//!
//! This crate owns everything a single test unit touches while it runs:
//! - [`Expectation`]: a single-use completion token with a small state machine,
//! - [`ExpectationWaiter`]: the polling loop that blocks until expectations are fulfilled or time runs out,
//! - [`RunLoop`]: the host's event-processing facility the waiter yields to ([`MainQueue`], or `TokioRunLoop`
//!   behind the `tokio` feature),
//! - [`CaseContext`]: per-unit state tying the above to a [`FailureReporter`],
//! - [`measure`]: a wall-clock measurement utility.
//!
//! ## Notes
//!
//! - Everything here is single-threaded (`Rc`/`Cell`); expectations are fulfilled on the context that waits.
//! - Nothing in this crate installs a `tracing` subscriber; that is left to the hosting binary.

mod assertions;
pub mod context;
pub mod expectation;
pub mod failure;
pub mod location;
pub mod measure;
pub mod run_loop;
pub mod waiter;

pub use context::CaseContext;
pub use expectation::{Expectation, ExpectationState};
pub use failure::{CollectingReporter, Failure, FailureKind, FailureReporter, LogReporter, TallyReporter};
pub use location::SourceLocation;
pub use measure::{Measurement, measure, measure_iterations};
pub use run_loop::{MainQueue, RunLoop, Task};
pub use waiter::{DEFAULT_POLL_INTERVAL, ExpectationWaiter, WaitError, WaitOutcome};

#[cfg(feature = "tokio")]
pub use run_loop::TokioRunLoop;
