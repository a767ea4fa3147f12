//! Failure values and the reporters that receive them.
//!
//! ## Reporting model
//!
//! Every problem the harness detects (fulfillment misuse, unmet expectations, failed assertions, panics caught by the
//! runner) becomes a [`Failure`] handed to a single [`FailureReporter`]. Reporting never unwinds: the caller always
//! proceeds to its next step after `record` returns.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::location::SourceLocation;

/// What went wrong. The `Display` output is the user-facing failure message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureKind {
    #[error("expectation already fulfilled: {label}")]
    AlreadyFulfilled { label: String },

    #[error("expectation fulfilled after wait completed: {label}")]
    FulfilledAfterWait { label: String },

    #[error("waited for expectations but none were created")]
    NothingToWait,

    #[error("expectation not met: {label}")]
    Unmet { label: String },

    #[error("expectation created but never waited for: {label}")]
    NeverWaited { label: String },

    #[error("{message}")]
    Assertion { message: String },

    #[error("test panicked: {message}")]
    Panicked { message: String },
}

/// A reported failure: its kind plus where it happened, when known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub location: Option<SourceLocation>,
}

impl Failure {
    pub fn new(kind: FailureKind, location: SourceLocation) -> Self {
        Self {
            kind,
            location: Some(location),
        }
    }

    /// A failure with no meaningful source location (e.g. a caught panic).
    pub fn unlocated(kind: FailureKind) -> Self {
        Self { kind, location: None }
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}: {}", location, self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Receives failures detected by the harness.
pub trait FailureReporter {
    /// Record one failure. Implementations must return normally.
    fn record(&self, failure: Failure);
}

/// Emits every failure as a `tracing` error event and counts them.
#[derive(Debug, Default)]
pub struct LogReporter {
    count: Cell<usize>,
}

impl LogReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.get()
    }
}

impl FailureReporter for LogReporter {
    fn record(&self, failure: Failure) {
        self.count.set(self.count.get() + 1);
        match failure.location {
            Some(location) => tracing::error!(
                file = location.file,
                line = location.line,
                "{}",
                failure.kind
            ),
            None => tracing::error!("{}", failure.kind),
        }
    }
}

/// Keeps every failure in memory, in report order.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    failures: RefCell<Vec<Failure>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<Failure> {
        self.failures.borrow().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.failures.borrow().iter().map(Failure::message).collect()
    }

    pub fn len(&self) -> usize {
        self.failures.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.borrow().is_empty()
    }
}

impl FailureReporter for CollectingReporter {
    fn record(&self, failure: Failure) {
        self.failures.borrow_mut().push(failure);
    }
}

/// Forwards to another reporter while counting what passes through.
///
/// The runner compares counts before and after a unit to decide how to narrate it.
pub struct TallyReporter {
    inner: Rc<dyn FailureReporter>,
    count: Cell<usize>,
}

impl TallyReporter {
    pub fn new(inner: Rc<dyn FailureReporter>) -> Self {
        Self {
            inner,
            count: Cell::new(0),
        }
    }

    pub fn count(&self) -> usize {
        self.count.get()
    }
}

impl FailureReporter for TallyReporter {
    fn record(&self, failure: Failure) {
        self.count.set(self.count.get() + 1);
        self.inner.record(failure);
    }
}
