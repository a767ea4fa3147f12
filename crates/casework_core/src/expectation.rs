//! Single-use completion tokens for asynchronous tests.
//!
//! ## State machine
//!
//! ```text
//! Pending ──fulfill──▶ Fulfilled
//!    │
//!    └──wait closes──▶ Unmet (failure already reported)
//! ```
//!
//! A closed expectation stays closed: fulfilling it afterwards is a reported failure, as is fulfilling twice.
//! Non-fulfillment is tracked with a separate `reported` flag so the drop check never re-raises a failure the
//! waiter already reported.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::failure::{Failure, FailureKind, FailureReporter};
use crate::location::SourceLocation;

/// Observable state of an [`Expectation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectationState {
    /// Not fulfilled, and a wait may still observe it.
    Pending,
    Fulfilled,
    /// The owning wait closed before fulfillment.
    Unmet,
}

struct Inner {
    label: String,
    location: SourceLocation,
    fulfilled: Cell<bool>,
    waitable: Cell<bool>,
    reported: Cell<bool>,
    reporter: Rc<dyn FailureReporter>,
}

/// Handle to an expectation created by a [`CaseContext`](crate::CaseContext).
///
/// Clones share state, so a callback can capture one and fulfill it later on the same execution context.
#[derive(Clone)]
pub struct Expectation {
    inner: Rc<Inner>,
}

impl Expectation {
    pub(crate) fn new(label: String, location: SourceLocation, reporter: Rc<dyn FailureReporter>) -> Self {
        Self {
            inner: Rc::new(Inner {
                label,
                location,
                fulfilled: Cell::new(false),
                waitable: Cell::new(true),
                reported: Cell::new(false),
                reporter,
            }),
        }
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Where the expectation was created.
    pub fn location(&self) -> SourceLocation {
        self.inner.location
    }

    pub fn is_fulfilled(&self) -> bool {
        self.inner.fulfilled.get()
    }

    pub fn is_waitable(&self) -> bool {
        self.inner.waitable.get()
    }

    pub fn state(&self) -> ExpectationState {
        if self.inner.fulfilled.get() {
            ExpectationState::Fulfilled
        } else if self.inner.waitable.get() {
            ExpectationState::Pending
        } else {
            ExpectationState::Unmet
        }
    }

    /// Mark the expected event as having happened.
    ///
    /// Misuse is reported at the caller's location and leaves the state untouched: fulfilling after the owning
    /// wait closed reports "fulfilled after wait completed" (whatever the prior state), and fulfilling an open
    /// expectation twice reports "already fulfilled".
    #[track_caller]
    pub fn fulfill(&self) {
        let inner = &self.inner;
        if !inner.waitable.get() {
            inner.reporter.record(Failure::new(
                FailureKind::FulfilledAfterWait {
                    label: inner.label.clone(),
                },
                SourceLocation::caller(),
            ));
            return;
        }
        if inner.fulfilled.get() {
            inner.reporter.record(Failure::new(
                FailureKind::AlreadyFulfilled {
                    label: inner.label.clone(),
                },
                SourceLocation::caller(),
            ));
            return;
        }
        inner.fulfilled.set(true);
        tracing::trace!(label = %inner.label, "expectation fulfilled");
    }

    /// Close the wait window. Later fulfillment attempts are reported.
    pub(crate) fn close(&self) {
        self.inner.waitable.set(false);
    }

    /// Note that non-fulfillment has been reported, so dropping the last handle stays silent.
    pub(crate) fn mark_reported(&self) {
        self.inner.reported.set(true);
    }
}

impl fmt::Debug for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expectation")
            .field("label", &self.inner.label)
            .field("location", &self.inner.location)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if self.fulfilled.get() || self.reported.get() || std::thread::panicking() {
            return;
        }
        // Neither fulfilled nor accounted for by a wait: the harness bookkeeping was skipped.
        tracing::error!(
            target: "casework::expectation",
            label = %self.label,
            file = self.location.file,
            line = self.location.line,
            "expectation dropped without being fulfilled or waited for"
        );
        if cfg!(debug_assertions) {
            panic!(
                "expectation dropped without being fulfilled: {} ({})",
                self.label, self.location
            );
        }
    }
}
