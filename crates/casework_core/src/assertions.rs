//! Assertion helpers on [`CaseContext`].
//!
//! These report through the context's [`FailureReporter`](crate::FailureReporter) instead of panicking, so a failed
//! check never skips the rest of the unit's lifecycle.

use std::fmt::Debug;

use crate::context::CaseContext;
use crate::failure::{Failure, FailureKind};
use crate::location::SourceLocation;

fn with_message(base: String, message: &str) -> String {
    if message.is_empty() {
        base
    } else {
        format!("{base}: {message}")
    }
}

impl CaseContext {
    #[track_caller]
    fn assertion_failed(&self, message: String) {
        self.reporter()
            .record(Failure::new(FailureKind::Assertion { message }, SourceLocation::caller()));
    }

    /// Report a failure when `condition` is false.
    #[track_caller]
    pub fn assert_true(&self, condition: bool, message: &str) {
        if !condition {
            self.assertion_failed(with_message("assertion failed".to_string(), message));
        }
    }

    /// Report a failure when `condition` is true.
    #[track_caller]
    pub fn assert_false(&self, condition: bool, message: &str) {
        if condition {
            self.assertion_failed(with_message("assertion failed: expected false".to_string(), message));
        }
    }

    #[track_caller]
    pub fn assert_eq<T: PartialEq + Debug>(&self, left: T, right: T, message: &str) {
        if left != right {
            self.assertion_failed(with_message(
                format!("assertion failed: left != right\n  left:  {left:?}\n  right: {right:?}"),
                message,
            ));
        }
    }

    #[track_caller]
    pub fn assert_ne<T: PartialEq + Debug>(&self, left: T, right: T, message: &str) {
        if left == right {
            self.assertion_failed(with_message(
                format!("assertion failed: left == right\n  left:  {left:?}\n  right: {right:?}"),
                message,
            ));
        }
    }

    #[track_caller]
    pub fn assert_none<T: Debug>(&self, value: Option<T>, message: &str) {
        if let Some(value) = value {
            self.assertion_failed(with_message(format!("assertion failed: expected None, got Some({value:?})"), message));
        }
    }

    /// Report an unconditional failure.
    #[track_caller]
    pub fn fail(&self, message: &str) {
        self.assertion_failed(with_message("failed".to_string(), message));
    }
}
