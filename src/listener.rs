//! Progress narration.
//!
//! ## RunListener Trait
//!
//! The runner reports progress through a `RunListener`, keeping narration apart from execution. The default
//! [`ConsoleListener`] prints the classic one-line-per-step transcript; custom listeners can log, count or stay
//! silent.

use std::io::{self, Write};

use crate::discovery::DiscoveredUnit;

/// Outcome of one unit, as narrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    Passed,
    /// The unit reported this many failures.
    Failed(usize),
}

impl UnitOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, UnitOutcome::Passed)
    }
}

/// Totals of a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub units: usize,
    pub passed: usize,
    pub failed: usize,
    /// Every failure reported during the run, including several from one unit.
    pub failures: usize,
}

impl RunSummary {
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }
}

/// Receives progress events from the runner.
pub trait RunListener {
    /// Called after `set_up`, right before the test method runs
    fn on_unit_start(&mut self, unit: &DiscoveredUnit);

    /// Called after `tear_down`
    fn on_unit_complete(&mut self, unit: &DiscoveredUnit, outcome: UnitOutcome);

    /// Called after the last unit of a variant
    fn on_variant_complete(&mut self, _variant: &str) {}

    /// Called once every unit has run
    fn on_run_complete(&mut self, summary: &RunSummary);
}

/// Writes the progress transcript to any writer (stdout by default).
pub struct ConsoleListener<W: Write = io::Stdout> {
    out: W,
}

impl ConsoleListener {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl Default for ConsoleListener {
    fn default() -> Self {
        Self::stdout()
    }
}

impl<W: Write> ConsoleListener<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

// Narration is best-effort: a closed stdout must not abort the run.
impl<W: Write> RunListener for ConsoleListener<W> {
    fn on_unit_start(&mut self, unit: &DiscoveredUnit) {
        let _ = writeln!(self.out, "Executing {unit}");
    }

    fn on_unit_complete(&mut self, unit: &DiscoveredUnit, outcome: UnitOutcome) {
        let _ = match outcome {
            UnitOutcome::Passed => writeln!(self.out, "- PASSED: {unit}"),
            UnitOutcome::Failed(count) => writeln!(self.out, "- FAILED: {unit} ({count} failure(s))"),
        };
    }

    fn on_variant_complete(&mut self, _variant: &str) {
        let _ = writeln!(self.out);
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        let _ = if summary.is_clean() {
            writeln!(self.out, "ALL TESTS PASSED")
        } else {
            writeln!(self.out, "{} FAILURE(S) REPORTED", summary.failures)
        };
        let _ = self.out.flush();
    }
}

/// Discards all narration.
#[derive(Debug, Default)]
pub struct SilentListener;

impl RunListener for SilentListener {
    fn on_unit_start(&mut self, _unit: &DiscoveredUnit) {}

    fn on_unit_complete(&mut self, _unit: &DiscoveredUnit, _outcome: UnitOutcome) {}

    fn on_run_complete(&mut self, _summary: &RunSummary) {}
}
