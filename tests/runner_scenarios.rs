//! End-to-end runs of small suites through `TestRunner`.

use std::cell::{Cell, RefCell};
use std::io::{self, Write};
use std::rc::Rc;
use std::time::{Duration, Instant};

use casework::{
    CaseContext, CaseState, CollectingReporter, ConsoleListener, DiscoveredUnit, HarnessConfig, Measurement,
    Registry, RunListener, RunSummary, SilentListener, TestRunner, UnitOutcome, suite,
};

thread_local! {
    static SET_UPS: Cell<usize> = const { Cell::new(0) };
    static TEAR_DOWNS: Cell<usize> = const { Cell::new(0) };
    static TIMED_OUT_TEAR_DOWNS: Cell<usize> = const { Cell::new(0) };
    static BODIES: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
    static MEASURED: RefCell<Option<Measurement>> = const { RefCell::new(None) };
}

fn bump(counter: &'static std::thread::LocalKey<Cell<usize>>) {
    counter.with(|c| c.set(c.get() + 1));
}

fn fast_config() -> HarnessConfig {
    HarnessConfig::default().with_poll_interval(Duration::from_millis(10))
}

fn quiet_runner(registry: Registry, reporter: Rc<CollectingReporter>) -> TestRunner {
    TestRunner::with_config(registry, fast_config())
        .with_reporter(reporter)
        .with_listener(SilentListener)
}

#[derive(CaseState)]
struct Lifecycle {
    cx: CaseContext,
}

#[suite]
#[allow(non_snake_case)]
impl Lifecycle {
    fn set_up(&mut self) {
        bump(&SET_UPS);
    }

    fn tear_down(&mut self) {
        bump(&TEAR_DOWNS);
    }

    fn testAlwaysPasses(&mut self) {
        BODIES.with(|b| b.borrow_mut().push("testAlwaysPasses"));
    }

    fn testReportsFailure(&mut self) {
        BODIES.with(|b| b.borrow_mut().push("testReportsFailure"));
        self.cx.fail("deliberate");
    }

    fn testPanics(&mut self) {
        BODIES.with(|b| b.borrow_mut().push("testPanics"));
        panic!("boom");
    }

    fn testTimesOut(&mut self) {
        BODIES.with(|b| b.borrow_mut().push("testTimesOut"));
        let _never = self.cx.expectation("never");
        self.cx.wait_for_expectations(Duration::from_millis(200));
    }
}

#[test]
fn set_up_and_tear_down_bracket_every_method() {
    let reporter = Rc::new(CollectingReporter::new());
    let summary = quiet_runner(Registry::new().with::<Lifecycle>(), reporter.clone()).run();

    assert_eq!(SET_UPS.with(Cell::get), 4);
    assert_eq!(TEAR_DOWNS.with(Cell::get), 4);
    assert_eq!(
        BODIES.with(|b| b.borrow().clone()),
        vec!["testAlwaysPasses", "testReportsFailure", "testPanics", "testTimesOut"]
    );
    assert_eq!(
        summary,
        RunSummary {
            units: 4,
            passed: 1,
            failed: 3,
            failures: 3,
        }
    );

    let messages = reporter.messages();
    assert_eq!(messages.len(), 3);
    assert!(messages[0].ends_with("failed: deliberate"), "{messages:?}");
    assert_eq!(messages[1], "test panicked: boom (in testPanics)");
    assert!(messages[2].ends_with("expectation not met: never"), "{messages:?}");
}

#[derive(CaseState)]
struct TimesOut {
    cx: CaseContext,
}

#[suite]
#[allow(non_snake_case)]
impl TimesOut {
    fn tear_down(&mut self) {
        bump(&TIMED_OUT_TEAR_DOWNS);
    }

    fn testTimesOut(&mut self) {
        let _never = self.cx.expectation("never");
        self.cx.wait_for_expectations(Duration::from_millis(200));
    }
}

#[test]
fn timed_out_wait_reports_once_and_the_run_completes() {
    let reporter = Rc::new(CollectingReporter::new());
    let mut runner = quiet_runner(Registry::new().with::<TimesOut>(), reporter.clone());

    let started = Instant::now();
    assert!(runner.run_all());
    assert!(started.elapsed() >= Duration::from_millis(200));

    let messages = reporter.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("never"));
    assert_eq!(TIMED_OUT_TEAR_DOWNS.with(Cell::get), 1);
}

#[derive(CaseState)]
struct Counter {
    cx: CaseContext,
    calls: usize,
}

#[suite]
impl Counter {
    fn test_first(&mut self) {
        self.calls += 1;
        self.cx.assert_eq(self.calls, 1, "fresh instance");
    }

    fn test_second(&mut self) {
        self.calls += 1;
        self.cx.assert_eq(self.calls, 1, "fresh instance");
    }
}

#[test]
fn every_method_runs_on_a_fresh_instance() {
    let reporter = Rc::new(CollectingReporter::new());
    let summary = quiet_runner(Registry::new().with::<Counter>(), reporter.clone()).run();
    assert!(summary.is_clean(), "{:?}", reporter.messages());
    assert_eq!(summary.passed, 2);
}

#[derive(CaseState)]
struct Abandons {
    cx: CaseContext,
}

#[suite]
impl Abandons {
    fn test_never_waits(&mut self) {
        let _forgotten = self.cx.expectation("forgotten");
    }
}

#[test]
fn expectations_never_waited_for_are_reported() {
    let reporter = Rc::new(CollectingReporter::new());
    let summary = quiet_runner(Registry::new().with::<Abandons>(), reporter.clone()).run();
    assert_eq!(summary.failures, 1);
    assert!(reporter.messages()[0].ends_with("expectation created but never waited for: forgotten"));
}

#[derive(CaseState)]
struct Timed {
    cx: CaseContext,
}

#[suite]
impl Timed {
    fn test_sleep(&mut self) {
        let measurement = self.cx.measure("sleep", || std::thread::sleep(Duration::from_millis(10)));
        MEASURED.with(|m| *m.borrow_mut() = Some(measurement));
    }
}

#[test]
fn measure_uses_the_configured_iterations() {
    let reporter = Rc::new(CollectingReporter::new());
    let mut runner = TestRunner::with_config(Registry::new().with::<Timed>(), fast_config().with_measure_iterations(3))
        .with_reporter(reporter.clone())
        .with_listener(SilentListener);
    assert!(runner.run().is_clean());

    let measurement = MEASURED.with(|m| m.borrow_mut().take()).unwrap();
    assert_eq!(measurement.label, "sleep");
    assert_eq!(measurement.samples.len(), 3);
    assert!(measurement.average() >= 0.010);
    assert!(measurement.average() < 0.5);
}

/// A writer the test can read back after the runner takes ownership of the listener.
#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(CaseState)]
struct Narrated {
    cx: CaseContext,
}

#[suite]
#[allow(non_snake_case)]
impl Narrated {
    fn testAlwaysPasses(&mut self) {}

    fn testFails(&mut self) {
        self.cx.fail("nope");
    }

    fn helper(&mut self) {}
}

#[derive(CaseState)]
struct Second {
    cx: CaseContext,
}

#[suite]
impl Second {
    fn test_one(&mut self) {
        self.cx.assert_true(true, "trivially");
    }
}

#[test]
fn console_narration() {
    let out = SharedBuf::default();
    let mut runner = TestRunner::with_config(Registry::new().with::<Narrated>().with::<Second>(), fast_config())
        .with_reporter(Rc::new(CollectingReporter::new()))
        .with_listener(ConsoleListener::new(out.clone()));
    assert!(runner.run_all());

    insta::assert_snapshot!(out.contents(), @r"
    Executing Narrated.testAlwaysPasses
    - PASSED: Narrated.testAlwaysPasses
    Executing Narrated.testFails
    - FAILED: Narrated.testFails (1 failure(s))

    Executing Second.test_one
    - PASSED: Second.test_one

    1 FAILURE(S) REPORTED
    ");
}

#[test]
fn clean_run_prints_the_success_banner() {
    let out = SharedBuf::default();
    let mut runner = TestRunner::with_config(Registry::new().with::<Second>(), fast_config())
        .with_reporter(Rc::new(CollectingReporter::new()))
        .with_listener(ConsoleListener::new(out.clone()));
    let summary = runner.run();
    assert!(summary.is_clean());
    assert!(out.contents().ends_with("\nALL TESTS PASSED\n"));
}

#[derive(CaseState)]
struct LeavesWorkBehind {
    cx: CaseContext,
}

#[suite]
impl LeavesWorkBehind {
    fn test_a_times_out(&mut self) {
        let late = self.cx.expectation("late");
        self.cx.dispatch_after(Duration::from_millis(150), move || late.fulfill());
        self.cx.wait_for_expectations(Duration::from_millis(20));
    }

    fn test_b_passes(&mut self) {
        let own = self.cx.expectation("own");
        self.cx.dispatch_after(Duration::from_millis(300), move || own.fulfill());
        self.cx.wait_for_expectations(Duration::from_secs(2));
    }
}

/// Records each unit's narrated outcome.
#[derive(Clone, Default)]
struct Outcomes(Rc<RefCell<Vec<(String, UnitOutcome)>>>);

impl RunListener for Outcomes {
    fn on_unit_start(&mut self, _unit: &DiscoveredUnit) {}

    fn on_unit_complete(&mut self, unit: &DiscoveredUnit, outcome: UnitOutcome) {
        self.0.borrow_mut().push((unit.to_string(), outcome));
    }

    fn on_run_complete(&mut self, _summary: &RunSummary) {}
}

#[test]
fn work_left_scheduled_by_one_unit_never_reaches_the_next() {
    let reporter = Rc::new(CollectingReporter::new());
    let outcomes = Outcomes::default();
    let mut runner = TestRunner::with_config(Registry::new().with::<LeavesWorkBehind>(), fast_config())
        .with_reporter(reporter.clone())
        .with_listener(outcomes.clone());

    let summary = runner.run();

    assert_eq!(reporter.messages(), vec!["expectation not met: late"]);
    assert_eq!(
        *outcomes.0.borrow(),
        vec![
            ("LeavesWorkBehind.test_a_times_out".to_string(), UnitOutcome::Failed(1)),
            ("LeavesWorkBehind.test_b_passes".to_string(), UnitOutcome::Passed),
        ]
    );
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failures, 1);
}

#[derive(CaseState)]
struct Unbounded {
    cx: CaseContext,
}

#[suite]
impl Unbounded {
    fn test_huge_timeout(&mut self) {
        let ready = self.cx.expectation("ready");
        ready.fulfill();
        self.cx.wait_for_expectations(Duration::MAX);
    }

    fn test_huge_timeout_waits_for_dispatched_work(&mut self) {
        let later = self.cx.expectation("later");
        self.cx.dispatch_after(Duration::from_millis(20), move || later.fulfill());
        self.cx.wait_for_expectations(Duration::MAX);
    }
}

#[test]
fn unbounded_timeouts_wait_without_a_deadline() {
    let reporter = Rc::new(CollectingReporter::new());
    let summary = quiet_runner(Registry::new().with::<Unbounded>(), reporter.clone()).run();
    assert!(summary.is_clean(), "{:?}", reporter.messages());
    assert_eq!(summary.passed, 2);
}
