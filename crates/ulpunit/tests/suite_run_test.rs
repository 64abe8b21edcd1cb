//! Integration test: suite run loop, failure boundary, and counters.
//!
//! Run: cargo test -p ulpunit --test suite_run_test

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use ulpunit::{
    BufferWriter, Collection, Container, Context, ContractViolation, CountingPolicy, Outcome,
    RawStyle, Suite, SuiteConfig, TestError, TestResult, UnitTest, WriterCollection,
};

type Trace = Rc<RefCell<Vec<String>>>;

/// Records its lifecycle into a shared trace and fails in a chosen way.
struct Tracked {
    label: &'static str,
    trace: Trace,
    mode: Mode,
}

#[derive(Clone, Copy)]
enum Mode {
    Pass,
    AssertFail,
    Error,
    Panic,
    SetupPanic,
}

impl Tracked {
    fn new(label: &'static str, trace: &Trace, mode: Mode) -> Self {
        Self {
            label,
            trace: Rc::clone(trace),
            mode,
        }
    }

    fn log(&self, step: &str) {
        self.trace.borrow_mut().push(format!("{}:{step}", self.label));
    }
}

impl UnitTest for Tracked {
    fn setup(&mut self) {
        self.log("setup");
        if let Mode::SetupPanic = self.mode {
            panic!("setup of {} failed", self.label);
        }
    }

    fn teardown(&mut self) {
        self.log("teardown");
    }

    fn run(&mut self, ctx: &mut Context<'_>) -> TestResult {
        self.log("run");
        match self.mode {
            Mode::Pass => ctx.assert_true(true, "always holds")?,
            Mode::AssertFail => ctx.assert_eq(1, 2, "one is not two")?,
            Mode::Error => {
                ctx.assert_true(true, "before the error")?;
                "not a number".parse::<i32>()?;
            }
            Mode::Panic => {
                ctx.assert_true(true, "before the panic")?;
                panic!("probe {} exploded", self.label);
            }
            Mode::SetupPanic => {}
        }
        Ok(())
    }
}

fn raw_report(writer: &BufferWriter) -> String {
    writer.render(&RawStyle)
}

#[test]
fn assertion_count_matches_executed_assertions_regardless_of_failures() {
    let trace = Trace::default();
    let mut suite = Suite::new("counting");
    suite
        .add_named("a", Tracked::new("a", &trace, Mode::Pass))
        .add_named("b", Tracked::new("b", &trace, Mode::AssertFail))
        .add_named("c", Tracked::new("c", &trace, Mode::Pass))
        .add_named("d", Tracked::new("d", &trace, Mode::AssertFail));

    let writer = BufferWriter::new();
    let summary = suite.run(&writer);

    assert_eq!(summary.stats.assertions, 4);
    assert_eq!(summary.stats.tests, 4);
    assert_eq!(summary.stats.failed, 2);
    assert!(!summary.all_passed());
    assert_eq!(summary.exit_code(), 1);
}

#[test]
fn every_failure_class_is_contained_and_the_run_continues() {
    let trace = Trace::default();
    let mut suite = Suite::new("boundary");
    suite
        .add_named("assert", Tracked::new("assert", &trace, Mode::AssertFail))
        .add_named("error", Tracked::new("error", &trace, Mode::Error))
        .add_named("panic", Tracked::new("panic", &trace, Mode::Panic))
        .add_named("last", Tracked::new("last", &trace, Mode::Pass));

    let writer = BufferWriter::new();
    let summary = suite.run(&writer);

    assert_eq!(summary.stats.failed, 3);
    let outcomes: Vec<_> = summary.failures.iter().map(|f| f.outcome).collect();
    assert_eq!(outcomes, [Outcome::Fail, Outcome::Error, Outcome::Panic]);
    assert!(trace.borrow().contains(&"last:run".to_string()));

    let report = raw_report(&writer);
    assert_eq!(report.matches("FAILED TESTS:").count(), 1);
    assert!(report.contains("*** assert ***"));
    assert!(report.contains("happened: one is not two"));
    assert!(report.contains("error: invalid digit found in string"));
    assert!(report.contains("caught an unknown failure (panic)"));
    assert!(report.contains("payload: probe panic exploded"));
    assert!(report.contains("4 tests, 4 assertions, 3 failed"));
    assert!(report.contains("UNIT TEST FAILED!"));
}

#[test]
fn setup_and_teardown_wrap_every_run() {
    let trace = Trace::default();
    let mut suite = Suite::new("lifecycle");
    suite
        .add_named("ok", Tracked::new("ok", &trace, Mode::Pass))
        .add_named("boom", Tracked::new("boom", &trace, Mode::Panic));
    suite.run(&BufferWriter::new());

    assert_eq!(
        *trace.borrow(),
        [
            "ok:setup",
            "ok:run",
            "ok:teardown",
            "boom:setup",
            "boom:run",
            "boom:teardown",
        ]
    );
}

#[test]
fn setup_panic_skips_run_but_still_tears_down() {
    let trace = Trace::default();
    let mut suite = Suite::new("setup");
    suite
        .add_named("fragile", Tracked::new("fragile", &trace, Mode::SetupPanic))
        .add_named("after", Tracked::new("after", &trace, Mode::Pass));

    let writer = BufferWriter::new();
    let summary = suite.run(&writer);

    assert_eq!(
        *trace.borrow(),
        [
            "fragile:setup",
            "fragile:teardown",
            "after:setup",
            "after:run",
            "after:teardown",
        ]
    );
    assert_eq!(summary.stats.failed, 1);
    assert_eq!(summary.failures[0].outcome, Outcome::Panic);
    assert!(raw_report(&writer).contains("payload: setup of fragile failed"));
}

#[test]
fn collection_member_failure_is_isolated() {
    let trace = Trace::default();
    let mut group = Collection::new();
    group
        .add_named("first", Tracked::new("first", &trace, Mode::Pass))
        .add_named("second", Tracked::new("second", &trace, Mode::Error))
        .add_named("third", Tracked::new("third", &trace, Mode::Pass));
    let mut suite = Suite::new("collection");
    suite.add_collection(group);

    let writer = BufferWriter::new();
    let summary = suite.run(&writer);

    assert_eq!(summary.stats.failed, 1);
    assert_eq!(summary.failures[0].test, "second");
    let runs: Vec<_> = trace
        .borrow()
        .iter()
        .filter(|step| step.ends_with(":run"))
        .cloned()
        .collect();
    assert_eq!(runs, ["first:run", "second:run", "third:run"]);

    let report = raw_report(&writer);
    assert!(report.contains("TESTS TO BE RUN: 1"));
    assert!(report.contains("      first, second, third"));
}

#[test]
fn counting_policy_controls_the_tests_statistic() {
    let build = |counting| {
        let trace = Trace::default();
        let mut group = Collection::named("group");
        group
            .add_named("x", Tracked::new("x", &trace, Mode::Pass))
            .add_named("y", Tracked::new("y", &trace, Mode::Pass));
        let mut suite = Suite::new("policy")
            .with_config(SuiteConfig::default().with_counting(counting));
        suite
            .add_collection(group)
            .add_named("z", Tracked::new("z", &trace, Mode::Pass));
        suite
    };

    let top = build(CountingPolicy::TopLevel).run(&BufferWriter::new());
    let leaves = build(CountingPolicy::Leaves).run(&BufferWriter::new());
    assert_eq!(top.stats.tests, 2);
    assert_eq!(leaves.stats.tests, 3);
    assert_eq!(top.stats.assertions, leaves.stats.assertions);
}

#[test]
fn failed_counter_follows_the_counting_policy() {
    let run = |counting| {
        let trace = Trace::default();
        let mut group = Collection::named("all_bad");
        group
            .add_named("p", Tracked::new("p", &trace, Mode::AssertFail))
            .add_named("q", Tracked::new("q", &trace, Mode::AssertFail))
            .add_named("r", Tracked::new("r", &trace, Mode::AssertFail));
        let mut suite =
            Suite::new("policy").with_config(SuiteConfig::default().with_counting(counting));
        suite
            .add_collection(group)
            .add_named("fine", Tracked::new("fine", &trace, Mode::Pass));
        let writer = BufferWriter::new();
        let summary = suite.run(&writer);
        (summary, raw_report(&writer))
    };

    let (top, top_report) = run(CountingPolicy::TopLevel);
    assert_eq!((top.stats.tests, top.stats.failed), (2, 1));
    assert!(top_report.contains("2 tests, 4 assertions, 1 failed"));
    assert_eq!(top_report.matches("   *** ").count(), 3);
    assert_eq!(top.failures.len(), 3);

    let (leaves, leaves_report) = run(CountingPolicy::Leaves);
    assert_eq!((leaves.stats.tests, leaves.stats.failed), (4, 3));
    assert!(leaves_report.contains("4 tests, 4 assertions, 3 failed"));

    for summary in [&top, &leaves] {
        assert!(summary.stats.failed <= summary.stats.tests);
        assert!(!summary.all_passed());
    }
}

#[test]
fn closure_tests_cover_bool_unit_and_result() {
    let mut suite = Suite::new("closures");
    suite
        .add_fn("returns_true", |_ctx: &mut Context<'_>| true)
        .add_fn("returns_false", |_ctx: &mut Context<'_>| false)
        .add_fn("returns_unit", |ctx: &mut Context<'_>| {
            let _ = ctx.assert_eq("a", "a", "same");
        })
        .add_fn("unit_drops_failure", |ctx: &mut Context<'_>| {
            let _ = ctx.assert_eq(1, 2, "dropped but fatal");
        })
        .add_fn("returns_result", |_ctx: &mut Context<'_>| -> TestResult {
            Err(TestError::msg("gave up"))
        });

    let writer = BufferWriter::new();
    let summary = suite.run(&writer);

    assert_eq!(summary.stats.failed, 3);
    assert_eq!(summary.stats.assertions, 4);
    let failed: Vec<_> = summary.failures.iter().map(|f| f.test.as_str()).collect();
    assert_eq!(failed, ["returns_false", "unit_drops_failure", "returns_result"]);
    assert_eq!(summary.failures[1].outcome, Outcome::Fail);
    let report = raw_report(&writer);
    assert!(report.contains("*** returns_false ***"));
    assert!(report.contains("happened: dropped but fatal"));
    assert!(report.contains("happened: Function failed!"));
    assert!(report.contains("error: gave up"));
}

#[test]
fn performance_leaf_repeats_and_reports_timing() {
    let trace = Trace::default();
    let mut suite = Suite::new("perf");
    suite.add_performance("hot", 5, Tracked::new("hot", &trace, Mode::Pass));

    let writer = BufferWriter::new();
    let summary = suite.run(&writer);

    assert!(summary.all_passed());
    assert_eq!(summary.stats.assertions, 5);
    let runs = trace.borrow().iter().filter(|s| *s == "hot:run").count();
    assert_eq!(runs, 5);
    assert_eq!(trace.borrow().first().map(String::as_str), Some("hot:setup"));
    let report = raw_report(&writer);
    assert!(report.contains(" TEST: hot\n did 5 runs and used:"));
}

#[test]
fn nested_run_is_a_contract_violation_not_a_test_failure() {
    struct Reentrant;

    impl UnitTest for Reentrant {
        fn run(&mut self, _ctx: &mut Context<'_>) -> TestResult {
            let mut inner = Suite::new("inner");
            inner.run(&BufferWriter::new());
            Ok(())
        }
    }

    let mut suite = Suite::new("outer");
    suite.add_named("reentrant", Reentrant);
    let writer = BufferWriter::new();
    let payload = panic::catch_unwind(AssertUnwindSafe(|| suite.run(&writer)))
        .expect_err("nested run must unwind out of the suite");

    assert!(payload.downcast_ref::<ContractViolation>().is_some());
    assert!(!ulpunit::run_active());
    assert!(!raw_report(&writer).contains("FAILED TESTS"));

    // The guard was released, so a fresh run works.
    let summary = Suite::new("after").run(&writer);
    assert!(summary.all_passed());
}

#[test]
fn writer_collection_receives_the_same_report() {
    let left = BufferWriter::new();
    let right = BufferWriter::new();
    let writers = WriterCollection::new().with(left.clone()).with(right.clone());

    let trace = Trace::default();
    let mut suite = Suite::new("broadcast");
    suite.add(Tracked::new("anon", &trace, Mode::Pass));
    suite.run(&writers);

    assert!(!left.contents().is_empty());
    assert_eq!(left.contents(), right.contents());
    assert!(raw_report(&left).contains("      unit_test_"));
}
