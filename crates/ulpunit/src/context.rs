//! The active run context.
//!
//! A [`Context`] exists only while a suite is running and is handed to every
//! test's `run`. It executes assertions, owns the counters, and is the
//! failure boundary around each node.

use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;
use std::time::Instant;

use serde::Serialize;
use ulpunit_numeric::{FloatBits, UlpDistance};

use crate::assertion::{Assertion, AssertionFailed, Info, Operands, Render};
use crate::config::{CountingPolicy, SuiteConfig};
use crate::error::{ContractViolation, TestError};
use crate::node::TestNode;
use crate::structured_log::{LogEmitter, LogEntry, Outcome};
use crate::style::{RawStyle, Style};
use crate::writer::Writer;

const RULE: &str = "----------------------------------------------------------------------\n";
const FAILURE_RULE: &str =
    "~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~\n";

thread_local! {
    static RUN_ACTIVE: Cell<bool> = const { Cell::new(false) };
    static QUIET_PANICS: Cell<bool> = const { Cell::new(false) };
}

static PANIC_HOOK: Once = Once::new();

/// Whether a suite run is active on this thread.
#[must_use]
pub fn run_active() -> bool {
    RUN_ACTIVE.with(Cell::get)
}

/// Marks this thread as running a suite until dropped.
pub(crate) struct ActiveRun(());

impl ActiveRun {
    /// Panics with a [`ContractViolation`] when a run is already active.
    pub(crate) fn enter() -> Self {
        if RUN_ACTIVE.with(|active| active.replace(true)) {
            panic::panic_any(ContractViolation {
                reason: "a suite run is already active on this thread",
            });
        }
        Self(())
    }
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        RUN_ACTIVE.with(|active| active.set(false));
    }
}

/// Silences the panic hook on this thread while test code runs; the
/// boundary reports those panics itself.
///
/// The process hook is wrapped once and keeps delegating to the previous
/// hook for every other panic.
struct QuietPanics {
    was_quiet: bool,
}

impl QuietPanics {
    fn enter() -> Self {
        PANIC_HOOK.call_once(|| {
            let previous = panic::take_hook();
            panic::set_hook(Box::new(move |info| {
                if reports_panic(info.payload()) {
                    previous(info);
                }
            }));
        });
        Self {
            was_quiet: QUIET_PANICS.with(|quiet| quiet.replace(true)),
        }
    }
}

impl Drop for QuietPanics {
    fn drop(&mut self) {
        QUIET_PANICS.with(|quiet| quiet.set(self.was_quiet));
    }
}

/// Contract violations always reach the previous hook.
fn reports_panic(payload: &(dyn Any + Send)) -> bool {
    !QUIET_PANICS.with(Cell::get) || payload.is::<ContractViolation>()
}

/// Run counters.
///
/// `tests` and `failed` follow the same [`CountingPolicy`]: under `TopLevel`
/// a top-level node counts as one failed test however many of its leaves
/// failed, so `failed <= tests` always holds.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub tests: u64,
    pub assertions: u64,
    pub failed: u64,
}

/// One failed node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub test: String,
    pub outcome: Outcome,
    /// Failure text with style placeholders removed.
    pub message: String,
}

pub struct Context<'run> {
    writer: &'run dyn Writer,
    config: SuiteConfig,
    log: Option<&'run mut LogEmitter>,
    stats: Stats,
    failures: Vec<FailureRecord>,
    first_failure: bool,
    current: Option<String>,
    depth: usize,
    /// First failed assertion of the running leaf, kept even if the test
    /// discarded the `Err`.
    pending_failure: Option<AssertionFailed>,
    subtree_failed: bool,
}

impl<'run> Context<'run> {
    pub(crate) fn new(
        writer: &'run dyn Writer,
        config: SuiteConfig,
        log: Option<&'run mut LogEmitter>,
    ) -> Self {
        Self {
            writer,
            config,
            log,
            stats: Stats::default(),
            failures: Vec::new(),
            first_failure: true,
            current: None,
            depth: 0,
            pending_failure: None,
            subtree_failed: false,
        }
    }

    pub(crate) fn finish(self) -> (Stats, Vec<FailureRecord>, bool) {
        let log_ok = self.log.is_some();
        (self.stats, self.failures, log_ok)
    }

    #[must_use]
    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    #[must_use]
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Name of the innermost node being run.
    #[must_use]
    pub fn current_test(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Write report text (placeholders allowed) through the suite's writer.
    pub fn write(&self, text: &str) {
        self.writer.write(text);
    }

    /// Evaluate a record. The assertion counter moves before the outcome is known.
    ///
    /// A failure fails the running leaf even when the caller drops the `Err`
    /// instead of returning it.
    pub fn execute<O, P>(&mut self, assertion: Assertion<O, P>) -> Result<(), AssertionFailed>
    where
        O: Operands,
        P: FnOnce(&O) -> bool,
    {
        self.stats.assertions += 1;
        let verdict = assertion.evaluate();
        if let Err(failed) = &verdict {
            self.pending_failure.get_or_insert_with(|| failed.clone());
        }
        verdict
    }

    #[track_caller]
    pub fn assert_true(
        &mut self,
        condition: bool,
        message: impl Into<String>,
    ) -> Result<(), AssertionFailed> {
        self.execute(Assertion::truthy(condition, Info::here(message)))
    }

    #[track_caller]
    pub fn assert_eq<E, G>(
        &mut self,
        expected: E,
        got: G,
        message: impl Into<String>,
    ) -> Result<(), AssertionFailed>
    where
        E: PartialEq<G> + Render,
        G: Render,
    {
        self.execute(Assertion::equal(expected, got, Info::here(message)))
    }

    #[track_caller]
    pub fn assert_ne<E, G>(
        &mut self,
        expected: E,
        got: G,
        message: impl Into<String>,
    ) -> Result<(), AssertionFailed>
    where
        E: PartialEq<G> + Render,
        G: Render,
    {
        self.execute(Assertion::not_equal(expected, got, Info::here(message)))
    }

    /// ULP equality at the configured default precision.
    #[track_caller]
    pub fn assert_float_eq<T>(
        &mut self,
        expected: T,
        got: T,
        message: impl Into<String>,
    ) -> Result<(), AssertionFailed>
    where
        T: UlpDistance + Render,
    {
        let max_ulps = self.config.default_max_ulps;
        self.assert_float_eq_prec(expected, got, max_ulps, message)
    }

    #[track_caller]
    pub fn assert_float_eq_prec<T>(
        &mut self,
        expected: T,
        got: T,
        max_ulps: u64,
        message: impl Into<String>,
    ) -> Result<(), AssertionFailed>
    where
        T: UlpDistance + Render,
    {
        self.execute(Assertion::float_equal(
            expected,
            got,
            max_ulps,
            Info::here(message),
        ))
    }

    #[track_caller]
    pub fn assert_float_ne_prec<T>(
        &mut self,
        expected: T,
        got: T,
        max_ulps: u64,
        message: impl Into<String>,
    ) -> Result<(), AssertionFailed>
    where
        T: UlpDistance + Render,
    {
        self.execute(Assertion::float_not_equal(
            expected,
            got,
            max_ulps,
            Info::here(message),
        ))
    }

    /// `zero` vanishes next to `compare`: `compare` and `compare + zero` are
    /// within `max_ulps`.
    #[track_caller]
    pub fn assert_float_eq_zero<F>(
        &mut self,
        compare: F,
        zero: F,
        max_ulps: u64,
        message: impl Into<String>,
    ) -> Result<(), AssertionFailed>
    where
        F: FloatBits + Render,
    {
        self.execute(Assertion::float_equal_zero(
            compare,
            zero,
            max_ulps,
            Info::here(message),
        ))
    }

    /// Run one node inside the failure boundary.
    ///
    /// Setup, run and teardown happen in that order; teardown runs whatever
    /// `run` did. A failure is counted and written, then the caller moves on.
    /// A [`ContractViolation`] panic is never treated as a test failure and
    /// keeps unwinding.
    pub fn run_node(&mut self, node: &mut TestNode) {
        let is_leaf = node.is_leaf();
        let top_level = self.depth == 0;
        match self.config.counting {
            CountingPolicy::TopLevel if top_level => self.stats.tests += 1,
            CountingPolicy::Leaves if is_leaf => self.stats.tests += 1,
            _ => {}
        }

        let name = node.name();
        let outer = self.current.replace(name.clone());
        let outer_pending = self.pending_failure.take();
        let outer_subtree_failed = std::mem::replace(&mut self.subtree_failed, false);
        self.depth += 1;
        let started = Instant::now();

        let (ran, tore_down) = {
            let _quiet = QuietPanics::enter();
            let ran = panic::catch_unwind(AssertUnwindSafe(|| {
                node.setup();
                node.run(self)
            }));
            let tore_down = panic::catch_unwind(AssertUnwindSafe(|| node.teardown()));
            (ran, tore_down)
        };

        self.depth -= 1;
        self.current = outer;
        let discarded = std::mem::replace(&mut self.pending_failure, outer_pending);

        let mut failure = match ran {
            Ok(Ok(())) => discarded.map(|failed| (Outcome::Fail, failed.diagnostic().format())),
            Ok(Err(TestError::Assertion(failed))) => {
                Some((Outcome::Fail, failed.diagnostic().format()))
            }
            Ok(Err(TestError::Error(err))) => Some((
                Outcome::Error,
                format!("   error: [/warning_color]{err}[/default_color]\n"),
            )),
            Err(payload) => Some((Outcome::Panic, panic_notice(payload))),
        };
        if let Err(payload) = tore_down {
            let notice = panic_notice(payload);
            failure.get_or_insert((Outcome::Panic, notice));
        }

        let failed_here = failure.is_some();
        let subtree_failed = failed_here || self.subtree_failed;
        self.subtree_failed = outer_subtree_failed || subtree_failed;
        match self.config.counting {
            CountingPolicy::TopLevel if top_level && subtree_failed => self.stats.failed += 1,
            CountingPolicy::Leaves if failed_here => self.stats.failed += 1,
            _ => {}
        }

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match failure {
            Some((outcome, message)) => {
                self.report_failure(&name, &message);
                if is_leaf {
                    self.log_boundary(&name, outcome, duration_ms, Some(&message));
                }
                self.failures.push(FailureRecord {
                    test: name,
                    outcome,
                    message: RawStyle.apply(&message),
                });
            }
            None if is_leaf => self.log_boundary(&name, Outcome::Pass, duration_ms, None),
            None => {}
        }
    }

    fn report_failure(&mut self, name: &str, message: &str) {
        if self.first_failure {
            self.first_failure = false;
            self.writer.write(&format!("{RULE}   FAILED TESTS:\n"));
        }
        self.writer.write(&format!(
            "{FAILURE_RULE}[/name_color]   *** {name} ***\n[/default_color]{message}"
        ));
    }

    fn log_boundary(
        &mut self,
        name: &str,
        outcome: Outcome,
        duration_ms: u64,
        message: Option<&str>,
    ) {
        let Some(log) = self.log.as_deref_mut() else {
            return;
        };
        let mut entry = LogEntry::boundary(name, outcome)
            .with_assertions(self.stats.assertions)
            .with_duration_ms(duration_ms);
        if let Some(message) = message {
            entry = entry.with_details(serde_json::json!({
                "message": RawStyle.apply(message),
            }));
        }
        if let Err(err) = log.record(entry) {
            self.log = None;
            self.writer.write(&log_warning(&err));
        }
    }
}

/// Report line written when the structured log stops accepting entries.
pub(crate) fn log_warning(err: &std::io::Error) -> String {
    format!("   [/warning_color]warning:[/default_color] structured log disabled: {err}\n")
}

fn panic_notice(payload: Box<dyn Any + Send>) -> String {
    if payload.downcast_ref::<ContractViolation>().is_some() {
        panic::resume_unwind(payload);
    }
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned());
    match detail {
        Some(detail) => format!(
            "   caught an unknown failure (panic)\n   payload: [/warning_color]{detail}[/default_color]\n"
        ),
        None => "   caught an unknown failure (panic)\n".to_string(),
    }
}
