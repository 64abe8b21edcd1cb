//! Suite runtime.
//!
//! A [`Suite`] owns its registered nodes and runs them sequentially:
//! 1. header (suite name, number of tests, their names)
//! 2. each node through [`Context::run_node`], failures streamed as they happen
//! 3. statistics and the success / failure banner
//!
//! One failing test never stops the run.

use std::fmt::Write as _;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::SuiteConfig;
use crate::context::{ActiveRun, Context, FailureRecord, Stats, log_warning};
use crate::node::{Container, TestNode};
use crate::structured_log::{
    EVENT_SUITE_END, EVENT_SUITE_START, LogEmitter, LogEntry, LogLevel, Outcome,
};
use crate::writer::{FormattedWriter, Writer};

const BANNER: &str = "======================================================================\n";
const RULE: &str = "----------------------------------------------------------------------\n";

pub const DEFAULT_SUITE_NAME: &str = "default_suite";

/// Result of one [`Suite::run`].
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub suite: String,
    #[serde(flatten)]
    pub stats: Stats,
    pub elapsed_secs: f64,
    pub failures: Vec<FailureRecord>,
}

impl RunSummary {
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.stats.failed == 0
    }

    /// Process exit code: 0 when every test passed, 1 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.all_passed())
    }
}

pub struct Suite {
    name: String,
    tests: Vec<TestNode>,
    config: SuiteConfig,
    log: Option<LogEmitter>,
}

impl Default for Suite {
    fn default() -> Self {
        Self::new(DEFAULT_SUITE_NAME)
    }
}

impl Suite {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tests: Vec::new(),
            config: SuiteConfig::default(),
            log: None,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: SuiteConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a structured log that receives one entry per suite and test event.
    #[must_use]
    pub fn with_log(mut self, emitter: LogEmitter) -> Self {
        self.log = Some(emitter);
        self
    }

    /// Detach the structured log, if one is still attached.
    pub fn take_log(&mut self) -> Option<LogEmitter> {
        self.log.take()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    #[must_use]
    pub fn test_names(&self) -> Vec<String> {
        self.tests.iter().map(TestNode::name).collect()
    }

    /// Run every registered node, reporting through `writer`.
    ///
    /// # Panics
    ///
    /// With a [`crate::ContractViolation`] payload when another run is already
    /// active on this thread.
    pub fn run(&mut self, writer: &dyn Writer) -> RunSummary {
        let _active = ActiveRun::enter();
        let started = Instant::now();

        writer.write(&self.header());
        let start_entry = LogEntry::new(LogLevel::Info, EVENT_SUITE_START).with_details(
            serde_json::json!({
                "tests": self.tests.len(),
                "format": self.config.format.as_str(),
                "counting": self.config.counting.as_str(),
                "default_max_ulps": self.config.default_max_ulps,
            }),
        );
        emit_or_disable(&mut self.log, writer, start_entry);

        let mut ctx = Context::new(writer, self.config, self.log.as_mut());
        for node in &mut self.tests {
            ctx.run_node(node);
        }
        let (stats, failures, log_ok) = ctx.finish();
        if !log_ok {
            self.log = None;
        }

        let elapsed = started.elapsed();
        writer.write(&statistics(&stats, elapsed));
        writer.write(&footer(&stats));

        let outcome = if stats.failed == 0 {
            Outcome::Pass
        } else {
            Outcome::Fail
        };
        let end_entry = LogEntry::new(outcome.level(), EVENT_SUITE_END)
            .with_outcome(outcome)
            .with_assertions(stats.assertions)
            .with_duration_ms(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
            .with_details(serde_json::json!({
                "tests": stats.tests,
                "failed": stats.failed,
            }));
        emit_or_disable(&mut self.log, writer, end_entry);
        if let Some(log) = self.log.as_mut()
            && let Err(err) = log.flush()
        {
            writer.write(&log_warning(&err));
            self.log = None;
        }

        RunSummary {
            suite: self.name.clone(),
            stats,
            elapsed_secs: elapsed.as_secs_f64(),
            failures,
        }
    }

    /// Run with a [`FormattedWriter`] on stdout in the configured format.
    pub fn run_to_stdout(&mut self) -> RunSummary {
        let writer = FormattedWriter::stdout(self.config.format);
        self.run(&writer)
    }

    fn header(&self) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            "[/bold_on]{BANNER}   NAME: [/name_color]{}[/default_color]\n{RULE}   TESTS TO BE RUN: {}\n",
            self.name,
            self.tests.len()
        );
        for node in &self.tests {
            let _ = writeln!(out, "      {}", node.name());
        }
        out.push_str("[/bold_off]");
        out
    }
}

impl Container for Suite {
    fn push_node(&mut self, node: TestNode) {
        self.tests.push(node);
    }
}

fn emit_or_disable(log: &mut Option<LogEmitter>, writer: &dyn Writer, entry: LogEntry) {
    if let Some(emitter) = log.as_mut()
        && let Err(err) = emitter.record(entry)
    {
        writer.write(&log_warning(&err));
        *log = None;
    }
}

fn per_second(count: u64, secs: f64) -> f64 {
    if secs > 0.0 { count as f64 / secs } else { 0.0 }
}

fn statistics(stats: &Stats, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    format!(
        "[/bold_on]{RULE}   STATISTICS:\n      Finished tests in {secs:.6}s, {:.1} tests/s, {:.1} assertions/s\n      {} tests, {} assertions, {} failed\n[/bold_off]",
        per_second(stats.tests, secs),
        per_second(stats.assertions, secs),
        stats.tests,
        stats.assertions,
        stats.failed,
    )
}

fn footer(stats: &Stats) -> String {
    let verdict = if stats.failed == 0 {
        "[/file_color]   SUCCESS\n"
    } else {
        "[/warning_color]   UNIT TEST FAILED!\n"
    };
    format!("[/bold_on]{RULE}{verdict}[/default_color]{BANNER}[/bold_off]")
}
