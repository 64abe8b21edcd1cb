//! JSONL trace of a suite run.
//!
//! With a [`LogEmitter`] attached, a suite writes one JSON object per line:
//! `suite_start`, then `test_pass` or `test_fail` for every leaf that ran,
//! then `suite_end`. The emitter stamps each line with the suite name and a
//! `<suite>::<run>::<seq>` trace id. [`validate_log_text`] and
//! [`validate_log_file`] re-read such a trace and report every field that
//! does not conform.

use std::fmt;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::writer::SharedBuffer;

pub const EVENT_SUITE_START: &str = "suite_start";
pub const EVENT_TEST_PASS: &str = "test_pass";
pub const EVENT_TEST_FAIL: &str = "test_fail";
pub const EVENT_SUITE_END: &str = "suite_end";

const REQUIRED_FIELDS: [&str; 4] = ["timestamp", "trace_id", "level", "event"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// How a node boundary, or the whole suite, ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    /// An assertion failed.
    Fail,
    /// Test code returned a non-assertion error.
    Error,
    /// Test code panicked.
    Panic,
}

impl Outcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Error => "error",
            Self::Panic => "panic",
        }
    }

    /// Level a boundary event with this outcome is logged at.
    #[must_use]
    pub const fn level(self) -> LogLevel {
        match self {
            Self::Pass => LogLevel::Info,
            _ => LogLevel::Error,
        }
    }
}

/// One line of the trace.
///
/// `trace_id` and `suite` stay empty until a [`LogEmitter`] records the entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub trace_id: String,
    pub level: LogLevel,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    /// Assertions executed so far in the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertions: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl LogEntry {
    #[must_use]
    pub fn new(level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            timestamp: now_utc(),
            trace_id: String::new(),
            level,
            event: event.into(),
            suite: None,
            test: None,
            outcome: None,
            assertions: None,
            duration_ms: None,
            details: None,
        }
    }

    /// Boundary event for one leaf: `test_pass` or `test_fail` by outcome.
    #[must_use]
    pub fn boundary(test: impl Into<String>, outcome: Outcome) -> Self {
        let event = match outcome {
            Outcome::Pass => EVENT_TEST_PASS,
            _ => EVENT_TEST_FAIL,
        };
        Self::new(outcome.level(), event)
            .with_test(test)
            .with_outcome(outcome)
    }

    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = trace_id.into();
        self
    }

    #[must_use]
    pub fn with_suite(mut self, suite: impl Into<String>) -> Self {
        self.suite = Some(suite.into());
        self
    }

    #[must_use]
    pub fn with_test(mut self, test: impl Into<String>) -> Self {
        self.test = Some(test.into());
        self
    }

    #[must_use]
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    #[must_use]
    pub fn with_assertions(mut self, assertions: u64) -> Self {
        self.assertions = Some(assertions);
        self
    }

    #[must_use]
    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// The entry as one JSON line, without the trailing newline.
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Appends recorded entries to a byte sink as JSONL.
pub struct LogEmitter {
    sink: Box<dyn Write + Send>,
    suite: String,
    run_id: String,
    recorded: u64,
}

impl LogEmitter {
    /// Create (or truncate) `path` and log into it.
    pub fn to_file(path: &Path, suite: &str, run_id: &str) -> io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::to_writer(Box::new(BufWriter::new(file)), suite, run_id))
    }

    #[must_use]
    pub fn to_writer(sink: Box<dyn Write + Send>, suite: &str, run_id: &str) -> Self {
        Self {
            sink,
            suite: suite.to_owned(),
            run_id: run_id.to_owned(),
            recorded: 0,
        }
    }

    /// Log into memory; the returned buffer reads the lines back.
    #[must_use]
    pub fn to_buffer(suite: &str, run_id: &str) -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::new();
        let emitter = Self::to_writer(Box::new(buffer.clone()), suite, run_id);
        (emitter, buffer)
    }

    /// Number of entries written so far.
    #[must_use]
    pub fn recorded(&self) -> u64 {
        self.recorded
    }

    /// Stamp `entry` with the next trace id (unless it has one) and this
    /// emitter's suite (unless it names one), then append it.
    pub fn record(&mut self, mut entry: LogEntry) -> io::Result<()> {
        let seq = self.recorded + 1;
        if entry.trace_id.is_empty() {
            entry.trace_id = format!("{}::{}::{seq:03}", self.suite, self.run_id);
        }
        if entry.suite.is_none() {
            entry.suite = Some(self.suite.clone());
        }
        let mut line = entry.to_jsonl().map_err(io::Error::other)?;
        line.push('\n');
        self.sink.write_all(line.as_bytes())?;
        self.recorded = seq;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

/// A field of one trace line that does not conform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogValidationError {
    pub line_number: usize,
    pub field: String,
    pub message: String,
}

impl fmt::Display for LogValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}: {}", self.line_number, self.field, self.message)
    }
}

struct LineCheck<'a> {
    line_number: usize,
    fields: &'a Map<String, Value>,
    errors: Vec<LogValidationError>,
}

impl LineCheck<'_> {
    fn reject(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(LogValidationError {
            line_number: self.line_number,
            field: field.to_owned(),
            message: message.into(),
        });
    }

    /// Decode an optional field as `T`, rejecting it when present but ill-typed.
    fn typed<T: DeserializeOwned>(&mut self, field: &str) -> Option<T> {
        let raw = self.fields.get(field)?;
        match T::deserialize(raw) {
            Ok(value) => Some(value),
            Err(err) => {
                self.reject(field, format!("{raw} is not accepted: {err}"));
                None
            }
        }
    }
}

/// Check one trace line; on success the decoded entry is returned.
pub fn validate_log_line(
    line: &str,
    line_number: usize,
) -> Result<LogEntry, Vec<LogValidationError>> {
    let not_an_object = |message: String| {
        vec![LogValidationError {
            line_number,
            field: "<line>".to_owned(),
            message,
        }]
    };
    let value: Value = serde_json::from_str(line).map_err(|e| not_an_object(format!("invalid JSON: {e}")))?;
    let Value::Object(fields) = &value else {
        return Err(not_an_object("expected a JSON object".to_owned()));
    };

    let mut check = LineCheck {
        line_number,
        fields,
        errors: Vec::new(),
    };
    for field in REQUIRED_FIELDS {
        if !fields.contains_key(field) {
            check.reject(field, "missing");
        }
    }
    check.typed::<LogLevel>("level");
    let outcome = check.typed::<Outcome>("outcome");
    let event = check.typed::<String>("event");

    if let Some(trace_id) = check.typed::<String>("trace_id") {
        // The suite name may itself contain `::`.
        let parts: Vec<&str> = trace_id.rsplitn(3, "::").collect();
        let well_formed = parts.len() == 3
            && parts.iter().all(|p| !p.is_empty())
            && parts[0].bytes().all(|b| b.is_ascii_digit());
        if !well_formed {
            check.reject("trace_id", format!("expected <suite>::<run>::<seq>, got '{trace_id}'"));
        }
    }

    if let Some(event) = event.as_deref()
        && (event == EVENT_TEST_PASS || event == EVENT_TEST_FAIL)
    {
        if check.typed::<String>("test").is_none() && !fields.contains_key("test") {
            check.reject("test", format!("{event} names no test"));
        }
        match outcome {
            None if !fields.contains_key("outcome") => {
                check.reject("outcome", format!("{event} carries no outcome"));
            }
            Some(Outcome::Pass) if event == EVENT_TEST_FAIL => {
                check.reject("outcome", "test_fail with a passing outcome");
            }
            Some(o) if o != Outcome::Pass && event == EVENT_TEST_PASS => {
                check.reject("outcome", format!("test_pass with outcome '{}'", o.as_str()));
            }
            _ => {}
        }
    }

    if !check.errors.is_empty() {
        return Err(check.errors);
    }
    serde_json::from_value(value).map_err(|e| not_an_object(format!("undecodable entry: {e}")))
}

/// Check a whole trace file. Returns the number of non-blank lines and every
/// error found.
pub fn validate_log_file(path: &Path) -> io::Result<(usize, Vec<LogValidationError>)> {
    Ok(validate_log_text(&std::fs::read_to_string(path)?))
}

#[must_use]
pub fn validate_log_text(content: &str) -> (usize, Vec<LogValidationError>) {
    let lines: Vec<(usize, &str)> = content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .collect();
    let errors = lines
        .iter()
        .filter_map(|&(number, line)| validate_log_line(line, number).err())
        .flatten()
        .collect();
    (lines.len(), errors)
}

/// Current UTC time as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
#[must_use]
pub fn now_utc() -> String {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format_utc(since_epoch.as_secs(), since_epoch.subsec_millis())
}

fn format_utc(secs: u64, millis: u32) -> String {
    let (year, month, day) = civil_from_days(secs / 86_400);
    let of_day = secs % 86_400;
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{millis:03}Z",
        of_day / 3600,
        of_day % 3600 / 60,
        of_day % 60,
    )
}

// Days since 1970-01-01 to a proleptic Gregorian date (400-year eras).
fn civil_from_days(days: u64) -> (u64, u64, u64) {
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}
