//! Unit-test runtime with ULP-aware numeric assertions.
//!
//! - [`Suite`]: owns registered tests, runs them, renders the report.
//! - [`Context`]: handed to every test; executes assertions and is the
//!   failure boundary around each node.
//! - [`Assertion`]: deferred, one-shot assertion record with its diagnostic.
//! - [`Writer`] and [`Style`]: where the report goes and how it is colored.
//! - [`structured_log`]: optional JSONL trace of a run.
//!
//! ```no_run
//! use ulpunit::{Container, Context, Suite, TestResult, UnitTest};
//!
//! struct SquareRoot;
//!
//! impl UnitTest for SquareRoot {
//!     fn run(&mut self, ctx: &mut Context<'_>) -> TestResult {
//!         ctx.assert_float_eq(2.0f64, 2.0f64.sqrt() * 2.0f64.sqrt(), "sqrt(2)^2")?;
//!         Ok(())
//!     }
//! }
//!
//! let mut suite = Suite::new("math");
//! suite.add_named("square_root", SquareRoot);
//! let summary = suite.run_to_stdout();
//! std::process::exit(summary.exit_code());
//! ```

#![forbid(unsafe_code)]

pub mod assertion;
pub mod config;
pub mod context;
pub mod diagnostic;
pub mod error;
pub mod node;
pub mod structured_log;
pub mod style;
pub mod suite;
pub mod writer;

pub use ulpunit_numeric as numeric;

pub use assertion::{Assertion, AssertionFailed, AssertionKind, Info, Location, Opaque, Render};
pub use config::{CountingPolicy, SuiteConfig};
pub use context::{Context, FailureRecord, Stats, run_active};
pub use diagnostic::Diagnostic;
pub use error::{BoxError, ConfigError, ContractViolation, TestError, TestResult};
pub use node::{Collection, Container, FnOutcome, Leaf, Performance, TestNode, UnitTest};
pub use structured_log::{LogEmitter, LogEntry, LogLevel, Outcome};
pub use style::{FancyStyle, OutputFormat, RawStyle, Style};
pub use suite::{RunSummary, Suite};
pub use writer::{BufferWriter, FormattedWriter, SharedBuffer, Writer, WriterCollection};
