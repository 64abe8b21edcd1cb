//! CLI entrypoint for the ulpunit harness.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ulpunit::structured_log::validate_log_file;
use ulpunit::{
    CountingPolicy, FormattedWriter, LogEmitter, OutputFormat, SharedBuffer, SuiteConfig,
    WriterCollection,
};
use ulpunit_harness::artifacts::{LOG_FILE, write_run_bundle};
use ulpunit_harness::probe::{self, Precision};
use ulpunit_harness::{selfcheck, verify_bundle};

/// ULP tooling and the ulpunit self-check.
#[derive(Debug, Parser)]
#[command(name = "ulpunit")]
#[command(about = "ULP distance probe, self-check suite and run artifact tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the ULP distance between two decimal values.
    Distance {
        lhs: String,
        rhs: String,
        /// `f32` or `f64`.
        #[arg(long, default_value = "f64")]
        precision: String,
        /// Tolerance used for the within/outside verdict.
        #[arg(long, default_value_t = ulpunit_numeric::DEFAULT_MAX_ULPS)]
        max_ulps: u64,
        /// Emit the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Run the built-in self-check suite.
    Selfcheck {
        /// `fancy` or `raw` (defaults to ULPUNIT_FORMAT).
        #[arg(long)]
        format: Option<String>,
        /// `top-level` or `leaves` (defaults to ULPUNIT_COUNTING).
        #[arg(long)]
        counting: Option<String>,
        /// Default tolerance for float assertions (defaults to ULPUNIT_MAX_ULPS).
        #[arg(long)]
        max_ulps: Option<u64>,
        /// Structured JSONL log path.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Directory receiving report, log, summary and artifact index.
        #[arg(long)]
        artifacts: Option<PathBuf>,
        /// Print the run summary as JSON after the report.
        #[arg(long)]
        summary_json: bool,
    },
    /// Validate a JSONL log written by a suite run.
    ValidateLog {
        #[arg(long)]
        log: PathBuf,
    },
    /// Re-hash an artifact bundle against its index.
    VerifyArtifacts {
        #[arg(long)]
        dir: PathBuf,
    },
}

fn selfcheck_config(
    format: Option<String>,
    counting: Option<String>,
    max_ulps: Option<u64>,
) -> Result<SuiteConfig, String> {
    let mut config = SuiteConfig::from_env();
    if let Some(raw) = format {
        let format = OutputFormat::from_str_loose(&raw)
            .ok_or_else(|| format!("unknown format '{raw}' (expected fancy or raw)"))?;
        config = config.with_format(format);
    }
    if let Some(raw) = counting {
        let counting = CountingPolicy::from_str_loose(&raw)
            .ok_or_else(|| format!("unknown counting policy '{raw}' (expected top-level or leaves)"))?;
        config = config.with_counting(counting);
    }
    if let Some(max_ulps) = max_ulps {
        config = config.with_default_max_ulps(max_ulps);
    }
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Distance {
            lhs,
            rhs,
            precision,
            max_ulps,
            json,
        } => {
            let precision = Precision::from_str_loose(&precision)
                .ok_or(probe::ProbeError::BadPrecision(precision))?;
            let report = probe::distance(precision, &lhs, &rhs, max_ulps)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{report}");
            }
        }
        Command::Selfcheck {
            format,
            counting,
            max_ulps,
            log,
            artifacts,
            summary_json,
        } => {
            let config = selfcheck_config(format, counting, max_ulps)?;
            let run_id = format!("selfcheck-{}", std::process::id());

            let log_path = match (&log, &artifacts) {
                (Some(path), _) => Some(path.clone()),
                (None, Some(dir)) => {
                    std::fs::create_dir_all(dir)?;
                    Some(dir.join(LOG_FILE))
                }
                (None, None) => None,
            };

            let mut suite = selfcheck::build_suite(config);
            if let Some(path) = &log_path {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                suite = suite.with_log(LogEmitter::to_file(path, selfcheck::SUITE_NAME, &run_id)?);
            }

            let report = SharedBuffer::new();
            let writers = WriterCollection::new()
                .with(FormattedWriter::stdout(config.format))
                .with(FormattedWriter::with_format(
                    OutputFormat::Raw,
                    Box::new(report.clone()),
                ));
            let summary = suite.run(&writers);
            // Closes the log file before it is hashed.
            drop(suite.take_log());

            if let Some(dir) = &artifacts {
                let indexed_log = log.is_none().then_some(LOG_FILE);
                let index = write_run_bundle(dir, &run_id, &report.contents(), &summary, indexed_log)?;
                eprintln!(
                    "Wrote {} artifact(s) to {}",
                    index.artifacts.len(),
                    dir.display()
                );
            }
            if summary_json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            if !summary.all_passed() {
                std::process::exit(summary.exit_code());
            }
        }
        Command::ValidateLog { log } => {
            let (count, errors) = validate_log_file(&log)?;
            for err in &errors {
                eprintln!("{err}");
            }
            if !errors.is_empty() {
                return Err(format!(
                    "{}: {} invalid field(s) across {count} line(s)",
                    log.display(),
                    errors.len()
                )
                .into());
            }
            println!("{}: {count} valid line(s)", log.display());
        }
        Command::VerifyArtifacts { dir } => {
            let issues = verify_bundle(&dir)?;
            for issue in &issues {
                eprintln!("{}: {}", issue.path, issue.problem);
            }
            if !issues.is_empty() {
                return Err(format!("artifact verification failed: {} issue(s)", issues.len()).into());
            }
            println!("{}: all artifacts match their index", dir.display());
        }
    }

    Ok(())
}
