//! Suite configuration.
//!
//! Every knob has a default and can be overridden from the environment:
//! - `ULPUNIT_FORMAT`: `fancy` (default, ANSI colors) or `raw` (plain text).
//! - `ULPUNIT_COUNTING`: `top-level` (default) counts one test per registered
//!   node; `leaves` counts every leaf that runs, including collection members.
//! - `ULPUNIT_MAX_ULPS`: tolerance used by `assert_float_eq` when no precision
//!   is given (default 2).

use std::fmt;

use ulpunit_numeric::DEFAULT_MAX_ULPS;

use crate::error::ConfigError;
use crate::style::OutputFormat;

pub const FORMAT_VAR: &str = "ULPUNIT_FORMAT";
pub const COUNTING_VAR: &str = "ULPUNIT_COUNTING";
pub const MAX_ULPS_VAR: &str = "ULPUNIT_MAX_ULPS";

/// What the "tests" statistic counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CountingPolicy {
    /// One per top-level node, however many leaves it contains.
    #[default]
    TopLevel,
    /// One per leaf execution.
    Leaves,
}

impl CountingPolicy {
    /// Parse from string (case-insensitive); unknown values are `None`.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top-level" | "toplevel" | "top_level" | "top" | "flat" => Some(Self::TopLevel),
            "leaves" | "leaf" | "tree" | "nested" => Some(Self::Leaves),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TopLevel => "top-level",
            Self::Leaves => "leaves",
        }
    }
}

impl fmt::Display for CountingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuiteConfig {
    pub format: OutputFormat,
    pub counting: CountingPolicy,
    pub default_max_ulps: u64,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            counting: CountingPolicy::default(),
            default_max_ulps: DEFAULT_MAX_ULPS,
        }
    }
}

impl SuiteConfig {
    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_counting(mut self, counting: CountingPolicy) -> Self {
        self.counting = counting;
        self
    }

    #[must_use]
    pub fn with_default_max_ulps(mut self, max_ulps: u64) -> Self {
        self.default_max_ulps = max_ulps;
        self
    }

    /// Read the environment, falling back to defaults for anything unset or
    /// unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup_loose(|var| std::env::var(var).ok())
    }

    /// Read the environment, rejecting values that do not parse.
    pub fn try_from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Lenient parse over an arbitrary variable source.
    #[must_use]
    pub fn from_lookup_loose(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            format: lookup(FORMAT_VAR)
                .and_then(|raw| OutputFormat::from_str_loose(&raw))
                .unwrap_or(defaults.format),
            counting: lookup(COUNTING_VAR)
                .and_then(|raw| CountingPolicy::from_str_loose(&raw))
                .unwrap_or(defaults.counting),
            default_max_ulps: lookup(MAX_ULPS_VAR)
                .and_then(|raw| raw.trim().parse().ok())
                .unwrap_or(defaults.default_max_ulps),
        }
    }

    /// Strict parse over an arbitrary variable source. Unset variables keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(FORMAT_VAR) {
            config.format =
                OutputFormat::from_str_loose(&raw).ok_or_else(|| ConfigError::UnknownValue {
                    var: FORMAT_VAR,
                    value: raw.clone(),
                    expected: "fancy, raw",
                })?;
        }
        if let Some(raw) = lookup(COUNTING_VAR) {
            config.counting =
                CountingPolicy::from_str_loose(&raw).ok_or_else(|| ConfigError::UnknownValue {
                    var: COUNTING_VAR,
                    value: raw.clone(),
                    expected: "top-level, leaves",
                })?;
        }
        if let Some(raw) = lookup(MAX_ULPS_VAR) {
            config.default_max_ulps =
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidMaxUlps {
                        var: MAX_ULPS_VAR,
                        value: raw.clone(),
                    })?;
        }
        Ok(config)
    }
}
