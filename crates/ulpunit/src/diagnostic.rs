//! Style-agnostic failure diagnostics.
//!
//! A [`Diagnostic`] is produced from a failed assertion record. Its
//! [`Diagnostic::format`] output carries `[/key]` style placeholders that a
//! [`crate::style::Style`] resolves at write time.

use std::fmt::Write as _;

use serde::Serialize;

use crate::assertion::{AssertionKind, Location};
use crate::style::{RawStyle, Style};

/// One rendered operand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperandView {
    pub label: &'static str,
    pub value: String,
    pub type_name: &'static str,
}

/// Requested precision and the distance that was measured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToleranceView {
    pub precision: u64,
    /// `None` when the operands have no ULP distance.
    pub distance: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub location: Option<Location>,
    pub kind: AssertionKind,
    pub arity: usize,
    pub operands: Vec<OperandView>,
    pub tolerance: Option<ToleranceView>,
}

impl Diagnostic {
    /// Multi-line report:
    /// - source location, or `N/A`
    /// - the message after `happened:`
    /// - every operand with its type name
    /// - for tolerance-bearing records, precision and distance (`N/A` if absent)
    #[must_use]
    pub fn format(&self) -> String {
        let mut out = String::new();
        let location = self
            .location
            .as_ref()
            .map_or_else(|| "N/A".to_string(), ToString::to_string);
        let kind = if self.arity == 1 {
            "truthy"
        } else {
            self.kind.as_str()
        };

        let _ = writeln!(out, "   at       [/file_color]{location}[/default_color]");
        let _ = writeln!(
            out,
            "   happened: [/bold_on][/warning_color]{}[/default_color][/bold_off]",
            self.message
        );
        let _ = writeln!(out, "   check:    {kind}");
        for operand in &self.operands {
            let _ = writeln!(
                out,
                "   {:<9} [/name_color]{}[/default_color] [/type_color]({})[/default_color]",
                format!("{}:", operand.label),
                operand.value,
                operand.type_name
            );
        }
        if let Some(tolerance) = &self.tolerance {
            let _ = writeln!(out, "   prec:     {} ulps", tolerance.precision);
            let _ = writeln!(
                out,
                "   dist:     {}",
                tolerance.distance.as_deref().unwrap_or("N/A")
            );
        }
        out
    }

    /// [`Self::format`] with every placeholder removed.
    #[must_use]
    pub fn plain(&self) -> String {
        RawStyle.apply(&self.format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Diagnostic {
        Diagnostic {
            message: "values drifted".to_string(),
            location: None,
            kind: AssertionKind::Equal,
            arity: 3,
            operands: vec![
                OperandView {
                    label: "expected",
                    value: "1.0".to_string(),
                    type_name: "f64",
                },
                OperandView {
                    label: "got",
                    value: "1.0000000000000009".to_string(),
                    type_name: "f64",
                },
            ],
            tolerance: Some(ToleranceView {
                precision: 2,
                distance: Some("4".to_string()),
            }),
        }
    }

    #[test]
    fn plain_report_lists_every_part() {
        let text = sample().plain();
        assert!(text.contains("at       N/A"));
        assert!(text.contains("happened: values drifted"));
        assert!(text.contains("check:    equal"));
        assert!(text.contains("expected: 1.0 (f64)"));
        assert!(text.contains("got:      1.0000000000000009 (f64)"));
        assert!(text.contains("prec:     2 ulps"));
        assert!(text.contains("dist:     4"));
        assert!(!text.contains("[/"));
    }

    #[test]
    fn missing_distance_prints_na() {
        let mut diag = sample();
        diag.tolerance = Some(ToleranceView {
            precision: 7,
            distance: None,
        });
        assert!(diag.plain().contains("dist:     N/A"));
    }

    #[test]
    fn located_report_prints_file_and_line() {
        let mut diag = sample();
        diag.location = Some(Location {
            file: "tests/math.rs".to_string(),
            line: 42,
        });
        diag.tolerance = None;
        let text = diag.plain();
        assert!(text.contains("at       tests/math.rs:42"));
        assert!(!text.contains("prec:"));
    }

    #[test]
    fn formatted_report_keeps_placeholders() {
        assert!(sample().format().contains("[/warning_color]"));
    }
}
