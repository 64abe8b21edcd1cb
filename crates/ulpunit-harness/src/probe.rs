//! ULP distance probe for two literal values.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use ulpunit_numeric::{FloatBits, float_eq, float_ulps};

/// Floating-point width the probe interprets its inputs as.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Single,
    #[default]
    Double,
}

impl Precision {
    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "f32" | "single" | "float" => Some(Self::Single),
            "f64" | "double" => Some(Self::Double),
            _ => None,
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Single => "f32",
            Self::Double => "f64",
        })
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("cannot parse '{value}' as {precision}")]
    BadValue { value: String, precision: Precision },
    #[error("unknown precision '{0}' (expected f32 or f64)")]
    BadPrecision(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceReport {
    pub precision: Precision,
    pub lhs: String,
    pub rhs: String,
    /// Raw IEEE-754 bits, hex.
    pub lhs_bits: String,
    pub rhs_bits: String,
    pub ulps: u64,
    pub max_ulps: u64,
    pub within: bool,
}

impl fmt::Display for DistanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {} ({})", self.precision, self.lhs, self.lhs_bits)?;
        writeln!(f, "{} {} ({})", self.precision, self.rhs, self.rhs_bits)?;
        write!(
            f,
            "distance: {} ulps, {} {} ulps",
            self.ulps,
            if self.within { "within" } else { "outside" },
            self.max_ulps
        )
    }
}

fn parse<F: std::str::FromStr>(raw: &str, precision: Precision) -> Result<F, ProbeError> {
    raw.trim().parse().map_err(|_| ProbeError::BadValue {
        value: raw.to_string(),
        precision,
    })
}

fn report<F>(lhs: F, rhs: F, precision: Precision, max_ulps: u64) -> DistanceReport
where
    F: FloatBits,
{
    let width = F::BIT_COUNT as usize / 4;
    DistanceReport {
        precision,
        lhs: format!("{lhs:?}"),
        rhs: format!("{rhs:?}"),
        lhs_bits: format!("0x{:0width$x}", Into::<u64>::into(lhs.to_raw_bits())),
        rhs_bits: format!("0x{:0width$x}", Into::<u64>::into(rhs.to_raw_bits())),
        ulps: float_ulps(lhs, rhs).into(),
        max_ulps,
        within: float_eq(lhs, rhs, F::bits_from_u64(max_ulps)),
    }
}

/// Measure how many ULPs separate two decimal literals.
pub fn distance(
    precision: Precision,
    lhs: &str,
    rhs: &str,
    max_ulps: u64,
) -> Result<DistanceReport, ProbeError> {
    Ok(match precision {
        Precision::Single => report(
            parse::<f32>(lhs, precision)?,
            parse::<f32>(rhs, precision)?,
            precision,
            max_ulps,
        ),
        Precision::Double => report(
            parse::<f64>(lhs, precision)?,
            parse::<f64>(rhs, precision)?,
            precision,
            max_ulps,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjacent_doubles() {
        let report = distance(Precision::Double, "1.0", "1.0000000000000002", 1).unwrap();
        assert_eq!(report.ulps, 1);
        assert!(report.within);
        assert_eq!(report.lhs_bits, "0x3ff0000000000000");
        assert_eq!(report.rhs_bits, "0x3ff0000000000001");
    }

    #[test]
    fn single_precision_sign_crossing() {
        let report = distance(Precision::Single, "0.0", "-0.0", 0).unwrap();
        assert_eq!(report.ulps, 0);
        assert!(report.within);
        assert_eq!(report.rhs_bits, "0x80000000");
    }

    #[test]
    fn bad_input_is_reported() {
        let err = distance(Precision::Double, "one", "1.0", 2).unwrap_err();
        assert_eq!(err.to_string(), "cannot parse 'one' as f64");
        assert_eq!(Precision::from_str_loose("F32"), Some(Precision::Single));
        assert_eq!(Precision::from_str_loose("f16"), None);
    }

    #[test]
    fn display_summarizes_verdict() {
        let report = distance(Precision::Double, "1.0", "2.0", 4).unwrap();
        assert!(report.to_string().ends_with("outside 4 ulps"));
    }
}
