//! Deferred assertion records.
//!
//! An [`Assertion`] bundles a predicate, its captured operands, and diagnostic
//! metadata. It is consumed by [`Assertion::evaluate`], so a record can be
//! evaluated at most once. Every assertion kind funnels into the same record
//! type and the same [`AssertionFailed`] error.

use std::fmt;

use serde::Serialize;
use ulpunit_numeric::{FloatBits, UlpDistance, float_numeq_zero, float_ulps};

use crate::diagnostic::{Diagnostic, OperandView, ToleranceView};

/// Text printed in place of a value that has no human-readable rendering.
pub const NO_RENDERING: &str = "[ no rendering available ]";

/// Comparison tag carried in the diagnostic.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssertionKind {
    #[default]
    Equal,
    NotEqual,
    CompareToZero,
}

impl AssertionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::NotEqual => "not-equal",
            Self::CompareToZero => "compare-to-zero",
        }
    }
}

impl fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source position of an assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
}

impl Location {
    /// Location of the caller (through `#[track_caller]` frames).
    #[track_caller]
    #[must_use]
    pub fn caller() -> Self {
        std::panic::Location::caller().into()
    }
}

impl From<&std::panic::Location<'_>> for Location {
    fn from(loc: &std::panic::Location<'_>) -> Self {
        Self {
            file: loc.file().to_string(),
            line: loc.line(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Diagnostic metadata of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Info {
    pub message: String,
    pub location: Option<Location>,
    pub kind: AssertionKind,
}

impl Info {
    /// Metadata without a source location.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            kind: AssertionKind::Equal,
        }
    }

    /// Metadata located at the caller.
    #[track_caller]
    #[must_use]
    pub fn here(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: Some(Location::caller()),
            kind: AssertionKind::Equal,
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: AssertionKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

/// Human-readable rendering of an operand.
///
/// Every `Debug` type renders through its `Debug` output. Wrap a value in
/// [`Opaque`] to assert on it without a rendering.
pub trait Render {
    fn render(&self) -> Option<String>;
    fn type_label(&self) -> &'static str;
}

impl<T: fmt::Debug + ?Sized> Render for T {
    fn render(&self) -> Option<String> {
        Some(format!("{self:?}"))
    }

    fn type_label(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Operand without a rendering; printed as [`NO_RENDERING`].
pub struct Opaque<T>(pub T);

impl<T> Render for Opaque<T> {
    fn render(&self) -> Option<String> {
        None
    }

    fn type_label(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

impl<T: PartialEq<U>, U> PartialEq<Opaque<U>> for Opaque<T> {
    fn eq(&self, other: &Opaque<U>) -> bool {
        self.0 == other.0
    }
}

fn view(label: &'static str, value: &dyn Render) -> OperandView {
    OperandView {
        label,
        value: value.render().unwrap_or_else(|| NO_RENDERING.to_string()),
        type_name: value.type_label(),
    }
}

/// Captured operands of a record, 1 to 3 of them.
pub trait Operands {
    const ARITY: usize;

    fn views(&self, kind: AssertionKind) -> Vec<OperandView>;

    /// Requested precision and computed distance, for tolerance-bearing records.
    fn tolerance(&self) -> Option<ToleranceView> {
        None
    }
}

/// Single value checked for truthiness.
#[derive(Debug, Clone)]
pub struct Truthy<T>(pub T);

impl<T: Render> Operands for Truthy<T> {
    const ARITY: usize = 1;

    fn views(&self, _kind: AssertionKind) -> Vec<OperandView> {
        vec![view("value", &self.0)]
    }
}

/// Expected / got pair for (in)equality.
#[derive(Debug, Clone)]
pub struct Compared<E, G> {
    pub expected: E,
    pub got: G,
}

impl<E: Render, G: Render> Operands for Compared<E, G> {
    const ARITY: usize = 2;

    fn views(&self, _kind: AssertionKind) -> Vec<OperandView> {
        vec![view("expected", &self.expected), view("got", &self.got)]
    }
}

/// Expected / got pair plus a ULP tolerance.
#[derive(Debug, Clone)]
pub struct Toleranced<T> {
    pub expected: T,
    pub got: T,
    pub max_ulps: u64,
}

impl<T: UlpDistance + Render> Operands for Toleranced<T> {
    const ARITY: usize = 3;

    fn views(&self, _kind: AssertionKind) -> Vec<OperandView> {
        vec![view("expected", &self.expected), view("got", &self.got)]
    }

    fn tolerance(&self) -> Option<ToleranceView> {
        Some(ToleranceView {
            precision: self.max_ulps,
            distance: Some(format!("{:?}", self.expected.ulp_distance(&self.got))),
        })
    }
}

/// Reference value and a residual that should vanish next to it.
#[derive(Debug, Clone)]
pub struct ZeroCompared<F> {
    pub compare: F,
    pub zero: F,
    pub max_ulps: u64,
}

impl<F: FloatBits> ZeroCompared<F> {
    fn holds(&self) -> bool {
        float_numeq_zero(self.zero, self.compare, F::bits_from_u64(self.max_ulps))
    }
}

impl<F: FloatBits + Render> Operands for ZeroCompared<F> {
    const ARITY: usize = 3;

    fn views(&self, _kind: AssertionKind) -> Vec<OperandView> {
        vec![view("compare", &self.compare), view("zero", &self.zero)]
    }

    fn tolerance(&self) -> Option<ToleranceView> {
        let shifted = self.compare + self.zero;
        Some(ToleranceView {
            precision: self.max_ulps,
            distance: Some(float_ulps(self.compare, shifted).to_string()),
        })
    }
}

/// Predicate type used by the built-in constructors.
pub type Check<O> = fn(&O) -> bool;

/// Immutable, one-shot unit of deferred work.
pub struct Assertion<O, P> {
    operands: O,
    predicate: P,
    info: Info,
}

impl<O, P> Assertion<O, P>
where
    O: Operands,
    P: FnOnce(&O) -> bool,
{
    #[must_use]
    pub fn new(operands: O, predicate: P, info: Info) -> Self {
        Self {
            operands,
            predicate,
            info,
        }
    }

    #[must_use]
    pub fn info(&self) -> &Info {
        &self.info
    }

    #[must_use]
    pub fn operands(&self) -> &O {
        &self.operands
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        O::ARITY
    }

    /// Style-agnostic diagnostic for this record.
    #[must_use]
    pub fn diagnostic(&self) -> Diagnostic {
        describe(&self.operands, self.info.clone())
    }

    /// Multi-line report with unresolved style placeholders.
    #[must_use]
    pub fn format(&self) -> String {
        self.diagnostic().format()
    }

    /// Run the predicate once, consuming the record.
    pub fn evaluate(self) -> Result<(), AssertionFailed> {
        let Self {
            operands,
            predicate,
            info,
        } = self;
        if predicate(&operands) {
            return Ok(());
        }
        Err(AssertionFailed {
            diagnostic: describe(&operands, info),
        })
    }
}

fn describe<O: Operands>(operands: &O, info: Info) -> Diagnostic {
    Diagnostic {
        kind: info.kind,
        arity: O::ARITY,
        operands: operands.views(info.kind),
        tolerance: operands.tolerance(),
        message: info.message,
        location: info.location,
    }
}

impl Assertion<Truthy<bool>, Check<Truthy<bool>>> {
    #[must_use]
    pub fn truthy(value: bool, info: Info) -> Self {
        Self::new(Truthy(value), |ops: &Truthy<bool>| ops.0, info)
    }
}

impl<E, G> Assertion<Compared<E, G>, Check<Compared<E, G>>>
where
    E: PartialEq<G> + Render,
    G: Render,
{
    #[must_use]
    pub fn equal(expected: E, got: G, info: Info) -> Self {
        Self::new(
            Compared { expected, got },
            |ops: &Compared<E, G>| ops.expected == ops.got,
            info.with_kind(AssertionKind::Equal),
        )
    }

    #[must_use]
    pub fn not_equal(expected: E, got: G, info: Info) -> Self {
        Self::new(
            Compared { expected, got },
            |ops: &Compared<E, G>| ops.expected != ops.got,
            info.with_kind(AssertionKind::NotEqual),
        )
    }
}

impl<T> Assertion<Toleranced<T>, Check<Toleranced<T>>>
where
    T: UlpDistance + Render,
{
    #[must_use]
    pub fn float_equal(expected: T, got: T, max_ulps: u64, info: Info) -> Self {
        Self::new(
            Toleranced {
                expected,
                got,
                max_ulps,
            },
            |ops: &Toleranced<T>| ops.expected.almost_equal(&ops.got, ops.max_ulps),
            info.with_kind(AssertionKind::Equal),
        )
    }

    #[must_use]
    pub fn float_not_equal(expected: T, got: T, max_ulps: u64, info: Info) -> Self {
        Self::new(
            Toleranced {
                expected,
                got,
                max_ulps,
            },
            |ops: &Toleranced<T>| !ops.expected.almost_equal(&ops.got, ops.max_ulps),
            info.with_kind(AssertionKind::NotEqual),
        )
    }
}

impl<F> Assertion<ZeroCompared<F>, Check<ZeroCompared<F>>>
where
    F: FloatBits + Render,
{
    /// `zero` is negligible next to `compare` (checks `compare` against `compare + zero`).
    #[must_use]
    pub fn float_equal_zero(compare: F, zero: F, max_ulps: u64, info: Info) -> Self {
        Self::new(
            ZeroCompared {
                compare,
                zero,
                max_ulps,
            },
            |ops: &ZeroCompared<F>| ops.holds(),
            info.with_kind(AssertionKind::CompareToZero),
        )
    }
}

/// A failed assertion together with its diagnostic.
#[derive(Debug, Clone)]
pub struct AssertionFailed {
    diagnostic: Diagnostic,
}

impl AssertionFailed {
    #[must_use]
    pub fn diagnostic(&self) -> &Diagnostic {
        &self.diagnostic
    }

    #[must_use]
    pub fn into_diagnostic(self) -> Diagnostic {
        self.diagnostic
    }
}

impl fmt::Display for AssertionFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.diagnostic.plain())
    }
}

impl std::error::Error for AssertionFailed {}
