//! Scalar ULP comparisons.
//!
//! All tolerances are expressed in ULPs of the operand type. NaN operands never
//! panic, but the result of comparing them is unspecified.

use crate::bits::FloatBits;

/// Number of ULPs separating `lhs` and `rhs`.
#[inline]
#[must_use]
pub fn float_ulps<F: FloatBits>(lhs: F, rhs: F) -> F::Bits {
    F::distance_between_sign_and_magnitude(lhs.to_raw_bits(), rhs.to_raw_bits())
}

/// `lhs` and `rhs` are at most `max_ulps` apart.
#[inline]
#[must_use]
pub fn float_eq<F: FloatBits>(lhs: F, rhs: F, max_ulps: F::Bits) -> bool {
    float_ulps(lhs, rhs) <= max_ulps
}

#[inline]
#[must_use]
pub fn float_neq<F: FloatBits>(lhs: F, rhs: F, max_ulps: F::Bits) -> bool {
    !float_eq(lhs, rhs, max_ulps)
}

#[inline]
#[must_use]
pub fn float_neg<F: FloatBits>(value: F) -> bool {
    value.is_sign_bit_set()
}

#[inline]
#[must_use]
pub fn float_pos<F: FloatBits>(value: F) -> bool {
    !float_neg(value)
}

/// Less than or approximately equal.
#[inline]
#[must_use]
pub fn float_leq<F: FloatBits>(lhs: F, rhs: F, max_ulps: F::Bits) -> bool {
    float_eq(lhs, rhs, max_ulps) || lhs < rhs
}

/// Greater than or approximately equal.
#[inline]
#[must_use]
pub fn float_geq<F: FloatBits>(lhs: F, rhs: F, max_ulps: F::Bits) -> bool {
    float_eq(lhs, rhs, max_ulps) || lhs > rhs
}

/// Strictly less than, outside the tolerance band.
#[inline]
#[must_use]
pub fn float_lt<F: FloatBits>(lhs: F, rhs: F, max_ulps: F::Bits) -> bool {
    !float_geq(lhs, rhs, max_ulps)
}

/// Strictly greater than, outside the tolerance band.
#[inline]
#[must_use]
pub fn float_gt<F: FloatBits>(lhs: F, rhs: F, max_ulps: F::Bits) -> bool {
    !float_leq(lhs, rhs, max_ulps)
}

/// `zero` is numerically negligible relative to `comp`.
///
/// Compares `comp` against `comp + zero` rather than `zero` against `0.0`: a
/// residual is "zero" when adding it to the reference value does not move the
/// reference by more than `max_ulps`.
#[inline]
#[must_use]
pub fn float_numeq_zero<F: FloatBits>(zero: F, comp: F, max_ulps: F::Bits) -> bool {
    float_eq(comp, comp + zero, max_ulps)
}

#[inline]
#[must_use]
pub fn float_numneq_zero<F: FloatBits>(zero: F, comp: F, max_ulps: F::Bits) -> bool {
    !float_numeq_zero(zero, comp, max_ulps)
}

#[inline]
#[must_use]
pub fn float_numgeq_zero<F: FloatBits>(value: F, comp: F, max_ulps: F::Bits) -> bool {
    float_numeq_zero(value, comp, max_ulps) || float_pos(value)
}

#[inline]
#[must_use]
pub fn float_numleq_zero<F: FloatBits>(value: F, comp: F, max_ulps: F::Bits) -> bool {
    float_numeq_zero(value, comp, max_ulps) || float_neg(value)
}

#[inline]
#[must_use]
pub fn float_numgt_zero<F: FloatBits>(value: F, comp: F, max_ulps: F::Bits) -> bool {
    !float_numleq_zero(value, comp, max_ulps)
}

#[inline]
#[must_use]
pub fn float_numlt_zero<F: FloatBits>(value: F, comp: F, max_ulps: F::Bits) -> bool {
    !float_numgeq_zero(value, comp, max_ulps)
}
