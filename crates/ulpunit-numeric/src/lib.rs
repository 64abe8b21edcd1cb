//! ULP (unit of least precision) distance engine.
//!
//! Exact equality is meaningless for most numeric results, so values are compared
//! by how many representable floats separate them:
//! - [`FloatBits`]: same-width bit view of `f32`/`f64` and the biased ordering.
//! - [`float_ulps`] / [`float_eq`]: scalar distance and tolerance check.
//! - [`UlpDistance`]: the same contract over complex pairs and numeric vectors.
//! - Ordered and zero-relative helpers (`float_leq`, `float_numeq_zero`, ...).

#![deny(unsafe_code)]

pub mod bits;
pub mod compare;
pub mod composite;

pub use bits::FloatBits;
pub use compare::{
    float_eq, float_geq, float_gt, float_leq, float_lt, float_neg, float_neq, float_numeq_zero,
    float_numgeq_zero, float_numgt_zero, float_numleq_zero, float_numlt_zero, float_numneq_zero,
    float_pos, float_ulps,
};
pub use composite::UlpDistance;

/// Tolerance used when a caller does not pass one explicitly.
pub const DEFAULT_MAX_ULPS: u64 = 2;
