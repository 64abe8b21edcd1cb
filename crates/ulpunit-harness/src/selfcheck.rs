//! Built-in suite that exercises the ULP engine through the runtime itself.
//!
//! Every check is expected to pass on a conforming IEEE-754 platform; a
//! failing self-check means the engine or the runtime regressed.

use num_complex::Complex;
use ulpunit::{Collection, Container, Context, Suite, SuiteConfig, TestResult, UnitTest};
use ulpunit_numeric::{
    FloatBits, UlpDistance, float_geq, float_gt, float_leq, float_lt, float_neg,
    float_numgt_zero, float_numneq_zero, float_pos, float_ulps,
};

pub const SUITE_NAME: &str = "ulpunit_selfcheck";

/// Walk a ladder of representable doubles and check the biased ordering.
struct BiasedLadder {
    ladder: Vec<f64>,
}

impl BiasedLadder {
    fn new() -> Self {
        Self { ladder: Vec::new() }
    }
}

impl UnitTest for BiasedLadder {
    fn setup(&mut self) {
        let tiny = f64::from_bits(1);
        self.ladder = vec![
            f64::NEG_INFINITY,
            f64::MIN,
            -1.0,
            -tiny,
            0.0,
            tiny,
            f64::MIN_POSITIVE,
            1.0,
            f64::MAX,
            f64::INFINITY,
        ];
    }

    fn teardown(&mut self) {
        self.ladder.clear();
    }

    fn name(&self) -> Option<String> {
        Some("biased_ordering_is_monotonic".to_string())
    }

    fn run(&mut self, ctx: &mut Context<'_>) -> TestResult {
        for pair in self.ladder.windows(2) {
            ctx.assert_true(
                pair[0].biased_bits() < pair[1].biased_bits(),
                format!("{:?} must bias below {:?}", pair[0], pair[1]),
            )?;
        }
        Ok(())
    }
}

/// `base` and the value `n` representable steps above it compare equal at
/// precision `n` and unequal at `n - 1`.
struct ToleranceBoundary<F> {
    base: F,
}

impl<F> UnitTest for ToleranceBoundary<F>
where
    F: FloatBits + UlpDistance + 'static,
{
    fn run(&mut self, ctx: &mut Context<'_>) -> TestResult {
        let base_bits: u64 = self.base.to_raw_bits().into();
        for n in 0..8u64 {
            let shifted = F::from_raw_bits(F::bits_from_u64(base_bits + n));
            ctx.assert_float_eq_prec(self.base, shifted, n, "n apart at precision n")?;
            if n > 0 {
                ctx.assert_float_ne_prec(self.base, shifted, n - 1, "n apart at precision n-1")?;
            }
        }
        Ok(())
    }
}

fn signed_zero_family() -> Collection {
    let mut family = Collection::named("signed_zero_family");
    family
        .add_fn("zero_distance_f64", |ctx: &mut Context<'_>| -> TestResult {
            ctx.assert_eq(0u64, float_ulps(0.0f64, -0.0f64), "+0 and -0 are 0 ulps apart")?;
            Ok(())
        })
        .add_fn("zero_distance_f32", |ctx: &mut Context<'_>| -> TestResult {
            ctx.assert_float_eq_prec(0.0f32, -0.0f32, 0, "+0 equals -0 at zero tolerance")?;
            Ok(())
        })
        .add_fn("sign_crossing", |ctx: &mut Context<'_>| -> TestResult {
            let tiny = f64::from_bits(1);
            ctx.assert_eq(2u64, float_ulps(tiny, -tiny), "smallest subnormals straddle zero")?;
            ctx.assert_true(float_neg(-tiny) && float_pos(tiny), "sign helpers")?;
            Ok(())
        });
    family
}

/// Register every self-check on a fresh suite.
#[must_use]
pub fn build_suite(config: SuiteConfig) -> Suite {
    let mut suite = Suite::new(SUITE_NAME).with_config(config);
    suite
        .add(BiasedLadder::new())
        .add_named("tolerance_boundary_f32", ToleranceBoundary { base: 1.5f32 })
        .add_named("tolerance_boundary_f64", ToleranceBoundary { base: 1.0e10f64 })
        .add_collection(signed_zero_family())
        .add_fn("adjacent_doubles", |ctx: &mut Context<'_>| -> TestResult {
            let next = 1.0f64 + f64::EPSILON;
            ctx.assert_float_eq_prec(1.0f64, next, 1, "one ulp at precision 1")?;
            ctx.assert_float_ne_prec(1.0f64, next, 0, "one ulp at precision 0")?;
            Ok(())
        })
        .add_fn("infinity_is_an_extreme", |_ctx: &mut Context<'_>| {
            float_ulps(f64::MAX, f64::INFINITY) == 1
        })
        .add_fn("complex_components", |ctx: &mut Context<'_>| -> TestResult {
            let a = Complex::new(1.0f64, -3.0);
            let b = Complex::new(1.0f64 + f64::EPSILON, -3.0);
            ctx.assert_float_eq(a, b, "complex within default precision")?;
            Ok(())
        })
        .add_fn("vector_prefix", |ctx: &mut Context<'_>| -> TestResult {
            let long = vec![1.0f64, 2.0, 3.0];
            let short = vec![1.0f64, 2.0];
            ctx.assert_eq(vec![0u64, 0], long.ulp_distance(&short), "distance over common prefix")?;
            ctx.assert_float_ne_prec(long, short, 1000, "length mismatch is unequal")?;
            Ok(())
        })
        .add_fn("ordered_comparisons", |ctx: &mut Context<'_>| -> TestResult {
            let next = 1.0f64 + f64::EPSILON;
            ctx.assert_true(float_leq(next, 1.0, 1), "within tolerance counts as <=")?;
            ctx.assert_true(float_geq(1.0, next, 1), "within tolerance counts as >=")?;
            ctx.assert_true(!float_lt(1.0, next, 1), "within tolerance is not <")?;
            ctx.assert_true(float_gt(2.0f64, 1.0, 4), "clearly greater")?;
            Ok(())
        })
        .add_fn("zero_relative", |ctx: &mut Context<'_>| -> TestResult {
            ctx.assert_float_eq_zero(1.0f64, 1.0e-17, 2, "residual below half an ulp")?;
            ctx.assert_true(float_numneq_zero(0.5f64, 1.0, 2), "0.5 is not negligible next to 1")?;
            ctx.assert_true(float_numgt_zero(0.5f64, 1.0, 2), "0.5 is significant and positive")?;
            Ok(())
        })
        .add_performance("ulp_distance_throughput", 1000, ThroughputLoop);
    suite
}

struct ThroughputLoop;

impl UnitTest for ThroughputLoop {
    fn run(&mut self, ctx: &mut Context<'_>) -> TestResult {
        let a = std::hint::black_box(1.0f64);
        let b = std::hint::black_box(1.0f64 + 2.0 * f64::EPSILON);
        ctx.assert_float_eq(a, b, "two ulps at default precision")?;
        Ok(())
    }
}
