//! ULP distance over scalars, complex pairs, and numeric vectors.

use std::fmt;

use num_complex::Complex;

use crate::bits::FloatBits;
use crate::compare::float_ulps;

/// Values whose separation can be measured in ULPs.
pub trait UlpDistance {
    /// Scalar count, per-component pair, or per-element vector.
    type Distance: fmt::Debug + Clone + PartialEq;

    fn ulp_distance(&self, other: &Self) -> Self::Distance;

    /// Every compared component lies within `max_ulps`.
    fn almost_equal(&self, other: &Self, max_ulps: u64) -> bool;
}

macro_rules! impl_scalar_distance {
    ($($float:ty),*) => {$(
        impl UlpDistance for $float {
            type Distance = <$float as FloatBits>::Bits;

            #[inline]
            fn ulp_distance(&self, other: &Self) -> Self::Distance {
                float_ulps(*self, *other)
            }

            #[inline]
            fn almost_equal(&self, other: &Self, max_ulps: u64) -> bool {
                u64::from(self.ulp_distance(other)) <= max_ulps
            }
        }
    )*};
}

impl_scalar_distance!(f32, f64);

/// Per-component distances; the pair is not folded into one number.
impl<F> UlpDistance for Complex<F>
where
    F: FloatBits,
{
    type Distance = (F::Bits, F::Bits);

    fn ulp_distance(&self, other: &Self) -> Self::Distance {
        (float_ulps(self.re, other.re), float_ulps(self.im, other.im))
    }

    fn almost_equal(&self, other: &Self, max_ulps: u64) -> bool {
        let (re, im) = self.ulp_distance(other);
        Into::<u64>::into(re) <= max_ulps && Into::<u64>::into(im) <= max_ulps
    }
}

/// Element-wise distances over the common prefix.
///
/// Mismatched lengths are truncated to the shorter operand for the distance
/// vector. [`UlpDistance::almost_equal`] treats a length mismatch as unequal.
impl<T> UlpDistance for [T]
where
    T: UlpDistance,
{
    type Distance = Vec<T::Distance>;

    fn ulp_distance(&self, other: &Self) -> Self::Distance {
        self.iter()
            .zip(other.iter())
            .map(|(lhs, rhs)| lhs.ulp_distance(rhs))
            .collect()
    }

    fn almost_equal(&self, other: &Self, max_ulps: u64) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|(lhs, rhs)| lhs.almost_equal(rhs, max_ulps))
    }
}

impl<T, const N: usize> UlpDistance for [T; N]
where
    T: UlpDistance,
{
    type Distance = Vec<T::Distance>;

    fn ulp_distance(&self, other: &Self) -> Self::Distance {
        self.as_slice().ulp_distance(other.as_slice())
    }

    fn almost_equal(&self, other: &Self, max_ulps: u64) -> bool {
        self.as_slice().almost_equal(other.as_slice(), max_ulps)
    }
}

impl<T> UlpDistance for Vec<T>
where
    T: UlpDistance,
{
    type Distance = Vec<T::Distance>;

    fn ulp_distance(&self, other: &Self) -> Self::Distance {
        self.as_slice().ulp_distance(other.as_slice())
    }

    fn almost_equal(&self, other: &Self, max_ulps: u64) -> bool {
        self.as_slice().almost_equal(other.as_slice(), max_ulps)
    }
}

impl<T> UlpDistance for &T
where
    T: UlpDistance + ?Sized,
{
    type Distance = T::Distance;

    fn ulp_distance(&self, other: &Self) -> Self::Distance {
        (**self).ulp_distance(*other)
    }

    fn almost_equal(&self, other: &Self, max_ulps: u64) -> bool {
        (**self).almost_equal(*other, max_ulps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complex_distance_is_per_component() {
        let a = Complex::new(1.0f64, -2.0);
        let b = Complex::new(1.0 + f64::EPSILON, f64::from_bits((-2.0f64).to_bits() + 3));
        assert_eq!(a.ulp_distance(&b), (1, 3));
        assert!(a.almost_equal(&b, 3));
        assert!(!a.almost_equal(&b, 2));
    }

    #[test]
    fn vector_distance_truncates_to_shorter_operand() {
        let long = vec![1.0f64, 2.0, 3.0];
        let short = vec![1.0f64, 2.0];
        assert_eq!(long.ulp_distance(&short), vec![0, 0]);
        assert!(!long.almost_equal(&short, 2));
    }

    #[test]
    fn array_and_slice_agree() {
        let a = [1.0f32, 2.0, 4.0];
        let b = [1.0f32, f32::from_bits(2.0f32.to_bits() + 2), 4.0];
        assert_eq!(a.ulp_distance(&b), vec![0, 2, 0]);
        assert_eq!(a[..].ulp_distance(&b[..]), vec![0, 2, 0]);
        assert!(a.almost_equal(&b, 2));
        assert!(!a.almost_equal(&b, 1));
    }

    #[test]
    fn references_delegate() {
        let a = 1.0f64;
        let b = 1.0f64 + f64::EPSILON;
        assert_eq!(<&f64 as UlpDistance>::ulp_distance(&&a, &&b), 1);
        assert!(<&f64 as UlpDistance>::almost_equal(&&a, &&b, 1));
    }

    #[test]
    fn nested_complex_vectors() {
        let a = vec![Complex::new(0.0f64, 0.0), Complex::new(1.0, 1.0)];
        let b = vec![Complex::new(-0.0f64, 0.0), Complex::new(1.0, 1.0 + f64::EPSILON)];
        assert_eq!(a.ulp_distance(&b), vec![(0, 0), (0, 1)]);
        assert!(a.almost_equal(&b, 1));
    }
}
