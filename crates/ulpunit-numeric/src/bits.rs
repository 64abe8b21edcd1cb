//! Bit-level view of IEEE-754 values.
//!
//! Every supported float type pairs with an unsigned integer of identical width.
//! The raw bits are sign + magnitude; [`FloatBits::sign_and_magnitude_to_biased`]
//! re-encodes them so that unsigned order follows real-number order across the
//! sign boundary.

use std::fmt;
use std::ops::{Add, Sub};

/// A floating-point type with a same-width unsigned bit representation.
///
/// A float type without an implementation cannot be used with the engine, so
/// a missing integer width is a compile error rather than a runtime surprise.
pub trait FloatBits: Copy + PartialOrd + Add<Output = Self> + fmt::Debug {
    /// Unsigned integer of the same width as `Self`.
    type Bits: Copy + Ord + fmt::Debug + fmt::Display + Into<u64> + Sub<Output = Self::Bits>;

    const BIT_COUNT: u32;
    const FRACTION_BIT_COUNT: u32;
    const EXPONENT_BIT_COUNT: u32;
    const SIGN_BIT_MASK: Self::Bits;
    const FRACTION_BIT_MASK: Self::Bits;
    const EXPONENT_BIT_MASK: Self::Bits;

    /// Exact reinterpretation of the value's bits.
    fn to_raw_bits(self) -> Self::Bits;

    /// Inverse of [`FloatBits::to_raw_bits`].
    fn from_raw_bits(bits: Self::Bits) -> Self;

    /// Map sign-and-magnitude bits onto the biased (monotonic) ordering.
    fn sign_and_magnitude_to_biased(sam: Self::Bits) -> Self::Bits;

    /// Saturating conversion of a caller tolerance into this width.
    fn bits_from_u64(value: u64) -> Self::Bits;

    /// Biased representation of `self`.
    #[inline]
    fn biased_bits(self) -> Self::Bits {
        Self::sign_and_magnitude_to_biased(self.to_raw_bits())
    }

    /// True when the sign bit is set (including `-0.0` and negative NaNs).
    fn is_sign_bit_set(self) -> bool;

    /// Distance between two sign-and-magnitude bit patterns.
    #[inline]
    fn distance_between_sign_and_magnitude(sam1: Self::Bits, sam2: Self::Bits) -> Self::Bits {
        let biased1 = Self::sign_and_magnitude_to_biased(sam1);
        let biased2 = Self::sign_and_magnitude_to_biased(sam2);
        if biased1 >= biased2 {
            biased1 - biased2
        } else {
            biased2 - biased1
        }
    }
}

macro_rules! impl_float_bits {
    ($float:ty, $bits:ty) => {
        impl FloatBits for $float {
            type Bits = $bits;

            const BIT_COUNT: u32 = <$bits>::BITS;
            const FRACTION_BIT_COUNT: u32 = <$float>::MANTISSA_DIGITS - 1;
            const EXPONENT_BIT_COUNT: u32 = Self::BIT_COUNT - 1 - Self::FRACTION_BIT_COUNT;
            const SIGN_BIT_MASK: $bits = 1 << (Self::BIT_COUNT - 1);
            const FRACTION_BIT_MASK: $bits = !0 >> (Self::EXPONENT_BIT_COUNT + 1);
            const EXPONENT_BIT_MASK: $bits = !(Self::SIGN_BIT_MASK | Self::FRACTION_BIT_MASK);

            #[inline]
            fn to_raw_bits(self) -> $bits {
                self.to_bits()
            }

            #[inline]
            fn from_raw_bits(bits: $bits) -> Self {
                <$float>::from_bits(bits)
            }

            #[inline]
            fn sign_and_magnitude_to_biased(sam: $bits) -> $bits {
                if sam & Self::SIGN_BIT_MASK != 0 {
                    // two's complement of the whole pattern; -0.0 wraps onto +0.0
                    (!sam).wrapping_add(1)
                } else {
                    Self::SIGN_BIT_MASK | sam
                }
            }

            #[inline]
            fn bits_from_u64(value: u64) -> $bits {
                <$bits>::try_from(value).unwrap_or(<$bits>::MAX)
            }

            #[inline]
            fn is_sign_bit_set(self) -> bool {
                self.to_bits() & Self::SIGN_BIT_MASK != 0
            }
        }
    };
}

impl_float_bits!(f32, u32);
impl_float_bits!(f64, u64);
