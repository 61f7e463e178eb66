//! The interval domain used to approximate the value of a single EVM word.
//!
//! # Word Semantics
//!
//! Intervals are over mathematical integers, but every transformer interprets
//! its operands as unsigned 256-bit words. Endpoints below zero or above
//! `2^256 - 1` (including the infinities produced by widening) are clamped to
//! the word range when an operand is read.
//!
//! Arithmetic results are computed exactly on the clamped endpoints and then
//! reduced modulo `2^256`. When the whole result range lands in a single
//! multiple of the modulus it is shifted back into the word range, and when it
//! straddles the boundary it becomes [`Interval::Top`].

use std::fmt::{Display, Formatter};

use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};
use serde::{Serialize, Serializer};

use crate::{
    constant::WORD_SIZE_BITS,
    lattice::{BoundedLattice, Lattice},
    value::{bound::Bound, known::KnownWord},
};

/// An approximation of the set of values that an EVM word may take.
///
/// # Invariants
///
/// - A `Range` always has `low <= high`. Empty ranges are represented as
///   [`Interval::Bottom`].
/// - A `Range` covering every word in `[0, 2^256 - 1]` is represented as
///   [`Interval::Top`].
///
/// Both invariants are upheld by [`Interval::new`], through which every range
/// is built.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Interval {
    /// The empty set of values, signalling an unreachable or unknown location.
    Bottom,

    /// Every value between `low` and `high` inclusive.
    Range { low: Bound, high: Bound },

    /// Any 256-bit word.
    Top,
}

/// Gets `2^256`.
fn modulus() -> BigInt {
    BigInt::one() << WORD_SIZE_BITS
}

/// Gets the largest value of a word, `2^256 - 1`.
fn word_max() -> BigInt {
    modulus() - 1
}

/// Gets `2^255`, the smallest word that is negative when interpreted as a
/// signed number.
fn signed_boundary() -> BigInt {
    BigInt::one() << (WORD_SIZE_BITS - 1)
}

impl Interval {
    /// Constructs the interval `[low, high]`, normalizing it to
    /// [`Interval::Bottom`] or [`Interval::Top`] where required.
    #[must_use]
    pub fn new(low: Bound, high: Bound) -> Self {
        if low > high {
            return Self::Bottom;
        }

        let covers_low = match &low {
            Bound::NegInf => true,
            Bound::Finite(value) => !value.is_positive(),
            Bound::PosInf => false,
        };
        let covers_high = high.ge_value(&word_max());

        if covers_low && covers_high {
            Self::Top
        } else {
            Self::Range { low, high }
        }
    }

    /// Constructs the interval containing every integer from `low` to `high`.
    pub fn range(low: impl Into<BigInt>, high: impl Into<BigInt>) -> Self {
        Self::new(Bound::finite(low), Bound::finite(high))
    }

    /// Constructs the interval containing only `value`.
    pub fn singleton(value: impl Into<BigInt>) -> Self {
        let value = value.into();
        Self::range(value.clone(), value)
    }

    /// Constructs the interval containing only the provided `word`.
    #[must_use]
    pub fn from_word(word: KnownWord) -> Self {
        Self::singleton(word.to_bigint())
    }

    /// The interval containing only zero.
    #[must_use]
    pub fn zero() -> Self {
        Self::singleton(0)
    }

    /// The interval containing only one.
    #[must_use]
    pub fn one() -> Self {
        Self::singleton(1)
    }

    /// The interval `[0, 1]`, the result of an undetermined comparison.
    #[must_use]
    pub fn boolean() -> Self {
        Self::range(0, 1)
    }

    /// Gets the endpoints of the interval clamped to the word range, or
    /// [`None`] if the interval is empty.
    #[must_use]
    pub fn bounds(&self) -> Option<(BigInt, BigInt)> {
        match self {
            Self::Bottom => None,
            Self::Top => Some((BigInt::zero(), word_max())),
            Self::Range { low, high } => {
                let low = match low {
                    Bound::Finite(value) if value.is_positive() => value.clone(),
                    _ => BigInt::zero(),
                };
                let high = match high {
                    Bound::Finite(value) if value < &word_max() => value.clone(),
                    _ => word_max(),
                };
                Some((low, high))
            }
        }
    }

    /// Gets the single value in the interval, if there is exactly one.
    #[must_use]
    pub fn as_singleton(&self) -> Option<&BigInt> {
        match self {
            Self::Range {
                low: Bound::Finite(low),
                high: Bound::Finite(high),
            } if low == high => Some(low),
            _ => None,
        }
    }

    /// Gets the single word in the interval, if there is exactly one and it is
    /// a valid word.
    #[must_use]
    pub fn as_word(&self) -> Option<KnownWord> {
        self.as_singleton().and_then(KnownWord::from_bigint)
    }

    /// Checks whether the interval contains exactly one value.
    #[must_use]
    pub fn is_singleton(&self) -> bool {
        self.as_singleton().is_some()
    }

    /// Checks whether `value` is a member of the interval.
    #[must_use]
    pub fn contains(&self, value: &BigInt) -> bool {
        match self {
            Self::Bottom => false,
            Self::Top => !value.is_negative() && value <= &word_max(),
            Self::Range { low, high } => low.le_value(value) && high.ge_value(value),
        }
    }

    /// Checks whether the interval is exactly `{0}`.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.as_singleton().is_some_and(Zero::is_zero)
    }

    /// Checks whether zero is one of the words the interval represents.
    #[must_use]
    pub fn may_be_zero(&self) -> bool {
        self.bounds().is_some_and(|(low, _)| low.is_zero())
    }

    /// Computes the pointwise maximum of `self` and `other`.
    #[must_use]
    pub fn maximum(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, x) | (x, Self::Bottom) => x.clone(),
            (Self::Top, _) | (_, Self::Top) => Self::Top,
            (
                Self::Range { low: l1, high: h1 },
                Self::Range { low: l2, high: h2 },
            ) => Self::new(l1.max(l2).clone(), h1.max(h2).clone()),
        }
    }

    /// Reduces the mathematical range `[low, high]` into the word range.
    fn wrap(low: BigInt, high: BigInt) -> Self {
        let modulus = modulus();
        if &high - &low >= modulus {
            return Self::Top;
        }

        let (low, high) = if low.is_negative() {
            (low + &modulus, high + &modulus)
        } else {
            (low, high)
        };
        if low.is_negative() {
            return Self::Top;
        }

        let low_quotient = &low / &modulus;
        let high_quotient = &high / &modulus;
        if low_quotient == high_quotient {
            let shift = low_quotient * &modulus;
            Self::range(low - &shift, high - shift)
        } else {
            Self::Top
        }
    }

    /// Applies `op` to the word-range endpoints of both operands, propagating
    /// [`Interval::Bottom`].
    fn lift(
        &self,
        other: &Self,
        op: impl FnOnce((BigInt, BigInt), (BigInt, BigInt)) -> Self,
    ) -> Self {
        match (self.bounds(), other.bounds()) {
            (Some(a), Some(b)) => op(a, b),
            _ => Self::Bottom,
        }
    }

    /// Applies the concrete `op` when both operands are singletons, and returns
    /// [`Interval::Top`] otherwise.
    fn exact(&self, other: &Self, op: impl FnOnce(KnownWord, KnownWord) -> KnownWord) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::Bottom;
        }
        match (self.as_word(), other.as_word()) {
            (Some(a), Some(b)) => Self::from_word(op(a, b)),
            _ => Self::Top,
        }
    }

    /// Abstract `ADD`.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        self.lift(other, |(al, ah), (bl, bh)| Self::wrap(al + bl, ah + bh))
    }

    /// Abstract `SUB`, computing `self - other`.
    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        self.lift(other, |(al, ah), (bl, bh)| Self::wrap(al - bh, ah - bl))
    }

    /// Abstract `MUL`.
    #[must_use]
    pub fn mul(&self, other: &Self) -> Self {
        self.lift(other, |(al, ah), (bl, bh)| Self::wrap(al * bl, ah * bh))
    }

    /// Abstract `DIV`, computing `self / other`.
    ///
    /// Division by zero is zero on the EVM, so a divisor that may be zero adds
    /// zero to the result.
    #[must_use]
    pub fn div(&self, other: &Self) -> Self {
        self.lift(other, |(al, ah), (bl, bh)| {
            if bh.is_zero() {
                return Self::zero();
            }
            let divisor_low = if bl.is_zero() { BigInt::one() } else { bl.clone() };
            let quotient = Self::range(al / &bh, ah / divisor_low);

            if bl.is_zero() {
                quotient.lub(&Self::zero())
            } else {
                quotient
            }
        })
    }

    /// Abstract `MOD`, computing `self % other`.
    ///
    /// Modulo by zero is zero on the EVM, so a divisor that may be zero adds
    /// zero to the result.
    #[must_use]
    pub fn rem(&self, other: &Self) -> Self {
        self.lift(other, |(al, ah), (bl, bh)| {
            if bh.is_zero() {
                return Self::zero();
            }
            let divisor_low = if bl.is_zero() { BigInt::one() } else { bl.clone() };

            let remainder = if al == ah && divisor_low == bh {
                Self::singleton(&al % &bh)
            } else if ah < divisor_low {
                Self::range(al, ah)
            } else {
                Self::range(0, ah.min(&bh - 1))
            };

            if bl.is_zero() {
                remainder.lub(&Self::zero())
            } else {
                remainder
            }
        })
    }

    /// Abstract `ADDMOD`, computing `(self + other) % modulus` without
    /// intermediate wrapping.
    #[must_use]
    pub fn add_mod(&self, other: &Self, modulus: &Self) -> Self {
        self.modular(other, modulus, |a, b| a + b)
    }

    /// Abstract `MULMOD`, computing `(self * other) % modulus` without
    /// intermediate wrapping.
    #[must_use]
    pub fn mul_mod(&self, other: &Self, modulus: &Self) -> Self {
        self.modular(other, modulus, |a, b| a * b)
    }

    fn modular(
        &self,
        other: &Self,
        modulus: &Self,
        op: impl FnOnce(&BigInt, &BigInt) -> BigInt,
    ) -> Self {
        let Some((nl, nh)) = modulus.bounds() else {
            return Self::Bottom;
        };
        if self.is_bottom() || other.is_bottom() {
            return Self::Bottom;
        }
        if nh.is_zero() {
            return Self::zero();
        }

        match (self.as_singleton(), other.as_singleton()) {
            (Some(a), Some(b)) if nl == nh => Self::singleton(op(a, b) % nh),
            _ => Self::range(0, nh - 1),
        }
    }

    /// Abstract `SDIV`.
    #[must_use]
    pub fn signed_div(&self, other: &Self) -> Self {
        self.exact(other, KnownWord::signed_div)
    }

    /// Abstract `SMOD`.
    #[must_use]
    pub fn signed_rem(&self, other: &Self) -> Self {
        self.exact(other, KnownWord::signed_rem)
    }

    /// Abstract `EXP`, raising `self` to the power of `other`.
    #[must_use]
    pub fn exp(&self, other: &Self) -> Self {
        self.exact(other, KnownWord::exp)
    }

    /// Abstract `SIGNEXTEND`, extending the sign of `other` from byte `self`.
    #[must_use]
    pub fn sign_extend(&self, other: &Self) -> Self {
        self.exact(other, |size, value| value.sign_extend(size))
    }

    /// Abstract `LT`, computing `self < other`.
    #[must_use]
    pub fn lt(&self, other: &Self) -> Self {
        self.lift(other, |(al, ah), (bl, bh)| {
            if ah < bl {
                Self::one()
            } else if al >= bh {
                Self::zero()
            } else {
                Self::boolean()
            }
        })
    }

    /// Abstract `GT`, computing `self > other`.
    #[must_use]
    pub fn gt(&self, other: &Self) -> Self {
        other.lt(self)
    }

    /// Abstract `SLT`, computing `self < other` on two's complement values.
    #[must_use]
    pub fn signed_lt(&self, other: &Self) -> Self {
        if self.same_sign_half(other) {
            self.lt(other)
        } else {
            self.signed_fallback(other, KnownWord::signed_lt)
        }
    }

    /// Abstract `SGT`, computing `self > other` on two's complement values.
    #[must_use]
    pub fn signed_gt(&self, other: &Self) -> Self {
        other.signed_lt(self)
    }

    /// Checks whether both operands lie entirely in the same half of the word
    /// range, where signed and unsigned ordering agree.
    fn same_sign_half(&self, other: &Self) -> bool {
        let boundary = signed_boundary();
        match (self.bounds(), other.bounds()) {
            (Some((al, ah)), Some((bl, bh))) => {
                (ah < boundary && bh < boundary) || (al >= boundary && bl >= boundary)
            }
            _ => false,
        }
    }

    fn signed_fallback(
        &self,
        other: &Self,
        op: impl FnOnce(KnownWord, KnownWord) -> KnownWord,
    ) -> Self {
        match self.exact(other, op) {
            Self::Top => Self::boolean(),
            result => result,
        }
    }

    /// Abstract `EQ`.
    #[must_use]
    pub fn eq(&self, other: &Self) -> Self {
        self.lift(other, |(al, ah), (bl, bh)| {
            if al == ah && bl == bh && al == bl {
                Self::one()
            } else if ah < bl || bh < al {
                Self::zero()
            } else {
                Self::boolean()
            }
        })
    }

    /// Abstract `ISZERO`.
    #[must_use]
    pub fn iszero(&self) -> Self {
        match self.bounds() {
            None => Self::Bottom,
            Some((low, high)) if low.is_zero() && high.is_zero() => Self::one(),
            Some((low, _)) if low.is_positive() => Self::zero(),
            Some(_) => Self::boolean(),
        }
    }

    /// Abstract `AND`.
    #[must_use]
    pub fn and(&self, other: &Self) -> Self {
        self.exact(other, |a, b| a & b)
    }

    /// Abstract `OR`.
    #[must_use]
    pub fn or(&self, other: &Self) -> Self {
        self.exact(other, |a, b| a | b)
    }

    /// Abstract `XOR`.
    #[must_use]
    pub fn xor(&self, other: &Self) -> Self {
        self.exact(other, |a, b| a ^ b)
    }

    /// Abstract `NOT`.
    #[must_use]
    pub fn not(&self) -> Self {
        if self.is_bottom() {
            return Self::Bottom;
        }
        self.as_word().map_or(Self::Top, |word| Self::from_word(!word))
    }

    /// Abstract `BYTE`, extracting byte `self` of `other`.
    #[must_use]
    pub fn byte(&self, other: &Self) -> Self {
        self.exact(other, |index, value| value.byte(index))
    }

    /// Abstract `SHL`, shifting `other` left by `self` bits.
    #[must_use]
    pub fn shl(&self, other: &Self) -> Self {
        self.exact(other, |shift, value| value << shift)
    }

    /// Abstract `SHR`, shifting `other` right by `self` bits.
    #[must_use]
    pub fn shr(&self, other: &Self) -> Self {
        self.exact(other, |shift, value| value >> shift)
    }

    /// Abstract `SAR`, arithmetically shifting `other` right by `self` bits.
    #[must_use]
    pub fn sar(&self, other: &Self) -> Self {
        self.exact(other, |shift, value| value.sar(shift))
    }
}

impl Lattice for Interval {
    fn lub(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, x) | (x, Self::Bottom) => x.clone(),
            (Self::Top, _) | (_, Self::Top) => Self::Top,
            (
                Self::Range { low: l1, high: h1 },
                Self::Range { low: l2, high: h2 },
            ) => Self::new(l1.min(l2).clone(), h1.max(h2).clone()),
        }
    }

    fn widening(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, x) | (x, Self::Bottom) => x.clone(),
            (Self::Top, _) | (_, Self::Top) => Self::Top,
            (
                Self::Range { low: l1, high: h1 },
                Self::Range { low: l2, high: h2 },
            ) => {
                let low = if l2 < l1 { Bound::NegInf } else { l1.clone() };
                let high = if h2 > h1 { Bound::PosInf } else { h1.clone() };
                Self::new(low, high)
            }
        }
    }

    fn less_or_equal(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bottom, _) | (_, Self::Top) => true,
            (_, Self::Bottom) | (Self::Top, _) => false,
            (
                Self::Range { low: l1, high: h1 },
                Self::Range { low: l2, high: h2 },
            ) => l2 <= l1 && h1 <= h2,
        }
    }
}

impl BoundedLattice for Interval {
    fn bottom() -> Self {
        Self::Bottom
    }

    fn top() -> Self {
        Self::Top
    }

    fn is_bottom(&self) -> bool {
        matches!(self, Self::Bottom)
    }

    fn is_top(&self) -> bool {
        matches!(self, Self::Top)
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bottom => write!(f, "BOTTOM"),
            Self::Top => write!(f, "TOP"),
            Self::Range { low, high } => write!(f, "[{low}, {high}]"),
        }
    }
}

/// Intervals are serialized through their display form so that very large
/// endpoints survive formats without arbitrary-precision numbers.
impl Serialize for Interval {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod test {
    use num_bigint::BigInt;
    use num_traits::One;

    use crate::{
        lattice::{BoundedLattice, Lattice},
        value::{bound::Bound, interval::Interval},
    };

    fn max_word() -> BigInt {
        (BigInt::one() << 256) - 1
    }

    #[test]
    fn normalizes_full_and_empty_ranges() {
        assert_eq!(Interval::range(0, max_word()), Interval::Top);
        assert_eq!(Interval::new(Bound::NegInf, Bound::PosInf), Interval::Top);
        assert_eq!(Interval::range(5, 4), Interval::Bottom);
        assert!(matches!(Interval::range(1, max_word()), Interval::Range { .. }));
    }

    #[test]
    fn adds_ranges_exactly_within_the_word() {
        let left = Interval::range(2, 5);
        let right = Interval::singleton(10);
        assert_eq!(left.add(&right), Interval::range(12, 15));
    }

    #[test]
    fn wraps_fully_overflowing_results() {
        let max = Interval::singleton(max_word());
        assert_eq!(max.add(&Interval::one()), Interval::zero());
        assert_eq!(Interval::zero().sub(&Interval::one()), max);
    }

    #[test]
    fn partial_overflow_is_top() {
        let near_max = Interval::range(max_word() - 1, max_word());
        assert_eq!(near_max.add(&Interval::one()), Interval::Top);
        assert_eq!(Interval::range(0, 1).sub(&Interval::one()), Interval::Top);
    }

    #[test]
    fn subtracts_and_multiplies_ranges() {
        assert_eq!(
            Interval::range(10, 20).sub(&Interval::range(1, 2)),
            Interval::range(8, 19)
        );
        assert_eq!(
            Interval::range(2, 3).mul(&Interval::range(4, 5)),
            Interval::range(8, 15)
        );
    }

    #[test]
    fn division_by_zero_yields_zero() {
        let ten = Interval::singleton(10);
        assert_eq!(ten.div(&Interval::zero()), Interval::zero());
        assert_eq!(ten.rem(&Interval::zero()), Interval::zero());
        assert_eq!(ten.div(&Interval::range(0, 2)), Interval::range(0, 10));
        assert_eq!(ten.div(&Interval::range(2, 5)), Interval::range(2, 5));
    }

    #[test]
    fn computes_remainders_soundly() {
        assert_eq!(Interval::singleton(10).rem(&Interval::singleton(3)), Interval::one());
        assert_eq!(Interval::range(1, 4).rem(&Interval::singleton(8)), Interval::range(1, 4));
        assert_eq!(Interval::range(0, 100).rem(&Interval::range(5, 8)), Interval::range(0, 7));
        assert_eq!(
            Interval::singleton(10).add_mod(&Interval::singleton(5), &Interval::singleton(4)),
            Interval::singleton(3)
        );
        assert_eq!(
            Interval::singleton(10).mul_mod(&Interval::Top, &Interval::singleton(4)),
            Interval::range(0, 3)
        );
        assert_eq!(
            Interval::singleton(10).add_mod(&Interval::one(), &Interval::zero()),
            Interval::zero()
        );
    }

    #[test]
    fn modular_arithmetic_does_not_wrap_intermediates() {
        let max = Interval::singleton(max_word());
        let modulus = Interval::singleton(7);
        let expected = (max_word() + max_word()) % BigInt::from(7);
        assert_eq!(max.add_mod(&max, &modulus), Interval::singleton(expected));
    }

    #[test]
    fn compares_ranges_three_ways() {
        let low = Interval::range(0, 5);
        let high = Interval::range(10, 20);
        let overlapping = Interval::range(4, 12);

        assert_eq!(low.lt(&high), Interval::one());
        assert_eq!(high.lt(&low), Interval::zero());
        assert_eq!(low.lt(&overlapping), Interval::boolean());
        assert_eq!(high.gt(&low), Interval::one());
        assert_eq!(low.eq(&high), Interval::zero());
        assert_eq!(Interval::singleton(3).eq(&Interval::singleton(3)), Interval::one());
        assert_eq!(low.eq(&overlapping), Interval::boolean());
    }

    #[test]
    fn compares_signed_values() {
        let minus_one = Interval::singleton(max_word());
        assert_eq!(minus_one.signed_lt(&Interval::zero()), Interval::one());
        assert_eq!(minus_one.lt(&Interval::zero()), Interval::zero());
        assert_eq!(
            Interval::range(0, 5).signed_gt(&Interval::range(6, 9)),
            Interval::zero()
        );
        assert_eq!(Interval::Top.signed_lt(&Interval::zero()), Interval::boolean());
    }

    #[test]
    fn checks_for_zero() {
        assert_eq!(Interval::zero().iszero(), Interval::one());
        assert_eq!(Interval::range(1, 9).iszero(), Interval::zero());
        assert_eq!(Interval::range(0, 9).iszero(), Interval::boolean());
        assert!(Interval::zero().is_zero());
        assert!(Interval::Top.may_be_zero());
        assert!(!Interval::range(1, 2).may_be_zero());
    }

    #[test]
    fn bitwise_operations_need_singletons() {
        let a = Interval::singleton(0b1100);
        let b = Interval::singleton(0b1010);
        assert_eq!(a.and(&b), Interval::singleton(0b1000));
        assert_eq!(a.or(&b), Interval::singleton(0b1110));
        assert_eq!(a.xor(&b), Interval::singleton(0b0110));
        assert_eq!(Interval::singleton(4).shl(&Interval::one()), Interval::singleton(16));
        assert_eq!(Interval::singleton(4).shr(&Interval::singleton(32)), Interval::singleton(2));
        assert_eq!(Interval::zero().not(), Interval::singleton(max_word()));

        let range = Interval::range(0, 0xff);
        assert_eq!(range.and(&Interval::range(0, 0xffff)), Interval::Top);
        assert_eq!(range.and(&b), Interval::Top);
        assert_eq!(range.shr(&a), Interval::Top);
        assert_eq!(range.not(), Interval::Top);
    }

    #[test]
    fn exponentiates_singletons() {
        assert_eq!(Interval::singleton(2).exp(&Interval::singleton(8)), Interval::singleton(256));
        assert_eq!(Interval::range(2, 3).exp(&Interval::singleton(8)), Interval::Top);
    }

    #[test]
    fn bottom_propagates_through_transformers() {
        assert_eq!(Interval::Bottom.add(&Interval::one()), Interval::Bottom);
        assert_eq!(Interval::one().and(&Interval::Bottom), Interval::Bottom);
        assert_eq!(Interval::Bottom.iszero(), Interval::Bottom);
    }

    #[test]
    fn satisfies_join_laws() {
        let samples = [
            Interval::Bottom,
            Interval::Top,
            Interval::zero(),
            Interval::range(3, 9),
            Interval::range(7, 20),
            Interval::new(Bound::finite(4), Bound::PosInf),
        ];

        for a in &samples {
            assert!(Interval::bottom().less_or_equal(a));
            assert!(a.less_or_equal(&Interval::top()));
            assert!(a.less_or_equal(a));

            for b in &samples {
                let joined = a.lub(b);
                assert_eq!(joined, b.lub(a));
                assert!(a.less_or_equal(&joined));
                assert!(b.less_or_equal(&joined));
                assert!(joined.less_or_equal(&a.widening(b)));
            }
        }
    }

    #[test]
    fn widening_extrapolates_growing_bounds() {
        let before = Interval::range(3, 5);
        let grown_up = Interval::range(3, 6);
        let grown_down = Interval::range(2, 5);

        assert_eq!(
            before.widening(&grown_up),
            Interval::new(Bound::finite(3), Bound::PosInf)
        );
        assert_eq!(
            before.widening(&grown_down),
            Interval::new(Bound::NegInf, Bound::finite(5))
        );
        assert_eq!(before.widening(&before), before);

        // Growing in both directions covers every word.
        assert_eq!(before.widening(&Interval::range(0, 10)), Interval::Top);
    }

    #[test]
    fn tracks_membership_and_maximum() {
        let interval = Interval::range(3, 9);
        assert!(interval.contains(&BigInt::from(3)));
        assert!(!interval.contains(&BigInt::from(10)));
        assert!(Interval::Top.contains(&BigInt::from(10)));
        assert!(!Interval::Bottom.contains(&BigInt::from(0)));

        assert_eq!(
            interval.maximum(&Interval::range(5, 6)),
            Interval::range(5, 9)
        );
        assert_eq!(interval.maximum(&Interval::Bottom), interval);
    }

    #[test]
    fn displays_and_serializes_as_text() -> anyhow::Result<()> {
        assert_eq!(Interval::range(1, 2).to_string(), "[1, 2]");
        assert_eq!(serde_json::to_string(&Interval::Top)?, "\"TOP\"");

        Ok(())
    }
}
