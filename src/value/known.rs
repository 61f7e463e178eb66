//! This module contains a representation of concrete word values for the EVM
//! that can be known and manipulated statically.

use std::{
    fmt::{Display, Formatter},
    mem,
};

use ethnum::{I256, U256};
use num_bigint::{BigInt, Sign};

use crate::constant::{WORD_SIZE_BITS, WORD_SIZE_BYTES};

/// A 256-bit EVM word whose value is concretely known.
///
/// # Representation
///
/// At the low level at which this library works, all values on the EVM are
/// just bags of bits in a 256-bit word. Operations on a `KnownWord` may treat
/// this word numerically in a signed (two's complement) or unsigned fashion.
/// Every operation implements the exact semantics of the corresponding EVM
/// opcode, including wrapping on overflow and the EVM's convention that
/// division by zero yields zero.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct KnownWord {
    value: U256,
}

impl KnownWord {
    /// Creates a known value representing zero.
    #[must_use]
    pub fn zero() -> Self {
        Self::new(U256::ZERO)
    }

    /// Creates a known value representing one.
    #[must_use]
    pub fn one() -> Self {
        Self::new(U256::ONE)
    }

    /// Constructs a new `KnownWord` from the unsigned `value`.
    #[must_use]
    pub fn new(value: impl Into<U256>) -> Self {
        let value = value.into();
        Self { value }
    }

    /// Constructs a new `KnownWord` from the signed `value`, reinterpreting its
    /// two's complement bit pattern.
    #[must_use]
    pub fn from_signed(value: impl Into<I256>) -> Self {
        let value = value.into().as_u256();
        Self { value }
    }

    /// Constructs a new `KnownWord` from `bytes` where the bytes use
    /// big-endian ordering, as they do in EVM bytecode and memory.
    #[must_use]
    pub fn from_be_bytes(bytes: impl Into<[u8; mem::size_of::<Self>()]>) -> Self {
        let value = U256::from_be_bytes(bytes.into());
        Self { value }
    }

    /// Converts the provided non-negative `value` into a word, returning
    /// [`None`] if it does not fit in 256 bits.
    #[must_use]
    pub fn from_bigint(value: &BigInt) -> Option<Self> {
        let (sign, bytes) = value.to_bytes_be();
        if sign == Sign::Minus || bytes.len() > WORD_SIZE_BYTES {
            return None;
        }

        let mut word = [0u8; WORD_SIZE_BYTES];
        word[WORD_SIZE_BYTES - bytes.len()..].copy_from_slice(&bytes);
        Some(Self::from_be_bytes(word))
    }

    /// Gets the unsigned value of the word.
    #[must_use]
    pub fn value(&self) -> U256 {
        self.value
    }

    /// Gets the value of the word, interpreting the bit pattern as a signed
    /// number.
    #[must_use]
    pub fn value_signed(&self) -> I256 {
        self.value.as_i256()
    }

    /// Gets the bytes of this word in big endian ordering.
    #[must_use]
    pub fn bytes_be(&self) -> [u8; mem::size_of::<Self>()] {
        self.value.to_be_bytes()
    }

    /// Gets the unsigned value of the word as an arbitrary-precision integer.
    #[must_use]
    pub fn to_bigint(&self) -> BigInt {
        BigInt::from_bytes_be(Sign::Plus, &self.bytes_be())
    }

    /// Gets the value of the word as a [`u32`] if it fits.
    #[must_use]
    pub fn as_offset(&self) -> Option<u32> {
        (self.value <= U256::from(u32::MAX)).then(|| self.value.as_u32())
    }

    /// Performs signed division of two known words.
    #[must_use]
    pub fn signed_div(self, rhs: Self) -> Self {
        let left = self.value_signed();
        let right = rhs.value_signed();

        let result = if right == I256::ZERO {
            I256::ZERO
        } else {
            // `MIN / -1` wraps back around to `MIN` on the EVM
            left.wrapping_div(right)
        };

        Self::from_signed(result)
    }

    /// Performs signed modulo of two known words.
    ///
    /// The sign of the result follows the sign of the dividend.
    #[must_use]
    pub fn signed_rem(self, rhs: Self) -> Self {
        let left = self.value_signed();
        let right = rhs.value_signed();

        let result = if right == I256::ZERO {
            I256::ZERO
        } else {
            left.wrapping_rem(right)
        };

        Self::from_signed(result)
    }

    /// Performs exponentiation of two known words modulo `2^256`.
    #[must_use]
    pub fn exp(self, rhs: Self) -> Self {
        let mut base = self.value;
        let mut exponent = rhs.value;
        let mut result = U256::ONE;

        while exponent != U256::ZERO {
            if exponent & U256::ONE == U256::ONE {
                result = result.wrapping_mul(base);
            }
            base = base.wrapping_mul(base);
            exponent >>= 1;
        }

        Self::new(result)
    }

    /// Computes less-than of two known words.
    #[must_use]
    pub fn lt(self, rhs: Self) -> Self {
        Self::from(self.value < rhs.value)
    }

    /// Computes greater-than of two known words.
    #[must_use]
    pub fn gt(self, rhs: Self) -> Self {
        Self::from(self.value > rhs.value)
    }

    /// Computes signed less-than of two known words.
    #[must_use]
    pub fn signed_lt(self, rhs: Self) -> Self {
        Self::from(self.value_signed() < rhs.value_signed())
    }

    /// Computes signed greater-than of two known words.
    #[must_use]
    pub fn signed_gt(self, rhs: Self) -> Self {
        Self::from(self.value_signed() > rhs.value_signed())
    }

    /// Computes equality of two known words.
    #[must_use]
    pub fn eq(self, rhs: Self) -> Self {
        Self::from(self.value == rhs.value)
    }

    /// Checks if `self` is zero.
    #[must_use]
    pub fn is_zero(self) -> Self {
        Self::from(self.value == U256::ZERO)
    }

    /// Gets the `index`th byte of `self`, counting from the most significant
    /// byte.
    ///
    /// Indices outside the word produce zero.
    #[must_use]
    pub fn byte(self, index: Self) -> Self {
        if index.value < U256::from(WORD_SIZE_BYTES as u128) {
            Self::new(self.bytes_be()[index.value.as_usize()])
        } else {
            Self::zero()
        }
    }

    /// Extends the sign of the two's complement number held in the lowest
    /// `size + 1` bytes of `self` to the full word.
    #[must_use]
    pub fn sign_extend(self, size: Self) -> Self {
        if size.value >= U256::from((WORD_SIZE_BYTES - 1) as u128) {
            return self;
        }

        let sign_bit = size.value.as_u32() * 8 + 7;
        let low_mask = (U256::ONE << (sign_bit + 1)) - U256::ONE;
        let is_negative = (self.value >> sign_bit) & U256::ONE == U256::ONE;

        if is_negative {
            Self::new(self.value | !low_mask)
        } else {
            Self::new(self.value & low_mask)
        }
    }

    /// Computes the arithmetic (signed) right shift of `self` by `shift`.
    #[must_use]
    pub fn sar(self, shift: Self) -> Self {
        let value = self.value_signed();
        match Self::shift_amount(shift) {
            Some(amount) => Self::from_signed(value >> amount),
            None if value < I256::ZERO => Self::from_signed(I256::MINUS_ONE),
            None => Self::zero(),
        }
    }

    /// Gets `shift` as a shift amount, returning [`None`] if it shifts every
    /// bit out of the word.
    fn shift_amount(shift: Self) -> Option<u32> {
        (shift.value < U256::from(WORD_SIZE_BITS as u128)).then(|| shift.value.as_u32())
    }
}

impl std::ops::Add<KnownWord> for KnownWord {
    type Output = KnownWord;

    fn add(self, rhs: KnownWord) -> Self::Output {
        KnownWord::new(self.value.wrapping_add(rhs.value))
    }
}

impl std::ops::Mul<KnownWord> for KnownWord {
    type Output = KnownWord;

    fn mul(self, rhs: KnownWord) -> Self::Output {
        KnownWord::new(self.value.wrapping_mul(rhs.value))
    }
}

impl std::ops::Sub<KnownWord> for KnownWord {
    type Output = KnownWord;

    fn sub(self, rhs: KnownWord) -> Self::Output {
        KnownWord::new(self.value.wrapping_sub(rhs.value))
    }
}

impl std::ops::Div<KnownWord> for KnownWord {
    type Output = KnownWord;

    /// Performs unsigned division of two known words.
    fn div(self, rhs: KnownWord) -> Self::Output {
        if rhs.value == U256::ZERO {
            KnownWord::zero()
        } else {
            KnownWord::new(self.value / rhs.value)
        }
    }
}

impl std::ops::Rem<KnownWord> for KnownWord {
    type Output = KnownWord;

    /// Performs unsigned modulo of two known words.
    fn rem(self, rhs: KnownWord) -> Self::Output {
        if rhs.value == U256::ZERO {
            KnownWord::zero()
        } else {
            KnownWord::new(self.value % rhs.value)
        }
    }
}

impl std::ops::BitAnd<KnownWord> for KnownWord {
    type Output = KnownWord;

    fn bitand(self, rhs: KnownWord) -> Self::Output {
        KnownWord::new(self.value & rhs.value)
    }
}

impl std::ops::BitOr<KnownWord> for KnownWord {
    type Output = KnownWord;

    fn bitor(self, rhs: KnownWord) -> Self::Output {
        KnownWord::new(self.value | rhs.value)
    }
}

impl std::ops::BitXor<KnownWord> for KnownWord {
    type Output = KnownWord;

    fn bitxor(self, rhs: KnownWord) -> Self::Output {
        KnownWord::new(self.value ^ rhs.value)
    }
}

impl std::ops::Not for KnownWord {
    type Output = KnownWord;

    fn not(self) -> Self::Output {
        KnownWord::new(!self.value)
    }
}

impl std::ops::Shl<KnownWord> for KnownWord {
    type Output = KnownWord;

    /// Computes the left shift of `self` by `rhs`, where shifts of 256 bits or
    /// more produce zero.
    fn shl(self, rhs: KnownWord) -> Self::Output {
        match KnownWord::shift_amount(rhs) {
            Some(amount) => KnownWord::new(self.value << amount),
            None => KnownWord::zero(),
        }
    }
}

impl std::ops::Shr<KnownWord> for KnownWord {
    type Output = KnownWord;

    /// Computes the logical right shift of `self` by `rhs`, where shifts of 256
    /// bits or more produce zero.
    fn shr(self, rhs: KnownWord) -> Self::Output {
        match KnownWord::shift_amount(rhs) {
            Some(amount) => KnownWord::new(self.value >> amount),
            None => KnownWord::zero(),
        }
    }
}

impl From<usize> for KnownWord {
    fn from(value: usize) -> Self {
        Self::new(value as u128)
    }
}

impl From<KnownWord> for U256 {
    fn from(value: KnownWord) -> Self {
        value.value
    }
}

impl From<bool> for KnownWord {
    fn from(value: bool) -> Self {
        if value {
            Self::one()
        } else {
            Self::zero()
        }
    }
}

/// Pretty-prints the known word as a hexadecimal-encoded number.
impl Display for KnownWord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let str = hex::encode(self.bytes_be());
        let str = str.trim_start_matches('0');
        let str = if str.is_empty() { "0" } else { str };
        write!(f, "0x{str}")
    }
}
