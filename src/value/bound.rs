//! Extended integers used as the endpoints of an [`super::interval::Interval`].

use std::fmt::{Display, Formatter};

use num_bigint::BigInt;

/// An integer extended with the two infinities.
///
/// Infinities only ever appear as interval endpoints, usually as the result of
/// widening, and never as the value of a word on the stack.
///
/// The derived ordering places [`Bound::NegInf`] below every finite value and
/// [`Bound::PosInf`] above every finite value.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Bound {
    NegInf,
    Finite(BigInt),
    PosInf,
}

impl Bound {
    /// Creates a finite bound with the provided `value`.
    pub fn finite(value: impl Into<BigInt>) -> Self {
        Self::Finite(value.into())
    }

    /// Checks whether `value` lies at or above this bound.
    #[must_use]
    pub fn le_value(&self, value: &BigInt) -> bool {
        match self {
            Self::NegInf => true,
            Self::Finite(bound) => bound <= value,
            Self::PosInf => false,
        }
    }

    /// Checks whether `value` lies at or below this bound.
    #[must_use]
    pub fn ge_value(&self, value: &BigInt) -> bool {
        match self {
            Self::NegInf => false,
            Self::Finite(bound) => bound >= value,
            Self::PosInf => true,
        }
    }
}

impl From<BigInt> for Bound {
    fn from(value: BigInt) -> Self {
        Self::Finite(value)
    }
}

impl Display for Bound {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NegInf => write!(f, "-Inf"),
            Self::Finite(value) => write!(f, "{value}"),
            Self::PosInf => write!(f, "+Inf"),
        }
    }
}

#[cfg(test)]
mod test {
    use num_bigint::BigInt;

    use crate::value::bound::Bound;

    #[test]
    fn orders_infinities_around_finite_values() {
        let low = Bound::finite(-5);
        let high = Bound::finite(1_000);

        assert!(Bound::NegInf < low);
        assert!(low < high);
        assert!(high < Bound::PosInf);
        assert_eq!(
            std::cmp::max(Bound::finite(3), Bound::finite(7)),
            Bound::finite(7)
        );
    }

    #[test]
    fn compares_against_values() {
        let value = BigInt::from(10);
        assert!(Bound::NegInf.le_value(&value));
        assert!(Bound::finite(10).le_value(&value));
        assert!(!Bound::PosInf.le_value(&value));
        assert!(Bound::PosInf.ge_value(&value));
        assert!(!Bound::finite(9).ge_value(&value));
    }
}
