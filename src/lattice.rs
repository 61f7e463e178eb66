//! The lattice interface shared by every abstract domain in the library.
//!
//! # Laws
//!
//! Implementations must satisfy, for all `a` and `b`:
//!
//! - `a.lub(b) == b.lub(a)` up to `less_or_equal` in both directions.
//! - `a.less_or_equal(&a.lub(&b))` and `b.less_or_equal(&a.lub(&b))`.
//! - `a.lub(&b).less_or_equal(&a.widening(&b))`.
//! - `less_or_equal` is reflexive and transitive.
//!
//! Widening must additionally guarantee that any sequence `x_{n+1} =
//! x_n.widening(y_n)` eventually stabilises.

use std::fmt::Debug;

/// A join-semilattice with a widening operator.
pub trait Lattice
where
    Self: Clone + Debug + PartialEq + Sized,
{
    /// Computes the least upper bound of `self` and `other`.
    #[must_use]
    fn lub(&self, other: &Self) -> Self;

    /// Computes an upper bound of `self` and `other` that extrapolates any
    /// growth from `self` to `other`.
    #[must_use]
    fn widening(&self, other: &Self) -> Self;

    /// Checks whether `self` is at most as large as `other` in the lattice
    /// ordering.
    fn less_or_equal(&self, other: &Self) -> bool;
}

/// A [`Lattice`] with distinguished least and greatest elements.
pub trait BoundedLattice: Lattice {
    /// Gets the least element of the lattice.
    fn bottom() -> Self;

    /// Gets the greatest element of the lattice.
    fn top() -> Self;

    /// Checks whether `self` is the least element.
    fn is_bottom(&self) -> bool;

    /// Checks whether `self` is the greatest element.
    fn is_top(&self) -> bool;
}
