//! This module contains the representations of EVM word values used by the
//! library: concretely [`known::KnownWord`]s, and abstractly
//! [`interval::Interval`]s bounded by [`bound::Bound`]s.

pub mod bound;
pub mod interval;
pub mod known;

pub use bound::Bound;
pub use interval::Interval;
pub use known::KnownWord;
