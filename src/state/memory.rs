//! The abstract memory of an EVM execution frame.

use std::{collections::BTreeMap, rc::Rc};

use num_bigint::BigInt;
use num_traits::Zero;

use crate::{
    constant::WORD_SIZE_BYTES,
    lattice::{BoundedLattice, Lattice},
    value::Interval,
};

/// A map from memory offsets to the abstract word stored at each one.
///
/// Offsets that were never written read as [`Interval::Bottom`]. Writes
/// through an imprecise offset cannot be recorded, so instead the words they
/// may have touched are set to [`Interval::Top`].
///
/// All updates are functional. The underlying map is shared between copies
/// and duplicated only when a copy is modified.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Memory {
    words: Rc<BTreeMap<BigInt, Interval>>,
}

impl Memory {
    /// Creates a memory with no tracked words.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the word stored at `offset`, or [`Interval::Bottom`] if nothing
    /// was stored there.
    #[must_use]
    pub fn get(&self, offset: &BigInt) -> Interval {
        self.words.get(offset).cloned().unwrap_or(Interval::Bottom)
    }

    /// Stores `value` at the singleton `offset`.
    ///
    /// Returns [`None`] if `offset` is not a singleton, as the write cannot be
    /// attributed to a single word.
    #[must_use]
    pub fn put(&self, offset: &Interval, value: Interval) -> Option<Self> {
        let offset = offset.as_singleton()?;
        let mut words = self.words.clone();
        Rc::make_mut(&mut words).insert(offset.clone(), value);

        Some(Self { words })
    }

    /// Reads the 32-byte word at `offset` as `MLOAD` does.
    ///
    /// Only a singleton offset that was previously written with a full word
    /// yields anything more precise than [`Interval::Top`].
    #[must_use]
    pub fn load(&self, offset: &Interval) -> Interval {
        if offset.is_bottom() {
            return Interval::Bottom;
        }
        match offset.as_singleton().map(|o| self.get(o)) {
            Some(value) if !value.is_bottom() => value,
            _ => Interval::Top,
        }
    }

    /// Writes the 32-byte `value` at `offset` as `MSTORE` does.
    ///
    /// Any other tracked word overlapping the written bytes becomes unknown.
    #[must_use]
    pub fn store(&self, offset: &Interval, value: Interval) -> Self {
        let width = BigInt::from(WORD_SIZE_BYTES);
        let Some(at) = offset.as_singleton() else {
            return self.clobber_region(offset, &width);
        };

        let cleared = self.invalidate_range(at, &(at + &width - 1));
        cleared.put(offset, value).unwrap_or(cleared)
    }

    /// Writes a single byte at `offset` as `MSTORE8` does, making every
    /// tracked word containing that byte unknown.
    #[must_use]
    pub fn store_byte(&self, offset: &Interval) -> Self {
        self.clobber_region(offset, &BigInt::from(1))
    }

    /// Marks the `size` bytes starting at `offset` as overwritten with unknown
    /// data, as the copying opcodes do.
    #[must_use]
    pub fn clobber(&self, offset: &Interval, size: &Interval) -> Self {
        if offset.is_bottom() || size.is_bottom() {
            return self.clone();
        }
        match size.as_singleton() {
            Some(size) if size.is_zero() => self.clone(),
            Some(size) => self.clobber_region(offset, size),
            None => self.invalidate_all(),
        }
    }

    /// Marks every word that may overlap the `width` bytes at `offset` as
    /// unknown.
    fn clobber_region(&self, offset: &Interval, width: &BigInt) -> Self {
        match offset.bounds() {
            Some((low, high)) => self.invalidate_range(&low, &(high + width - 1)),
            None => self.clone(),
        }
    }

    /// Sets every tracked word overlapping the bytes `low..=high` to
    /// [`Interval::Top`].
    #[must_use]
    pub fn invalidate_range(&self, low: &BigInt, high: &BigInt) -> Self {
        if low > high {
            return self.clone();
        }
        let first = low - BigInt::from(WORD_SIZE_BYTES - 1);
        let overlapping: Vec<BigInt> = self
            .words
            .range(first..=high.clone())
            .filter(|(_, v)| !v.is_top())
            .map(|(k, _)| k.clone())
            .collect();
        if overlapping.is_empty() {
            return self.clone();
        }

        let mut words = self.words.clone();
        let map = Rc::make_mut(&mut words);
        for key in overlapping {
            map.insert(key, Interval::Top);
        }

        Self { words }
    }

    /// Sets every tracked word to [`Interval::Top`].
    #[must_use]
    pub fn invalidate_all(&self) -> Self {
        let words = self.words.keys().map(|k| (k.clone(), Interval::Top)).collect();
        Self {
            words: Rc::new(words),
        }
    }

    /// Gets the number of tracked words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Checks whether no words are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Iterates over the tracked words in offset order.
    pub fn iter(&self) -> impl Iterator<Item = (&BigInt, &Interval)> {
        self.words.iter()
    }

    /// Combines the two memories key by key, treating absent keys as
    /// [`Interval::Bottom`].
    fn combine(&self, other: &Self, op: impl Fn(&Interval, &Interval) -> Interval) -> Self {
        let mut words = BTreeMap::new();
        for key in self.words.keys().chain(other.words.keys()) {
            if !words.contains_key(key) {
                words.insert(key.clone(), op(&self.get(key), &other.get(key)));
            }
        }

        Self {
            words: Rc::new(words),
        }
    }
}

impl Lattice for Memory {
    fn lub(&self, other: &Self) -> Self {
        if Rc::ptr_eq(&self.words, &other.words) {
            return self.clone();
        }
        self.combine(other, Interval::lub)
    }

    fn widening(&self, other: &Self) -> Self {
        self.combine(other, Interval::widening)
    }

    fn less_or_equal(&self, other: &Self) -> bool {
        self.words
            .iter()
            .all(|(key, value)| value.less_or_equal(&other.get(key)))
    }
}
