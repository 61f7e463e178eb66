//! A bounded disjunction of abstract stacks.

use crate::{
    lattice::Lattice,
    state::stack::AbstractStack,
    value::Interval,
};

/// A finite set of [`AbstractStack`]s, any one of which may describe the
/// concrete stack at a program point.
///
/// Keeping separate stacks for separate paths lets a return address pushed on
/// one path stay precise instead of being merged with the return address of
/// another. The number of stacks is limited by `bound`. Once a join would
/// exceed it, every stack is merged into a single one.
///
/// An empty set describes no stacks at all, and hence an unreachable program
/// point.
///
/// The stacks are unordered, so two sets are equal when they hold the same
/// stacks under the same bound, regardless of the order they were joined in.
#[derive(Clone, Debug)]
pub struct AbstractStackSet {
    stacks: Vec<AbstractStack>,
    bound: usize,
}

impl AbstractStackSet {
    /// Creates a new set containing only `stack`, that may hold at most
    /// `bound` stacks before being collapsed.
    #[must_use]
    pub fn new(stack: AbstractStack, bound: usize) -> Self {
        Self {
            stacks: vec![stack],
            bound,
        }
    }

    /// Creates a set from the provided `stacks`, collapsing them if there are
    /// more than `bound`.
    #[must_use]
    pub fn from_stacks(stacks: impl IntoIterator<Item = AbstractStack>, bound: usize) -> Self {
        let mut unique: Vec<AbstractStack> = Vec::new();
        for stack in stacks {
            if !unique.contains(&stack) {
                unique.push(stack);
            }
        }

        Self {
            stacks: unique,
            bound,
        }
        .bounded()
    }

    /// Creates an empty set.
    #[must_use]
    pub fn empty(bound: usize) -> Self {
        Self {
            stacks: Vec::new(),
            bound,
        }
    }

    /// Gets the maximum number of stacks retained before collapsing.
    #[must_use]
    pub fn bound(&self) -> usize {
        self.bound
    }

    /// Gets the number of stacks in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    /// Checks if the set contains no stacks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    /// Iterates over the stacks in the set.
    pub fn iter(&self) -> impl Iterator<Item = &AbstractStack> {
        self.stacks.iter()
    }

    /// Gets the top of each stack in the set, or [`None`] for each empty stack.
    #[must_use]
    pub fn tops(&self) -> Vec<Option<Interval>> {
        self.stacks.iter().map(|s| s.top().ok().cloned()).collect()
    }

    /// Builds a new set from the result of applying `f` to each stack,
    /// dropping the stacks for which it returns [`None`].
    #[must_use]
    pub fn filter_map(&self, f: impl FnMut(&AbstractStack) -> Option<AbstractStack>) -> Self {
        Self::from_stacks(self.stacks.iter().filter_map(f), self.bound)
    }

    /// Merges every stack of the set into a single stack, truncated to the
    /// height of the shortest one.
    #[must_use]
    pub fn collapse(&self) -> Self {
        match self.stacks.iter().cloned().reduce(|a, b| a.lub(&b)) {
            Some(stack) => Self::new(stack, self.bound),
            None => Self::empty(self.bound),
        }
    }

    /// Collapses the set if it holds more stacks than its bound allows.
    fn bounded(self) -> Self {
        if self.stacks.len() > self.bound {
            self.collapse()
        } else {
            self
        }
    }
}

/// Stacks in a set are always distinct, so matching lengths plus inclusion
/// is set equality.
impl PartialEq for AbstractStackSet {
    fn eq(&self, other: &Self) -> bool {
        self.bound == other.bound
            && self.stacks.len() == other.stacks.len()
            && self.stacks.iter().all(|stack| other.stacks.contains(stack))
    }
}

impl Eq for AbstractStackSet {}

impl Lattice for AbstractStackSet {
    /// Unions the two sets, collapsing the result if it grows beyond the
    /// bound.
    fn lub(&self, other: &Self) -> Self {
        let stacks = self.stacks.iter().chain(other.stacks.iter()).cloned();
        Self::from_stacks(stacks, self.bound.min(other.bound))
    }

    /// Widens the collapsed form of both sets.
    fn widening(&self, other: &Self) -> Self {
        let bound = self.bound.min(other.bound);
        match (self.collapse().stacks.pop(), other.collapse().stacks.pop()) {
            (Some(a), Some(b)) => Self::new(a.widening(&b), bound),
            (Some(a), None) => Self::new(a, bound),
            (None, Some(b)) => Self::new(b, bound),
            (None, None) => Self::empty(bound),
        }
    }

    /// Checks that every stack in `self` is covered by some stack in `other`.
    fn less_or_equal(&self, other: &Self) -> bool {
        self.stacks
            .iter()
            .all(|a| other.stacks.iter().any(|b| a.less_or_equal(b)))
    }
}

#[cfg(test)]
mod test {
    use crate::{
        lattice::Lattice,
        state::{stack::AbstractStack, stack_set::AbstractStackSet},
        value::Interval,
    };

    fn stack_of(items: &[u64]) -> anyhow::Result<AbstractStack> {
        Ok(AbstractStack::from_top_down(
            items.iter().map(|i| Interval::singleton(*i)),
        )?)
    }

    #[test]
    fn keeps_disjuncts_within_the_bound() -> anyhow::Result<()> {
        let a = AbstractStackSet::new(stack_of(&[0x10, 1])?, 2);
        let b = AbstractStackSet::new(stack_of(&[0x20, 1])?, 2);

        let joined = a.lub(&b);
        assert_eq!(joined.len(), 2);
        assert_eq!(
            joined.tops(),
            vec![Some(Interval::singleton(0x10)), Some(Interval::singleton(0x20))]
        );
        assert!(a.less_or_equal(&joined));
        assert!(b.less_or_equal(&joined));
        assert!(!joined.less_or_equal(&a));

        Ok(())
    }

    #[test]
    fn deduplicates_identical_stacks() -> anyhow::Result<()> {
        let a = AbstractStackSet::new(stack_of(&[3])?, 1);
        let joined = a.lub(&a);
        assert_eq!(joined, a);

        Ok(())
    }

    #[test]
    fn joins_commute() -> anyhow::Result<()> {
        let a = AbstractStackSet::new(stack_of(&[0x10, 1])?, 4);
        let b = AbstractStackSet::new(stack_of(&[0x20, 1])?, 4);

        assert_eq!(a.lub(&b), b.lub(&a));
        assert_ne!(a.lub(&b), a);

        Ok(())
    }

    #[test]
    fn collapses_beyond_the_bound() -> anyhow::Result<()> {
        let a = AbstractStackSet::new(stack_of(&[1, 7])?, 1);
        let b = AbstractStackSet::new(stack_of(&[5])?, 1);

        let joined = a.lub(&b);
        assert_eq!(joined.len(), 1);
        assert_eq!(joined.tops(), vec![Some(Interval::range(1, 5))]);
        assert_eq!(joined.iter().next().map(AbstractStack::size), Some(1));

        Ok(())
    }

    #[test]
    fn zero_bound_always_collapses() -> anyhow::Result<()> {
        let set = AbstractStackSet::from_stacks([stack_of(&[1])?, stack_of(&[2])?], 0);
        assert_eq!(set.len(), 1);
        assert_eq!(set.tops(), vec![Some(Interval::range(1, 2))]);

        Ok(())
    }

    #[test]
    fn widening_yields_a_single_stack() -> anyhow::Result<()> {
        let a = AbstractStackSet::from_stacks([stack_of(&[1])?, stack_of(&[2])?], 4);
        let b = AbstractStackSet::from_stacks([stack_of(&[1])?, stack_of(&[3])?], 4);

        let widened = a.widening(&b);
        assert_eq!(widened.len(), 1);
        assert!(a.lub(&b).less_or_equal(&widened));

        Ok(())
    }

    #[test]
    fn empty_set_is_below_everything() -> anyhow::Result<()> {
        let empty = AbstractStackSet::empty(4);
        let other = AbstractStackSet::new(stack_of(&[1])?, 4);
        assert!(empty.less_or_equal(&other));
        assert_eq!(empty.lub(&other), other);
        assert!(empty.collapse().is_empty());

        Ok(())
    }
}
