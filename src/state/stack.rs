//! This module contains the implementation of the abstract operand stack.

use std::{
    fmt::{Display, Formatter},
    rc::Rc,
};

use itertools::Itertools;

use crate::{
    constant::MAXIMUM_STACK_DEPTH,
    error::analysis::{Error, Result},
    lattice::Lattice,
    value::Interval,
};

/// An abstraction of the EVM operand stack, holding an [`Interval`] for each
/// stack slot.
///
/// # Indexing
///
/// Indexing into this stack is zero-based, where frame 0 is the top stack
/// frame. The `DUP` and `SWAP` style operations instead use the one-based
/// numbering of the opcodes they implement.
///
/// # Depth
///
/// The stack shares the [`MAXIMUM_STACK_DEPTH`] of the EVM. An abstract stack
/// of height `h` describes every concrete stack whose top `h` items lie in the
/// corresponding intervals. Anything deeper is unknown, which is why reaching
/// below the bottom of the stack is reported as [`Error::StackUnderflow`]
/// rather than treated as impossible.
///
/// # Sharing
///
/// The data is shared between clones and copied on the first write, so cloning
/// a stack to derive a successor is cheap and never aliases mutable state.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AbstractStack {
    /// The stack items, with the top of the stack at the end.
    data: Rc<Vec<Interval>>,
}

impl AbstractStack {
    /// Creates a new stack without any items on it.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a stack containing `items`, listed from the top of the stack
    /// downward.
    ///
    /// # Errors
    ///
    /// If more than [`MAXIMUM_STACK_DEPTH`] items are provided.
    pub fn from_top_down(items: impl IntoIterator<Item = Interval>) -> Result<Self> {
        let mut data: Vec<Interval> = items.into_iter().collect();
        if data.len() > MAXIMUM_STACK_DEPTH {
            return Err(Error::StackDepthExceeded {
                requested: data.len(),
            });
        }
        data.reverse();

        Ok(Self {
            data: Rc::new(data),
        })
    }

    /// Pushes the provided value onto the top of the stack.
    ///
    /// # Errors
    ///
    /// If the stack cannot grow to accommodate the requested `value`.
    pub fn push(&mut self, value: Interval) -> Result<()> {
        if self.data.len() + 1 > MAXIMUM_STACK_DEPTH {
            return Err(Error::StackDepthExceeded {
                requested: self.data.len() + 1,
            });
        }
        Rc::make_mut(&mut self.data).push(value);

        Ok(())
    }

    /// Pops the top value from the stack.
    ///
    /// # Errors
    ///
    /// If the stack has no item to pop.
    pub fn pop(&mut self) -> Result<Interval> {
        self.check_depth(1)?;
        Rc::make_mut(&mut self.data).pop().ok_or(Error::StackUnderflow {
            requested: 1,
            available: 0,
        })
    }

    /// Pops `count` values from the top of the stack, discarding them.
    ///
    /// # Errors
    ///
    /// If the stack holds fewer than `count` items, in which case the stack is
    /// left unchanged.
    pub fn discard(&mut self, count: usize) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        self.check_depth(count)?;
        let new_len = self.data.len() - count;
        Rc::make_mut(&mut self.data).truncate(new_len);

        Ok(())
    }

    /// Duplicates the `item`th item from the top (1-indexed) onto the top of
    /// the stack.
    ///
    /// # Errors
    ///
    /// If `item` doesn't exist or the stack is full.
    pub fn dup(&mut self, item: usize) -> Result<()> {
        let value = self.peek_item(item)?.clone();
        self.push(value)
    }

    /// Exchanges the top of the stack with the item `item` places below it,
    /// as `SWAPN` does.
    ///
    /// # Errors
    ///
    /// If the stack holds fewer than `item + 1` items.
    pub fn swap(&mut self, item: usize) -> Result<()> {
        self.check_depth(item + 1)?;
        let top = self.data.len() - 1;
        Rc::make_mut(&mut self.data).swap(top, top - item);

        Ok(())
    }

    /// Gets the value on top of the stack.
    ///
    /// # Errors
    ///
    /// If the stack is empty.
    pub fn top(&self) -> Result<&Interval> {
        self.peek(0)
    }

    /// Reads from the stack frame at the provided zero-based `depth`.
    ///
    /// # Errors
    ///
    /// If `depth` does not exist in the stack.
    pub fn peek(&self, depth: usize) -> Result<&Interval> {
        self.peek_item(depth + 1)
    }

    /// Gets the current size of the stack.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Checks if the stack is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Iterates over the stack items from the top of the stack downward.
    pub fn iter(&self) -> impl Iterator<Item = &Interval> {
        self.data.iter().rev()
    }

    /// Combines two stacks item by item from the top, keeping only as many
    /// items as the shorter stack holds.
    fn combine(&self, other: &Self, op: impl Fn(&Interval, &Interval) -> Interval) -> Self {
        let mut data: Vec<Interval> =
            self.iter().zip(other.iter()).map(|(a, b)| op(a, b)).collect();
        data.reverse();

        Self {
            data: Rc::new(data),
        }
    }

    /// Gets the `item`th value from the top (1-indexed).
    fn peek_item(&self, item: usize) -> Result<&Interval> {
        self.check_depth(item)?;
        Ok(&self.data[self.data.len() - item])
    }

    /// Checks that the stack holds at least `count` items.
    fn check_depth(&self, count: usize) -> Result<()> {
        if count == 0 || count > self.data.len() {
            return Err(self.underflow(count));
        }

        Ok(())
    }

    fn underflow(&self, requested: usize) -> Error {
        Error::StackUnderflow {
            requested,
            available: self.data.len(),
        }
    }
}

impl Lattice for AbstractStack {
    fn lub(&self, other: &Self) -> Self {
        self.combine(other, Interval::lub)
    }

    fn widening(&self, other: &Self) -> Self {
        self.combine(other, Interval::widening)
    }

    /// A stack is below another when it is at least as tall and each of the
    /// other's items over-approximates the corresponding item of this stack.
    fn less_or_equal(&self, other: &Self) -> bool {
        self.size() >= other.size()
            && self.iter().zip(other.iter()).all(|(a, b)| a.less_or_equal(b))
    }
}

/// Stacks are displayed from the top downward.
impl Display for AbstractStack {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.iter().join(", "))
    }
}

#[cfg(test)]
mod test {
    use crate::{
        constant::MAXIMUM_STACK_DEPTH,
        error::analysis::Error,
        lattice::Lattice,
        state::stack::AbstractStack,
        value::Interval,
    };

    /// Constructs a new stack holding `0..item_count`, with the largest value
    /// on top.
    fn new_stack_with_items(item_count: usize) -> anyhow::Result<AbstractStack> {
        let mut stack = AbstractStack::new();
        for i in 0..item_count {
            stack.push(Interval::singleton(i))?;
        }

        Ok(stack)
    }

    #[test]
    fn can_construct_new_stack() {
        let stack = AbstractStack::new();
        assert_eq!(stack.size(), 0);
        assert!(stack.is_empty());
    }

    #[test]
    fn cannot_push_outside_of_capacity() -> anyhow::Result<()> {
        let mut stack = new_stack_with_items(MAXIMUM_STACK_DEPTH)?;
        let error = stack
            .push(Interval::zero())
            .expect_err("Pushing onto a full stack did not error");
        assert_eq!(
            error,
            Error::StackDepthExceeded {
                requested: MAXIMUM_STACK_DEPTH + 1,
            }
        );

        Ok(())
    }

    #[test]
    fn pops_in_last_in_first_out_order() -> anyhow::Result<()> {
        let mut stack = new_stack_with_items(2)?;
        assert_eq!(stack.pop()?, Interval::one());
        assert_eq!(stack.pop()?, Interval::zero());

        let error = stack.pop().expect_err("Did not error when popping empty stack");
        assert_eq!(
            error,
            Error::StackUnderflow {
                requested: 1,
                available: 0,
            }
        );

        Ok(())
    }

    #[test]
    fn push_then_dup_duplicates_the_top() -> anyhow::Result<()> {
        let mut stack = AbstractStack::new();
        stack.push(Interval::singleton(5))?;
        stack.dup(1)?;

        let items: Vec<Interval> = stack.iter().cloned().collect();
        assert_eq!(items, vec![Interval::singleton(5), Interval::singleton(5)]);

        Ok(())
    }

    #[test]
    fn dups_deeper_items() -> anyhow::Result<()> {
        let mut stack = new_stack_with_items(10)?;
        stack.dup(3)?;
        assert_eq!(stack.size(), 11);
        assert_eq!(stack.top()?, &Interval::singleton(7));

        Ok(())
    }

    #[test]
    fn cannot_dup_or_swap_beyond_the_stack() -> anyhow::Result<()> {
        let mut stack = new_stack_with_items(3)?;
        stack.dup(4).expect_err("Duplicated a nonexistent stack item");
        stack.swap(3).expect_err("Swapped with a nonexistent stack item");
        AbstractStack::new()
            .dup(1)
            .expect_err("Duplicated a stack item when stack was empty");

        // The failed operations leave the stack as it was.
        assert_eq!(stack, new_stack_with_items(3)?);

        Ok(())
    }

    #[test]
    fn swaps_the_top_with_a_lower_item() -> anyhow::Result<()> {
        let mut stack = new_stack_with_items(4)?;
        stack.swap(2)?;

        let items: Vec<Interval> = stack.iter().cloned().collect();
        assert_eq!(
            items,
            vec![
                Interval::singleton(1),
                Interval::singleton(2),
                Interval::singleton(3),
                Interval::singleton(0),
            ]
        );

        Ok(())
    }

    #[test]
    fn clones_do_not_share_writes() -> anyhow::Result<()> {
        let original = new_stack_with_items(2)?;
        let mut derived = original.clone();
        derived.pop()?;
        derived.push(Interval::Top)?;

        assert_eq!(original.top()?, &Interval::one());
        assert_eq!(derived.top()?, &Interval::Top);

        Ok(())
    }

    #[test]
    fn discards_multiple_items() -> anyhow::Result<()> {
        let mut stack = new_stack_with_items(5)?;
        stack.discard(3)?;
        assert_eq!(stack.size(), 2);
        stack.discard(3).expect_err("Discarded more items than exist");
        assert_eq!(stack.size(), 2);

        Ok(())
    }

    #[test]
    fn joins_stacks_from_the_top() -> anyhow::Result<()> {
        let short = AbstractStack::from_top_down([Interval::singleton(4)])?;
        let tall = AbstractStack::from_top_down([Interval::singleton(8), Interval::singleton(1)])?;

        let joined = short.lub(&tall);
        assert_eq!(joined.size(), 1);
        assert_eq!(joined.top()?, &Interval::range(4, 8));

        assert!(short.less_or_equal(&joined));
        assert!(tall.less_or_equal(&joined));
        assert!(!joined.less_or_equal(&tall));
        assert!(joined.less_or_equal(&short.widening(&tall)));

        Ok(())
    }

    #[test]
    fn displays_from_the_top_down() -> anyhow::Result<()> {
        let stack = AbstractStack::from_top_down([Interval::singleton(5), Interval::Top])?;
        assert_eq!(stack.to_string(), "[[5, 5], TOP]");

        Ok(())
    }
}
