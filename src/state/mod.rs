//! This module contains the abstract state of the EVM that the jump analysis
//! propagates through the control-flow graph, along with the domains it is
//! built from.
//!
//! An [`EvmAbstractState`] is either unreachable ([`EvmAbstractState::Bottom`]),
//! completely unknown ([`EvmAbstractState::Top`]), or a [`Frame`] that tracks a
//! bounded set of possible operand stacks, the contents of memory, and the
//! number of active memory words (`mu_i`).
//!
//! The per-opcode transformer lives in [`transfer`].

pub mod memory;
pub mod stack;
pub mod stack_set;
pub mod transfer;

use crate::{
    lattice::{BoundedLattice, Lattice},
    state::{memory::Memory, stack::AbstractStack, stack_set::AbstractStackSet},
    value::Interval,
};

/// The reachable, partially known state of an execution frame.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    stacks: AbstractStackSet,
    memory: Memory,
    mu_i: Interval,
}

impl Frame {
    /// Constructs a new frame from its components.
    #[must_use]
    pub fn new(stacks: AbstractStackSet, memory: Memory, mu_i: Interval) -> Self {
        Self {
            stacks,
            memory,
            mu_i,
        }
    }

    /// Gets the set of stacks the frame may have.
    #[must_use]
    pub fn stacks(&self) -> &AbstractStackSet {
        &self.stacks
    }

    /// Gets the abstract memory of the frame.
    #[must_use]
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Gets the number of 32-byte memory words that may be active.
    #[must_use]
    pub fn mu_i(&self) -> &Interval {
        &self.mu_i
    }
}

/// An abstraction of the EVM machine state at a single program point.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EvmAbstractState {
    /// The program point cannot be reached.
    Bottom,

    /// Nothing is known about the program point.
    Top,

    /// The program point is reachable with the state described by the frame.
    Value(Frame),
}

impl EvmAbstractState {
    /// Creates the state at the start of execution: a single empty stack,
    /// empty memory and no active memory words.
    ///
    /// At most `stack_set_bound` distinct stacks are tracked at each program
    /// point before they are merged.
    #[must_use]
    pub fn initial(stack_set_bound: usize) -> Self {
        Self::Value(Frame::new(
            AbstractStackSet::new(AbstractStack::new(), stack_set_bound),
            Memory::new(),
            Interval::zero(),
        ))
    }

    /// Creates a state from `frame`, which is unreachable if the frame has no
    /// possible stacks.
    #[must_use]
    pub fn from_frame(frame: Frame) -> Self {
        if frame.stacks.is_empty() {
            Self::Bottom
        } else {
            Self::Value(frame)
        }
    }

    /// Gets the frame of the state, if it is neither bottom nor top.
    #[must_use]
    pub fn frame(&self) -> Option<&Frame> {
        match self {
            Self::Value(frame) => Some(frame),
            _ => None,
        }
    }
}

impl Lattice for EvmAbstractState {
    fn lub(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, x) | (x, Self::Bottom) => x.clone(),
            (Self::Top, _) | (_, Self::Top) => Self::Top,
            (Self::Value(a), Self::Value(b)) => Self::from_frame(Frame::new(
                a.stacks.lub(&b.stacks),
                a.memory.lub(&b.memory),
                a.mu_i.lub(&b.mu_i),
            )),
        }
    }

    fn widening(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, x) | (x, Self::Bottom) => x.clone(),
            (Self::Top, _) | (_, Self::Top) => Self::Top,
            (Self::Value(a), Self::Value(b)) => Self::from_frame(Frame::new(
                a.stacks.widening(&b.stacks),
                a.memory.widening(&b.memory),
                a.mu_i.widening(&b.mu_i),
            )),
        }
    }

    fn less_or_equal(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bottom, _) | (_, Self::Top) => true,
            (_, Self::Bottom) | (Self::Top, _) => false,
            (Self::Value(a), Self::Value(b)) => {
                a.stacks.less_or_equal(&b.stacks)
                    && a.memory.less_or_equal(&b.memory)
                    && a.mu_i.less_or_equal(&b.mu_i)
            }
        }
    }
}

impl BoundedLattice for EvmAbstractState {
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
