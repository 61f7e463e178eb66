//! This module contains the abstract semantics of each EVM opcode over an
//! [`EvmAbstractState`], as well as the refinement of the state along the two
//! branches of a `JUMPI`.
//!
//! # Stack Disjuncts
//!
//! Each opcode is applied separately to each stack in the state's stack set,
//! against the shared memory. The resulting stacks form the new stack set,
//! while the resulting memories and `mu_i` values are joined.
//!
//! # Failure Recovery
//!
//! A stack underflow on any disjunct makes the whole result
//! [`EvmAbstractState::Top`], as the abstraction can no longer say anything
//! about the frame. A disjunct that would overflow the stack cannot describe a
//! real execution and is dropped.

use num_bigint::BigInt;
use num_traits::Zero;

use crate::{
    cfg::{EdgeKind, Statement},
    constant::WORD_SIZE_BYTES,
    error::analysis::{Error, Result},
    fixpoint::Transfer,
    lattice::{BoundedLattice, Lattice},
    opcode::Opcode,
    state::{
        memory::Memory,
        stack::AbstractStack,
        stack_set::AbstractStackSet,
        EvmAbstractState,
        Frame,
    },
    value::Interval,
};

/// The branch of a `JUMPI` along which a state flows.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Branch {
    /// The condition was non-zero and the jump was taken.
    Taken,

    /// The condition was zero and execution fell through.
    NotTaken,
}

/// The result of applying an opcode to one stack disjunct.
struct Effect {
    stack: AbstractStack,
    memory: Memory,
    mu_i: Interval,
}

impl EvmAbstractState {
    /// Computes the state after executing `opcode` in `self`.
    #[must_use]
    pub fn apply(&self, opcode: &Opcode) -> Self {
        let Self::Value(frame) = self else {
            return self.clone();
        };

        let mut effects = Vec::with_capacity(frame.stacks().len());
        for stack in frame.stacks().iter() {
            match step(opcode, stack, frame.memory(), frame.mu_i()) {
                Ok(effect) => effects.push(effect),
                Err(error @ Error::StackUnderflow { .. }) => {
                    tracing::trace!(%opcode, %error, "Stack underflow, giving up on the frame");
                    return Self::Top;
                }
                Err(error) => {
                    tracing::trace!(%opcode, %error, "Dropping infeasible stack");
                }
            }
        }

        let bound = frame.stacks().bound();
        let mut effects = effects.into_iter();
        let Some(first) = effects.next() else {
            return Self::Bottom;
        };
        let mut stacks = vec![first.stack];
        let mut memory = first.memory;
        let mut mu_i = first.mu_i;
        for effect in effects {
            stacks.push(effect.stack);
            memory = memory.lub(&effect.memory);
            mu_i = mu_i.lub(&effect.mu_i);
        }

        Self::from_frame(Frame::new(
            AbstractStackSet::from_stacks(stacks, bound),
            memory,
            mu_i,
        ))
    }

    /// Refines the state before a `JUMPI` to the states in which `branch` is
    /// followed, popping the destination and the condition.
    ///
    /// Stacks whose condition rules out `branch` are removed. If none remain,
    /// the branch is unreachable.
    #[must_use]
    pub fn assume(&self, branch: Branch) -> Self {
        let Self::Value(frame) = self else {
            return self.clone();
        };
        if frame.stacks().iter().any(|s| s.size() < 2) {
            return Self::Top;
        }

        let stacks = frame.stacks().filter_map(|stack| {
            let condition = stack.peek(1).ok()?;
            let feasible = match branch {
                Branch::Taken => !condition.is_zero() && !condition.is_bottom(),
                Branch::NotTaken => condition.may_be_zero(),
            };
            if !feasible {
                return None;
            }
            let mut stack = stack.clone();
            stack.discard(2).ok()?;
            Some(stack)
        });

        Self::from_frame(Frame::new(
            stacks,
            frame.memory().clone(),
            frame.mu_i().clone(),
        ))
    }
}

/// Applies `opcode` to a single stack, with the frame's `memory` and `mu_i`.
fn step(
    opcode: &Opcode,
    stack: &AbstractStack,
    memory: &Memory,
    mu_i: &Interval,
) -> Result<Effect> {
    let mut stack = stack.clone();
    let mut memory = memory.clone();
    let mut mu_i = mu_i.clone();
    let word = Interval::singleton(WORD_SIZE_BYTES);

    match opcode {
        Opcode::Stop | Opcode::JumpDest | Opcode::Invalid(_) => {}

        Opcode::Add => binary(&mut stack, Interval::add)?,
        Opcode::Mul => binary(&mut stack, Interval::mul)?,
        Opcode::Sub => binary(&mut stack, Interval::sub)?,
        Opcode::Div => binary(&mut stack, Interval::div)?,
        Opcode::SDiv => binary(&mut stack, Interval::signed_div)?,
        Opcode::Mod => binary(&mut stack, Interval::rem)?,
        Opcode::SMod => binary(&mut stack, Interval::signed_rem)?,
        Opcode::AddMod => ternary(&mut stack, Interval::add_mod)?,
        Opcode::MulMod => ternary(&mut stack, Interval::mul_mod)?,
        Opcode::Exp => binary(&mut stack, Interval::exp)?,
        Opcode::SignExtend => binary(&mut stack, Interval::sign_extend)?,

        Opcode::Lt => binary(&mut stack, Interval::lt)?,
        Opcode::Gt => binary(&mut stack, Interval::gt)?,
        Opcode::SLt => binary(&mut stack, Interval::signed_lt)?,
        Opcode::SGt => binary(&mut stack, Interval::signed_gt)?,
        Opcode::Eq => binary(&mut stack, Interval::eq)?,
        Opcode::IsZero => unary(&mut stack, Interval::iszero)?,
        Opcode::And => binary(&mut stack, Interval::and)?,
        Opcode::Or => binary(&mut stack, Interval::or)?,
        Opcode::Xor => binary(&mut stack, Interval::xor)?,
        Opcode::Not => unary(&mut stack, Interval::not)?,
        Opcode::Byte => binary(&mut stack, Interval::byte)?,
        Opcode::Shl => binary(&mut stack, Interval::shl)?,
        Opcode::Shr => binary(&mut stack, Interval::shr)?,
        Opcode::Sar => binary(&mut stack, Interval::sar)?,

        Opcode::Sha3 => {
            let offset = stack.pop()?;
            let size = stack.pop()?;
            mu_i = expand(&mu_i, &offset, &size);
            stack.push(Interval::Top)?;
        }

        Opcode::Address
        | Opcode::Origin
        | Opcode::Caller
        | Opcode::CallValue
        | Opcode::CallDataSize
        | Opcode::CodeSize
        | Opcode::GasPrice
        | Opcode::ReturnDataSize
        | Opcode::CoinBase
        | Opcode::Timestamp
        | Opcode::Number
        | Opcode::Prevrandao
        | Opcode::GasLimit
        | Opcode::ChainId
        | Opcode::SelfBalance
        | Opcode::BaseFee
        | Opcode::BlobBaseFee
        | Opcode::Pc
        | Opcode::Gas => stack.push(Interval::Top)?,

        Opcode::Balance
        | Opcode::CallDataLoad
        | Opcode::ExtCodeSize
        | Opcode::ExtCodeHash
        | Opcode::BlockHash
        | Opcode::BlobHash
        | Opcode::SLoad
        | Opcode::TLoad => {
            stack.pop()?;
            stack.push(Interval::Top)?;
        }

        Opcode::CallDataCopy | Opcode::CodeCopy | Opcode::ReturnDataCopy => {
            let dest = stack.pop()?;
            stack.pop()?;
            let size = stack.pop()?;
            memory = memory.clobber(&dest, &size);
            mu_i = expand(&mu_i, &dest, &size);
        }
        Opcode::ExtCodeCopy => {
            stack.pop()?;
            let dest = stack.pop()?;
            stack.pop()?;
            let size = stack.pop()?;
            memory = memory.clobber(&dest, &size);
            mu_i = expand(&mu_i, &dest, &size);
        }
        Opcode::MCopy => {
            let dest = stack.pop()?;
            let source = stack.pop()?;
            let size = stack.pop()?;
            memory = memory.clobber(&dest, &size);
            mu_i = expand(&expand(&mu_i, &dest, &size), &source, &size);
        }

        Opcode::Pop => {
            stack.pop()?;
        }
        Opcode::MLoad => {
            let offset = stack.pop()?;
            mu_i = expand(&mu_i, &offset, &word);
            stack.push(memory.load(&offset))?;
        }
        Opcode::MStore => {
            let offset = stack.pop()?;
            let value = stack.pop()?;
            mu_i = expand(&mu_i, &offset, &word);
            memory = memory.store(&offset, value);
        }
        Opcode::MStore8 => {
            let offset = stack.pop()?;
            stack.pop()?;
            mu_i = expand(&mu_i, &offset, &Interval::one());
            memory = memory.store_byte(&offset);
        }
        Opcode::SStore | Opcode::TStore | Opcode::JumpI => stack.discard(2)?,
        Opcode::Jump => stack.discard(1)?,
        Opcode::MSize => stack.push(mu_i.mul(&word))?,

        Opcode::Push0 => stack.push(Interval::zero())?,
        Opcode::Push { value, .. } => stack.push(Interval::from_word(*value))?,
        Opcode::Dup(item) => stack.dup(usize::from(*item))?,
        Opcode::Swap(item) => stack.swap(usize::from(*item))?,
        Opcode::Log(topics) => {
            let offset = stack.pop()?;
            let size = stack.pop()?;
            mu_i = expand(&mu_i, &offset, &size);
            stack.discard(usize::from(*topics))?;
        }

        Opcode::Create | Opcode::Create2 => {
            stack.pop()?;
            let offset = stack.pop()?;
            let size = stack.pop()?;
            if matches!(opcode, Opcode::Create2) {
                stack.pop()?;
            }
            mu_i = expand(&mu_i, &offset, &size);
            stack.push(Interval::Top)?;
        }
        Opcode::Call | Opcode::CallCode | Opcode::DelegateCall | Opcode::StaticCall => {
            stack.pop()?;
            stack.pop()?;
            if matches!(opcode, Opcode::Call | Opcode::CallCode) {
                stack.pop()?;
            }
            let args_offset = stack.pop()?;
            let args_size = stack.pop()?;
            let ret_offset = stack.pop()?;
            let ret_size = stack.pop()?;
            memory = memory.clobber(&ret_offset, &ret_size);
            mu_i = expand(&expand(&mu_i, &args_offset, &args_size), &ret_offset, &ret_size);
            stack.push(Interval::Top)?;
        }
        Opcode::Return | Opcode::Revert => {
            let offset = stack.pop()?;
            let size = stack.pop()?;
            mu_i = expand(&mu_i, &offset, &size);
        }
        Opcode::SelfDestruct => {
            stack.pop()?;
        }
    }

    Ok(Effect {
        stack,
        memory,
        mu_i,
    })
}

/// Replaces the top of the stack with `op` applied to it.
fn unary(stack: &mut AbstractStack, op: impl FnOnce(&Interval) -> Interval) -> Result<()> {
    let a = stack.pop()?;
    stack.push(op(&a))
}

/// Replaces the top two stack items `a` (the top) and `b` with `op(a, b)`.
fn binary(
    stack: &mut AbstractStack,
    op: impl FnOnce(&Interval, &Interval) -> Interval,
) -> Result<()> {
    let a = stack.pop()?;
    let b = stack.pop()?;
    stack.push(op(&a, &b))
}

/// Replaces the top three stack items `a` (the top), `b` and `c` with
/// `op(a, b, c)`.
fn ternary(
    stack: &mut AbstractStack,
    op: impl FnOnce(&Interval, &Interval, &Interval) -> Interval,
) -> Result<()> {
    let a = stack.pop()?;
    let b = stack.pop()?;
    let c = stack.pop()?;
    stack.push(op(&a, &b, &c))
}

/// Raises `mu_i` to cover an access of `size` bytes at `offset`.
///
/// Accesses of zero bytes do not expand memory. An access at an unknown offset
/// or of unknown size may touch any word.
fn expand(mu_i: &Interval, offset: &Interval, size: &Interval) -> Interval {
    let (Some((offset_low, offset_high)), Some((size_low, size_high))) =
        (offset.bounds(), size.bounds())
    else {
        return mu_i.clone();
    };
    if size_high.is_zero() {
        return mu_i.clone();
    }
    if offset.is_top() || size.is_top() {
        return Interval::Top;
    }

    let width = BigInt::from(WORD_SIZE_BYTES);
    let words = |bytes: BigInt| (bytes + &width - 1) / &width;
    let low = if size_low.is_zero() {
        BigInt::zero()
    } else {
        words(offset_low + size_low)
    };
    let high = words(offset_high + size_high);

    mu_i.maximum(&Interval::range(low, high))
}

/// The transfer function of the jump analysis, applying the opcode of each
/// statement and refining states along the branches of each `JUMPI`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EvmTransfer;

impl Transfer for EvmTransfer {
    type Value = EvmAbstractState;

    fn apply(&self, statement: &Statement, before: &Self::Value) -> Self::Value {
        before.apply(&statement.opcode)
    }

    fn propagate(
        &self,
        statement: &Statement,
        edge: EdgeKind,
        before: &Self::Value,
        after: &Self::Value,
    ) -> Self::Value {
        match (statement.opcode, edge) {
            (Opcode::JumpI, EdgeKind::True) => before.assume(Branch::Taken),
            (Opcode::JumpI, EdgeKind::False) => before.assume(Branch::NotTaken),
            _ => after.clone(),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{
        constant::MAXIMUM_STACK_DEPTH,
        lattice::BoundedLattice,
        opcode::Opcode,
        state::{
            memory::Memory,
            stack::AbstractStack,
            stack_set::AbstractStackSet,
            transfer::Branch,
            EvmAbstractState,
            Frame,
        },
        value::{Interval, KnownWord},
    };

    fn push(value: u64) -> anyhow::Result<Opcode> {
        Ok(Opcode::push(2, &(value as u16).to_be_bytes())?)
    }

    /// Runs `opcodes` from the initial state.
    fn run(opcodes: &[Opcode]) -> EvmAbstractState {
        opcodes
            .iter()
            .fold(EvmAbstractState::initial(8), |state, opcode| state.apply(opcode))
    }

    fn tops(state: &EvmAbstractState) -> Vec<Option<Interval>> {
        state.frame().map(|f| f.stacks().tops()).unwrap_or_default()
    }

    #[test]
    fn pushes_literals_as_singletons() -> anyhow::Result<()> {
        let state = run(&[push(0x1234)?, Opcode::Push0]);
        let frame = state.frame().expect("Push produced no frame");
        let stack = frame.stacks().iter().next().expect("No stack in frame");

        assert_eq!(stack.peek(0)?, &Interval::zero());
        assert_eq!(stack.peek(1)?, &Interval::singleton(0x1234));

        Ok(())
    }

    #[test]
    fn arithmetic_pops_operands_top_first() -> anyhow::Result<()> {
        let state = run(&[push(3)?, push(10)?, Opcode::Sub]);
        assert_eq!(tops(&state), vec![Some(Interval::singleton(7))]);

        let state = run(&[push(0)?, push(10)?, Opcode::Div]);
        assert_eq!(tops(&state), vec![Some(Interval::zero())]);

        let state = run(&[push(4)?, push(2)?, push(3)?, Opcode::AddMod]);
        assert_eq!(tops(&state), vec![Some(Interval::one())]);

        Ok(())
    }

    #[test]
    fn shifts_take_the_shift_amount_from_the_top() -> anyhow::Result<()> {
        let state = run(&[push(1)?, push(4)?, Opcode::Shl]);
        assert_eq!(tops(&state), vec![Some(Interval::singleton(16))]);

        Ok(())
    }

    #[test]
    fn context_opcodes_push_top() -> anyhow::Result<()> {
        for opcode in [Opcode::Caller, Opcode::Pc, Opcode::Gas, Opcode::Timestamp] {
            assert_eq!(tops(&run(&[opcode])), vec![Some(Interval::Top)]);
        }
        assert_eq!(
            tops(&run(&[push(0)?, Opcode::SLoad])),
            vec![Some(Interval::Top)]
        );

        Ok(())
    }

    #[test]
    fn underflow_yields_top() {
        assert!(run(&[Opcode::Add]).is_top());
        assert!(run(&[Opcode::Pop]).is_top());
        assert!(run(&[Opcode::Dup(1)]).is_top());
        assert!(EvmAbstractState::Top.apply(&Opcode::Push0).is_top());
        assert!(EvmAbstractState::Bottom.apply(&Opcode::Push0).is_bottom());
    }

    #[test]
    fn overflowing_stacks_are_dropped() -> anyhow::Result<()> {
        let full = AbstractStack::from_top_down(
            std::iter::repeat(Interval::one()).take(MAXIMUM_STACK_DEPTH),
        )?;
        let short = AbstractStack::from_top_down([Interval::singleton(7)])?;
        let state_with = |stacks: Vec<AbstractStack>| {
            EvmAbstractState::from_frame(Frame::new(
                AbstractStackSet::from_stacks(stacks, 8),
                Memory::new(),
                Interval::zero(),
            ))
        };

        let mixed = state_with(vec![full.clone(), short]).apply(&Opcode::Push0);
        assert_eq!(tops(&mixed), vec![Some(Interval::zero())]);
        let survivor = mixed
            .frame()
            .and_then(|f| f.stacks().iter().next().map(AbstractStack::size));
        assert_eq!(survivor, Some(2));

        let overflowed = state_with(vec![full]).apply(&Opcode::Push0);
        assert!(overflowed.is_bottom());

        Ok(())
    }

    #[test]
    fn memory_round_trips_through_precise_offsets() -> anyhow::Result<()> {
        let state = run(&[
            push(0x80)?,
            push(0x40)?,
            Opcode::MStore,
            push(0x40)?,
            Opcode::MLoad,
        ]);
        assert_eq!(tops(&state), vec![Some(Interval::singleton(0x80))]);

        let frame = state.frame().expect("Memory access produced no frame");
        assert_eq!(frame.mu_i(), &Interval::singleton(3));

        let msize = state.apply(&Opcode::MSize);
        assert_eq!(tops(&msize), vec![Some(Interval::singleton(0x60))]);

        Ok(())
    }

    #[test]
    fn copies_forget_the_destination() -> anyhow::Result<()> {
        let state = run(&[
            push(0x80)?,
            push(0x00)?,
            Opcode::MStore,
            push(0x20)?,
            push(0x00)?,
            push(0x00)?,
            Opcode::CallDataCopy,
            push(0x00)?,
            Opcode::MLoad,
        ]);
        assert_eq!(tops(&state), vec![Some(Interval::Top)]);

        Ok(())
    }

    #[test]
    fn calls_pop_their_arguments_and_push_a_result() -> anyhow::Result<()> {
        let mut opcodes = vec![push(0)?; 7];
        opcodes.push(Opcode::Call);
        let state = run(&opcodes);
        let frame = state.frame().expect("Call produced no frame");
        let stack = frame.stacks().iter().next().expect("No stack in frame");
        assert_eq!(stack.size(), 1);
        assert_eq!(stack.top()?, &Interval::Top);

        let mut opcodes = vec![push(0)?; 6];
        opcodes.push(Opcode::StaticCall);
        assert_eq!(tops(&run(&opcodes)), vec![Some(Interval::Top)]);

        Ok(())
    }

    #[test]
    fn logs_pop_their_topics() -> anyhow::Result<()> {
        let mut opcodes = vec![push(0)?; 5];
        opcodes.push(Opcode::log(3)?);
        assert_eq!(tops(&run(&opcodes)), vec![None]);

        let mut opcodes = vec![push(0)?; 2];
        opcodes.push(Opcode::log(0)?);
        assert_eq!(tops(&run(&opcodes)), vec![None]);

        Ok(())
    }

    #[test]
    fn assume_splits_on_the_condition() -> anyhow::Result<()> {
        let taken = run(&[push(1)?, push(8)?]);
        assert_eq!(taken.assume(Branch::Taken).frame().map(|f| f.stacks().len()), Some(1));
        assert!(taken.assume(Branch::NotTaken).is_bottom());

        let not_taken = run(&[push(0)?, push(8)?]);
        assert!(not_taken.assume(Branch::Taken).is_bottom());
        assert!(!not_taken.assume(Branch::NotTaken).is_bottom());

        let unknown = run(&[Opcode::CallValue, push(8)?]);
        assert!(!unknown.assume(Branch::Taken).is_bottom());
        assert!(!unknown.assume(Branch::NotTaken).is_bottom());

        assert!(run(&[push(8)?]).assume(Branch::Taken).is_top());

        Ok(())
    }

    #[test]
    fn jumps_pop_their_operands() -> anyhow::Result<()> {
        let state = run(&[push(1)?, push(2)?, push(8)?, Opcode::JumpI]);
        assert_eq!(tops(&state), vec![Some(Interval::one())]);

        let state = run(&[push(8)?, Opcode::Jump]);
        assert_eq!(tops(&state), vec![None]);

        let word = KnownWord::from(0x1234usize);
        let state = run(&[Opcode::Push { size: 2, value: word }, Opcode::JumpDest]);
        assert_eq!(tops(&state), vec![Some(Interval::singleton(0x1234))]);

        Ok(())
    }
}
