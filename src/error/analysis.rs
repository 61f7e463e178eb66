//! This module contains errors pertaining to the abstract interpretation of
//! the bytecode and the resolution of its jumps.

use thiserror::Error;

use crate::error::container;

/// Errors that occur while abstractly interpreting the bytecode.
///
/// Most of these never reach the library interface. Stack errors are raised by
/// the abstract stack and recovered by the opcode transformer, which turns them
/// into a less precise (but still sound) abstract state.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("A stack item at depth {requested:?} was requested but only {available:?} exist")]
    StackUnderflow { requested: usize, available: usize },

    #[error("Maximum stack depth exceeded with request for {requested:?} frames")]
    StackDepthExceeded { requested: usize },

    #[error("No instruction exists at offset {offset:?}")]
    NoSuchInstruction { offset: u32 },

    #[error("The control-flow graph has no entry instruction")]
    MissingEntry,
}

/// An analysis error with an associated location in the bytecode.
pub type LocatedError = container::Located<Error>;

/// A container of analysis errors.
pub type Errors = container::Errors<LocatedError>;

/// The result type for methods that may have analysis errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Make it possible to attach locations to these errors.
impl container::Locatable for Error {
    type Located = LocatedError;

    fn locate(self, instruction_pointer: u32) -> Self::Located {
        container::Located {
            location: instruction_pointer,
            payload:  self,
        }
    }
}
