//! This module contains the implementation of the [`InstructionStream`], a type
//! that represents a sequence of bytecode instructions and provides utilities
//! for implementing it.

mod disassembler;

use std::rc::Rc;

use hex::FromHexError;

use crate::{
    error::{container::Locatable, disassembly, disassembly::Error},
    opcode::Opcode,
};

/// A single [`Opcode`] along with the byte offset at which it appears in the
/// bytecode.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Instruction {
    /// The program counter value at which the opcode begins.
    pub offset: u32,

    /// The opcode, including any immediate data.
    pub opcode: Opcode,
}

impl Instruction {
    /// Creates a new instruction for `opcode` at `offset`.
    #[must_use]
    pub fn new(offset: u32, opcode: Opcode) -> Self {
        Self { offset, opcode }
    }
}

/// The instruction stream is a representation of a sequence of [`Opcode`]s that
/// implements some program.
///
/// # Non-Emptiness
///
/// The instruction stream is required to contain _at least one_ instruction.
/// This is validated at construction time.
///
/// # Stream Validity
///
/// This `InstructionStream` is a pure representation of the sequence of
/// instructions and performs no validation that the instruction stream is a
/// valid one. It is _perfectly_ possible, and allowable, to construct an
/// instruction stream containing invalid instructions.
///
/// # Byte-Instruction Correspondence
///
/// Where most [`Opcode`]s occupy a single byte, `PUSHN` is followed in the
/// bytecode by the `N` bytes of data that it pushes. Each [`Instruction`]
/// records the byte offset at which it begins, so the offsets in the stream are
/// not contiguous across a push.
#[derive(Clone, Debug)]
pub struct InstructionStream {
    /// The sequence of [`Instruction`]s in program order.
    instructions: Rc<Vec<Instruction>>,
}

impl InstructionStream {
    /// Gets the number of instructions in the stream.
    #[allow(clippy::len_without_is_empty)] // The structure cannot be empty.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Iterates over the instructions in program order.
    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter()
    }

    /// Gets the instruction starting at byte `offset`, if one does.
    #[must_use]
    pub fn at(&self, offset: u32) -> Option<&Instruction> {
        self.instructions
            .binary_search_by_key(&offset, |i| i.offset)
            .ok()
            .map(|index| &self.instructions[index])
    }

    /// Converts the instructions in the instruction stream to their
    /// corresponding bytecode.
    ///
    /// This should always result in the same bytecode as the input to the
    /// disassembly process.
    #[must_use]
    pub fn as_bytecode(&self) -> Vec<u8> {
        self.instructions.iter().flat_map(|i| i.opcode.encode()).collect()
    }
}

/// An [`InstructionStream`] is usually created from a byte array of bytecode.
impl<'a> TryFrom<&'a [u8]> for InstructionStream {
    type Error = disassembly::LocatedError;

    fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
        let instructions = Rc::new(disassembler::disassemble(value)?);
        let result = Self { instructions };

        // A sanity check that disassembly didn't go wrong, disabled in release builds.
        debug_assert_eq!(result.as_bytecode().as_slice(), value);
        Ok(result)
    }
}

/// An [`InstructionStream`] can be created from a string as long as that string
/// is a hexadecimal encoding of the equivalent bytes, optionally prefixed by
/// `0x`.
impl TryFrom<&str> for InstructionStream {
    type Error = disassembly::LocatedError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let bytes = decode_hex(value)?;
        InstructionStream::try_from(bytes.as_slice())
    }
}

/// Decodes the hexadecimal string `value`, optionally prefixed by `0x`, into
/// bytes.
///
/// # Errors
///
/// If `value` has an odd length or contains a non-hexadecimal character, in
/// which case the error is located at the offending character.
pub fn decode_hex(value: &str) -> disassembly::Result<Vec<u8>> {
    let prefix_len = if value.starts_with("0x") { 2 } else { 0 };
    hex::decode(&value[prefix_len..]).map_err(|e| {
        let locate = |val: usize| u32::try_from(val).unwrap_or(u32::MAX);
        if let FromHexError::InvalidHexCharacter { c, index } = e {
            Error::InvalidHexCharacter(c, index + prefix_len).locate(locate(index + prefix_len))
        } else {
            Error::InvalidHexLength.locate(locate(value.len()))
        }
    })
}

/// Allows converting the [`InstructionStream`] back to the corresponding
/// bytecode representation.
impl From<InstructionStream> for Vec<u8> {
    fn from(value: InstructionStream) -> Self {
        value.as_bytecode()
    }
}
