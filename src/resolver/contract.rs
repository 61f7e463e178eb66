//! This module contains types useful for dealing with concrete contracts that
//! you want to analyze.

use crate::{disassembly::decode_hex, error};

/// The contract whose jumps are to be resolved.
///
/// This is intended to be immutable once created.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Contract {
    /// The bytecode of the contract.
    bytecode: Vec<u8>,
}

impl Contract {
    /// Creates a new contract from the provided `bytecode`.
    ///
    /// This should be the runtime bytecode of the contract. Any trailing CBOR
    /// metadata is tolerated, as it disassembles to unreachable code.
    #[must_use]
    pub fn new(bytecode: Vec<u8>) -> Self {
        Self { bytecode }
    }

    /// Creates a new contract from the hexadecimal encoding of its bytecode,
    /// optionally prefixed by `0x`.
    ///
    /// # Errors
    ///
    /// If `hex` is not a valid hexadecimal string.
    pub fn from_hex(hex: &str) -> error::Result<Self> {
        let bytecode = decode_hex(hex)?;
        Ok(Self::new(bytecode))
    }

    /// Gets a reference to the bytecode of the contract.
    #[must_use]
    pub fn bytecode(&self) -> &Vec<u8> {
        &self.bytecode
    }
}
