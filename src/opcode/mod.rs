//! This module contains the [`Opcode`] type, a closed representation of each of
//! the EVM's [opcodes](https://ethereum.org/en/developers/docs/evm/opcodes/).
//!
//! # Closed Representation
//!
//! Every opcode the library understands is a variant of the [`Opcode`] enum.
//! Consumers such as the abstract transformer in [`crate::state`] match on it
//! exhaustively, so adding an opcode here forces every consumer to decide how
//! it is handled.
//!
//! # Terminology
//!
//! When referring to stack slots, we treat index 1 as being the top of the
//! stack.

pub mod macros;

use std::fmt::{Display, Formatter};

use crate::{
    constant::{
        DUP_OPCODE_BASE_VALUE,
        DUP_SWAP_MAX_DEPTH,
        LOG_MAX_TOPICS,
        LOG_OPCODE_BASE_VALUE,
        PUSH_OPCODE_BASE_VALUE,
        PUSH_OPCODE_MAX_BYTES,
        SWAP_OPCODE_BASE_VALUE,
        WORD_SIZE_BYTES,
    },
    error::disassembly::Error,
    value::known::KnownWord,
};

/// A single EVM instruction.
///
/// Opcodes that are parameterised (`PUSHN`, `DUPN`, `SWAPN`, `LOGN`) carry
/// their parameter, and must be constructed through [`Opcode::push`],
/// [`Opcode::dup`], [`Opcode::swap`] and [`Opcode::log`] respectively so that
/// the parameter is validated.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Opcode {
    // Arithmetic
    Stop,
    Add,
    Mul,
    Sub,
    Div,
    SDiv,
    Mod,
    SMod,
    AddMod,
    MulMod,
    Exp,
    SignExtend,

    // Comparison and bitwise logic
    Lt,
    Gt,
    SLt,
    SGt,
    Eq,
    IsZero,
    And,
    Or,
    Xor,
    Not,
    Byte,
    Shl,
    Shr,
    Sar,

    Sha3,

    // Execution environment
    Address,
    Balance,
    Origin,
    Caller,
    CallValue,
    CallDataLoad,
    CallDataSize,
    CallDataCopy,
    CodeSize,
    CodeCopy,
    GasPrice,
    ExtCodeSize,
    ExtCodeCopy,
    ReturnDataSize,
    ReturnDataCopy,
    ExtCodeHash,

    // Block information
    BlockHash,
    CoinBase,
    Timestamp,
    Number,
    /// Formerly `DIFFICULTY`, the byte was repurposed by
    /// [EIP-4399](https://eips.ethereum.org/EIPS/eip-4399).
    Prevrandao,
    GasLimit,
    ChainId,
    SelfBalance,
    BaseFee,
    BlobHash,
    BlobBaseFee,

    // Stack, memory, storage and flow
    Pop,
    MLoad,
    MStore,
    MStore8,
    SLoad,
    SStore,
    Jump,
    JumpI,
    Pc,
    MSize,
    Gas,
    JumpDest,
    TLoad,
    TStore,
    MCopy,
    Push0,

    /// `PUSHN` for `N` in `1..=32`, along with the immediate it pushes.
    Push { size: u8, value: KnownWord },

    /// `DUPN` for `N` in `1..=16`.
    Dup(u8),

    /// `SWAPN` for `N` in `1..=16`.
    Swap(u8),

    /// `LOGN` for `N` in `0..=4`.
    Log(u8),

    // System
    Create,
    Call,
    CallCode,
    Return,
    DelegateCall,
    Create2,
    StaticCall,
    Revert,
    /// Any byte that is not a known opcode disassembles to `INVALID`, keeping
    /// the original byte so that the bytecode can be reconstructed.
    Invalid(u8),
    SelfDestruct,
}

impl Opcode {
    /// Constructs a new `PUSHN` opcode with `size` bytes, pushing the
    /// big-endian `bytes`.
    ///
    /// # Errors
    ///
    /// If `size` is not in `1..=32`, or if `bytes` does not have exactly `size`
    /// elements.
    pub fn push(size: u8, bytes: &[u8]) -> Result<Self, Error> {
        if size == 0 || size > PUSH_OPCODE_MAX_BYTES {
            return Err(Error::InvalidPushSize(size));
        }
        if bytes.len() != size as usize {
            return Err(Error::InvalidPushPayload {
                size,
                actual: bytes.len(),
            });
        }

        let mut word = [0u8; WORD_SIZE_BYTES];
        word[WORD_SIZE_BYTES - bytes.len()..].copy_from_slice(bytes);
        let value = KnownWord::from_be_bytes(word);

        Ok(Self::Push { size, value })
    }

    /// Constructs a new `DUPN` opcode that duplicates the `item`th stack item.
    ///
    /// # Errors
    ///
    /// If `item` is not in `1..=16`.
    pub fn dup(item: u8) -> Result<Self, Error> {
        if item == 0 || item > DUP_SWAP_MAX_DEPTH {
            return Err(Error::InvalidStackItem {
                item,
                name: "DUP".into(),
            });
        }

        Ok(Self::Dup(item))
    }

    /// Constructs a new `SWAPN` opcode that swaps the top of the stack with the
    /// `item + 1`th stack item.
    ///
    /// # Errors
    ///
    /// If `item` is not in `1..=16`.
    pub fn swap(item: u8) -> Result<Self, Error> {
        if item == 0 || item > DUP_SWAP_MAX_DEPTH {
            return Err(Error::InvalidStackItem {
                item,
                name: "SWAP".into(),
            });
        }

        Ok(Self::Swap(item))
    }

    /// Constructs a new `LOGN` opcode with `topics` topics.
    ///
    /// # Errors
    ///
    /// If `topics` is not in `0..=4`.
    pub fn log(topics: u8) -> Result<Self, Error> {
        if topics > LOG_MAX_TOPICS {
            return Err(Error::InvalidTopicCount(topics));
        }

        Ok(Self::Log(topics))
    }

    /// Gets the byte representation of the opcode.
    #[allow(clippy::too_many_lines)] // It is a flat table
    #[must_use]
    pub fn as_byte(&self) -> u8 {
        match self {
            Self::Stop => 0x00,
            Self::Add => 0x01,
            Self::Mul => 0x02,
            Self::Sub => 0x03,
            Self::Div => 0x04,
            Self::SDiv => 0x05,
            Self::Mod => 0x06,
            Self::SMod => 0x07,
            Self::AddMod => 0x08,
            Self::MulMod => 0x09,
            Self::Exp => 0x0a,
            Self::SignExtend => 0x0b,
            Self::Lt => 0x10,
            Self::Gt => 0x11,
            Self::SLt => 0x12,
            Self::SGt => 0x13,
            Self::Eq => 0x14,
            Self::IsZero => 0x15,
            Self::And => 0x16,
            Self::Or => 0x17,
            Self::Xor => 0x18,
            Self::Not => 0x19,
            Self::Byte => 0x1a,
            Self::Shl => 0x1b,
            Self::Shr => 0x1c,
            Self::Sar => 0x1d,
            Self::Sha3 => 0x20,
            Self::Address => 0x30,
            Self::Balance => 0x31,
            Self::Origin => 0x32,
            Self::Caller => 0x33,
            Self::CallValue => 0x34,
            Self::CallDataLoad => 0x35,
            Self::CallDataSize => 0x36,
            Self::CallDataCopy => 0x37,
            Self::CodeSize => 0x38,
            Self::CodeCopy => 0x39,
            Self::GasPrice => 0x3a,
            Self::ExtCodeSize => 0x3b,
            Self::ExtCodeCopy => 0x3c,
            Self::ReturnDataSize => 0x3d,
            Self::ReturnDataCopy => 0x3e,
            Self::ExtCodeHash => 0x3f,
            Self::BlockHash => 0x40,
            Self::CoinBase => 0x41,
            Self::Timestamp => 0x42,
            Self::Number => 0x43,
            Self::Prevrandao => 0x44,
            Self::GasLimit => 0x45,
            Self::ChainId => 0x46,
            Self::SelfBalance => 0x47,
            Self::BaseFee => 0x48,
            Self::BlobHash => 0x49,
            Self::BlobBaseFee => 0x4a,
            Self::Pop => 0x50,
            Self::MLoad => 0x51,
            Self::MStore => 0x52,
            Self::MStore8 => 0x53,
            Self::SLoad => 0x54,
            Self::SStore => 0x55,
            Self::Jump => 0x56,
            Self::JumpI => 0x57,
            Self::Pc => 0x58,
            Self::MSize => 0x59,
            Self::Gas => 0x5a,
            Self::JumpDest => 0x5b,
            Self::TLoad => 0x5c,
            Self::TStore => 0x5d,
            Self::MCopy => 0x5e,
            Self::Push0 => PUSH_OPCODE_BASE_VALUE,
            Self::Push { size, .. } => PUSH_OPCODE_BASE_VALUE + size,
            Self::Dup(item) => DUP_OPCODE_BASE_VALUE + item,
            Self::Swap(item) => SWAP_OPCODE_BASE_VALUE + item,
            Self::Log(topics) => LOG_OPCODE_BASE_VALUE + topics,
            Self::Create => 0xf0,
            Self::Call => 0xf1,
            Self::CallCode => 0xf2,
            Self::Return => 0xf3,
            Self::DelegateCall => 0xf4,
            Self::Create2 => 0xf5,
            Self::StaticCall => 0xfa,
            Self::Revert => 0xfd,
            Self::Invalid(byte) => *byte,
            Self::SelfDestruct => 0xff,
        }
    }

    /// Gets a textual representation of the opcode to aid in debugging.
    #[allow(clippy::too_many_lines)] // It is a flat table
    #[must_use]
    pub fn as_text_code(&self) -> String {
        let name = match self {
            Self::Stop => "STOP",
            Self::Add => "ADD",
            Self::Mul => "MUL",
            Self::Sub => "SUB",
            Self::Div => "DIV",
            Self::SDiv => "SDIV",
            Self::Mod => "MOD",
            Self::SMod => "SMOD",
            Self::AddMod => "ADDMOD",
            Self::MulMod => "MULMOD",
            Self::Exp => "EXP",
            Self::SignExtend => "SIGNEXTEND",
            Self::Lt => "LT",
            Self::Gt => "GT",
            Self::SLt => "SLT",
            Self::SGt => "SGT",
            Self::Eq => "EQ",
            Self::IsZero => "ISZERO",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::Not => "NOT",
            Self::Byte => "BYTE",
            Self::Shl => "SHL",
            Self::Shr => "SHR",
            Self::Sar => "SAR",
            Self::Sha3 => "SHA3",
            Self::Address => "ADDRESS",
            Self::Balance => "BALANCE",
            Self::Origin => "ORIGIN",
            Self::Caller => "CALLER",
            Self::CallValue => "CALLVALUE",
            Self::CallDataLoad => "CALLDATALOAD",
            Self::CallDataSize => "CALLDATASIZE",
            Self::CallDataCopy => "CALLDATACOPY",
            Self::CodeSize => "CODESIZE",
            Self::CodeCopy => "CODECOPY",
            Self::GasPrice => "GASPRICE",
            Self::ExtCodeSize => "EXTCODESIZE",
            Self::ExtCodeCopy => "EXTCODECOPY",
            Self::ReturnDataSize => "RETURNDATASIZE",
            Self::ReturnDataCopy => "RETURNDATACOPY",
            Self::ExtCodeHash => "EXTCODEHASH",
            Self::BlockHash => "BLOCKHASH",
            Self::CoinBase => "COINBASE",
            Self::Timestamp => "TIMESTAMP",
            Self::Number => "NUMBER",
            Self::Prevrandao => "PREVRANDAO",
            Self::GasLimit => "GASLIMIT",
            Self::ChainId => "CHAINID",
            Self::SelfBalance => "SELFBALANCE",
            Self::BaseFee => "BASEFEE",
            Self::BlobHash => "BLOBHASH",
            Self::BlobBaseFee => "BLOBBASEFEE",
            Self::Pop => "POP",
            Self::MLoad => "MLOAD",
            Self::MStore => "MSTORE",
            Self::MStore8 => "MSTORE8",
            Self::SLoad => "SLOAD",
            Self::SStore => "SSTORE",
            Self::Jump => "JUMP",
            Self::JumpI => "JUMPI",
            Self::Pc => "PC",
            Self::MSize => "MSIZE",
            Self::Gas => "GAS",
            Self::JumpDest => "JUMPDEST",
            Self::TLoad => "TLOAD",
            Self::TStore => "TSTORE",
            Self::MCopy => "MCOPY",
            Self::Push0 => "PUSH0",
            Self::Push { size, .. } => return format!("PUSH{size}"),
            Self::Dup(item) => return format!("DUP{item}"),
            Self::Swap(item) => return format!("SWAP{item}"),
            Self::Log(topics) => return format!("LOG{topics}"),
            Self::Create => "CREATE",
            Self::Call => "CALL",
            Self::CallCode => "CALLCODE",
            Self::Return => "RETURN",
            Self::DelegateCall => "DELEGATECALL",
            Self::Create2 => "CREATE2",
            Self::StaticCall => "STATICCALL",
            Self::Revert => "REVERT",
            Self::Invalid(_) => "INVALID",
            Self::SelfDestruct => "SELFDESTRUCT",
        };

        name.into()
    }

    /// Gets the number of arguments that the opcode consumes from the stack.
    #[must_use]
    pub fn arg_count(&self) -> usize {
        match self {
            Self::Stop
            | Self::Address
            | Self::Origin
            | Self::Caller
            | Self::CallValue
            | Self::CallDataSize
            | Self::CodeSize
            | Self::GasPrice
            | Self::ReturnDataSize
            | Self::CoinBase
            | Self::Timestamp
            | Self::Number
            | Self::Prevrandao
            | Self::GasLimit
            | Self::ChainId
            | Self::SelfBalance
            | Self::BaseFee
            | Self::BlobBaseFee
            | Self::Pc
            | Self::MSize
            | Self::Gas
            | Self::JumpDest
            | Self::Push0
            | Self::Push { .. }
            | Self::Invalid(_) => 0,
            Self::IsZero
            | Self::Not
            | Self::Balance
            | Self::CallDataLoad
            | Self::ExtCodeSize
            | Self::ExtCodeHash
            | Self::BlockHash
            | Self::BlobHash
            | Self::Pop
            | Self::MLoad
            | Self::SLoad
            | Self::Jump
            | Self::TLoad
            | Self::SelfDestruct => 1,
            Self::Add
            | Self::Mul
            | Self::Sub
            | Self::Div
            | Self::SDiv
            | Self::Mod
            | Self::SMod
            | Self::Exp
            | Self::SignExtend
            | Self::Lt
            | Self::Gt
            | Self::SLt
            | Self::SGt
            | Self::Eq
            | Self::And
            | Self::Or
            | Self::Xor
            | Self::Byte
            | Self::Shl
            | Self::Shr
            | Self::Sar
            | Self::Sha3
            | Self::MStore
            | Self::MStore8
            | Self::SStore
            | Self::JumpI
            | Self::TStore
            | Self::Return
            | Self::Revert => 2,
            Self::AddMod
            | Self::MulMod
            | Self::CallDataCopy
            | Self::CodeCopy
            | Self::ReturnDataCopy
            | Self::MCopy
            | Self::Create => 3,
            Self::ExtCodeCopy | Self::Create2 => 4,
            Self::DelegateCall | Self::StaticCall => 6,
            Self::Call | Self::CallCode => 7,
            Self::Dup(item) => *item as usize,
            Self::Swap(item) => *item as usize + 1,
            Self::Log(topics) => *topics as usize + 2,
        }
    }

    /// Gets the number of values that the opcode pushes onto the stack.
    ///
    /// For `DUPN` and `SWAPN` this counts the whole region of the stack that
    /// the opcode rewrites.
    #[must_use]
    pub fn ret_count(&self) -> usize {
        match self {
            Self::Dup(item) => *item as usize + 1,
            Self::Swap(item) => *item as usize + 1,
            Self::Stop
            | Self::CallDataCopy
            | Self::CodeCopy
            | Self::ExtCodeCopy
            | Self::ReturnDataCopy
            | Self::Pop
            | Self::MStore
            | Self::MStore8
            | Self::SStore
            | Self::Jump
            | Self::JumpI
            | Self::JumpDest
            | Self::TStore
            | Self::MCopy
            | Self::Log(_)
            | Self::Return
            | Self::Revert
            | Self::Invalid(_)
            | Self::SelfDestruct => 0,
            _ => 1,
        }
    }

    /// Encodes the opcode as the bytes that represent it in bytecode,
    /// including any immediate.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = vec![self.as_byte()];
        if let Self::Push { size, value } = self {
            let word = value.bytes_be();
            bytes.extend_from_slice(&word[WORD_SIZE_BYTES - *size as usize..]);
        }

        bytes
    }

    /// Gets the number of bytes the opcode occupies in bytecode.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::Push { size, .. } => 1 + *size as usize,
            _ => 1,
        }
    }

    /// Checks whether execution can never continue to the next instruction
    /// after this opcode.
    #[must_use]
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Self::Stop
                | Self::Return
                | Self::Revert
                | Self::Invalid(_)
                | Self::SelfDestruct
                | Self::Jump
        )
    }

    /// Checks whether the opcode is `JUMP` or `JUMPI`.
    #[must_use]
    pub fn is_jump(&self) -> bool {
        matches!(self, Self::Jump | Self::JumpI)
    }

    /// Gets the immediate value of a `PUSH` opcode, treating `PUSH0` as pushing
    /// zero.
    #[must_use]
    pub fn push_value(&self) -> Option<KnownWord> {
        match self {
            Self::Push0 => Some(KnownWord::zero()),
            Self::Push { value, .. } => Some(*value),
            _ => None,
        }
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Push { value, .. } => write!(f, "{} {value}", self.as_text_code()),
            Self::Invalid(byte) => write!(f, "INVALID({byte:#04x})"),
            _ => write!(f, "{}", self.as_text_code()),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{error::disassembly::Error, opcode::Opcode, value::known::KnownWord};

    #[test]
    fn can_construct_push_with_valid_payload() -> anyhow::Result<()> {
        let push = Opcode::push(2, &[0x01, 0x02])?;
        assert_eq!(push.as_byte(), 0x61);
        assert_eq!(push.encode(), vec![0x61, 0x01, 0x02]);
        assert_eq!(push.size(), 3);
        assert_eq!(push.push_value(), Some(KnownWord::from(0x0102usize)));
        assert_eq!(push.to_string(), "PUSH2 0x102");

        Ok(())
    }

    #[test]
    fn rejects_invalid_push_sizes_and_payloads() {
        assert_eq!(
            Opcode::push(33, &[0; 33]).expect_err("Accepted an oversized push"),
            Error::InvalidPushSize(33)
        );
        assert_eq!(
            Opcode::push(2, &[0x01]).expect_err("Accepted a short payload"),
            Error::InvalidPushPayload { size: 2, actual: 1 }
        );
    }

    #[test]
    fn rejects_out_of_range_stack_items_and_topics() {
        Opcode::dup(0).expect_err("Accepted DUP0");
        Opcode::dup(17).expect_err("Accepted DUP17");
        Opcode::swap(17).expect_err("Accepted SWAP17");
        assert_eq!(
            Opcode::log(5).expect_err("Accepted LOG5"),
            Error::InvalidTopicCount(5)
        );
    }

    #[test]
    fn reports_stack_arity() -> anyhow::Result<()> {
        assert_eq!(Opcode::Call.arg_count(), 7);
        assert_eq!(Opcode::Call.ret_count(), 1);
        assert_eq!(Opcode::log(3)?.arg_count(), 5);
        assert_eq!(Opcode::log(3)?.ret_count(), 0);
        assert_eq!(Opcode::dup(4)?.arg_count(), 4);
        assert_eq!(Opcode::swap(2)?.arg_count(), 3);
        assert_eq!(Opcode::JumpI.arg_count(), 2);
        assert_eq!(Opcode::JumpDest.arg_count(), 0);

        Ok(())
    }

    #[test]
    fn classifies_control_flow() {
        assert!(Opcode::Jump.is_terminator());
        assert!(!Opcode::JumpI.is_terminator());
        assert!(Opcode::JumpI.is_jump());
        assert!(Opcode::Invalid(0xfe).is_terminator());
        assert!(!Opcode::JumpDest.is_jump());
    }
}
