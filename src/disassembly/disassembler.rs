//! This module contains the parser definition for turning a stream of bytes
//! into an [`super::InstructionStream`].
//!
//! # Implementation Note
//!
//! While it might make sense in the future to build a more robust parser based
//! on parser combinators from a library like [`nom`](https://docs.rs/nom), for
//! now it makes sense to stick to a simple system.

use crate::{
    constant::{
        DUP_OPCODE_BASE_VALUE,
        LOG_OPCODE_BASE_VALUE,
        PUSH_OPCODE_BASE_VALUE,
        SWAP_OPCODE_BASE_VALUE,
    },
    disassembly::Instruction,
    error::{
        container::Locatable,
        disassembly::{Error, Result},
    },
    opcode::Opcode,
};

/// Disassembles the input `bytes` into a vector of [`Instruction`]s, each
/// tagged with the byte offset at which it starts.
///
/// # CBOR Metadata
///
/// The disassembly process copes with CBOR metadata by recognising that it will
/// be unreachable during execution unless execution wants to revert as an
/// invalid opcode. To this end, any byte that is unrecognised at the time of
/// disassembly is translated to [`Opcode::Invalid`], and hence will cause the
/// execution to revert if ever actually executed.
///
/// # Errors
///
/// When `bytes` is empty or too large.
pub fn disassemble(bytes: &[u8]) -> Result<Vec<Instruction>> {
    if bytes.is_empty() {
        return Err(Error::EmptyBytecode.locate(0));
    }

    let mut instructions = Vec::with_capacity(bytes.len());
    let mut offset: usize = 0;

    while offset < bytes.len() {
        // We assume bytecodes are far less than [`u32::MAX`] bytes already.
        let location = u32::try_from(offset).map_err(|_| Error::BytecodeTooLarge.locate(u32::MAX))?;
        let byte = bytes[offset];

        if (0x60..=0x7f).contains(&byte) {
            let size = byte - PUSH_OPCODE_BASE_VALUE;
            let start = offset + 1;
            let end = start + size as usize;

            // Solc has generated valid code that ends with an incomplete push, so we have
            // to handle it by treating the unterminated push and all the subsequent bytes
            // as invalid.
            if end > bytes.len() {
                for (i, b) in bytes[offset..].iter().enumerate() {
                    let location = u32::try_from(offset + i)
                        .map_err(|_| Error::BytecodeTooLarge.locate(u32::MAX))?;
                    instructions.push(Instruction::new(location, Opcode::Invalid(*b)));
                }
                break;
            }

            let opcode = Opcode::push(size, &bytes[start..end]).map_err(|e| e.locate(location))?;
            instructions.push(Instruction::new(location, opcode));
            offset = end;
            continue;
        }

        let opcode = decode(byte).map_err(|e| e.locate(location))?;
        instructions.push(Instruction::new(location, opcode));
        offset += 1;
    }

    Ok(instructions)
}

/// Decodes the single-byte opcode `byte`.
///
/// # Errors
///
/// If `byte` is a parameterised opcode whose parameter is out of range.
#[allow(clippy::too_many_lines)] // Splitting the function up brings no benefit
fn decode(byte: u8) -> std::result::Result<Opcode, Error> {
    let opcode = match byte {
        0x00 => Opcode::Stop,
        0x01 => Opcode::Add,
        0x02 => Opcode::Mul,
        0x03 => Opcode::Sub,
        0x04 => Opcode::Div,
        0x05 => Opcode::SDiv,
        0x06 => Opcode::Mod,
        0x07 => Opcode::SMod,
        0x08 => Opcode::AddMod,
        0x09 => Opcode::MulMod,
        0x0a => Opcode::Exp,
        0x0b => Opcode::SignExtend,
        0x10 => Opcode::Lt,
        0x11 => Opcode::Gt,
        0x12 => Opcode::SLt,
        0x13 => Opcode::SGt,
        0x14 => Opcode::Eq,
        0x15 => Opcode::IsZero,
        0x16 => Opcode::And,
        0x17 => Opcode::Or,
        0x18 => Opcode::Xor,
        0x19 => Opcode::Not,
        0x1a => Opcode::Byte,
        0x1b => Opcode::Shl,
        0x1c => Opcode::Shr,
        0x1d => Opcode::Sar,
        0x20 => Opcode::Sha3,
        0x30 => Opcode::Address,
        0x31 => Opcode::Balance,
        0x32 => Opcode::Origin,
        0x33 => Opcode::Caller,
        0x34 => Opcode::CallValue,
        0x35 => Opcode::CallDataLoad,
        0x36 => Opcode::CallDataSize,
        0x37 => Opcode::CallDataCopy,
        0x38 => Opcode::CodeSize,
        0x39 => Opcode::CodeCopy,
        0x3a => Opcode::GasPrice,
        0x3b => Opcode::ExtCodeSize,
        0x3c => Opcode::ExtCodeCopy,
        0x3d => Opcode::ReturnDataSize,
        0x3e => Opcode::ReturnDataCopy,
        0x3f => Opcode::ExtCodeHash,
        0x40 => Opcode::BlockHash,
        0x41 => Opcode::CoinBase,
        0x42 => Opcode::Timestamp,
        0x43 => Opcode::Number,
        0x44 => Opcode::Prevrandao,
        0x45 => Opcode::GasLimit,
        0x46 => Opcode::ChainId,
        0x47 => Opcode::SelfBalance,
        0x48 => Opcode::BaseFee,
        0x49 => Opcode::BlobHash,
        0x4a => Opcode::BlobBaseFee,
        0x50 => Opcode::Pop,
        0x51 => Opcode::MLoad,
        0x52 => Opcode::MStore,
        0x53 => Opcode::MStore8,
        0x54 => Opcode::SLoad,
        0x55 => Opcode::SStore,
        0x56 => Opcode::Jump,
        0x57 => Opcode::JumpI,
        0x58 => Opcode::Pc,
        0x59 => Opcode::MSize,
        0x5a => Opcode::Gas,
        0x5b => Opcode::JumpDest,
        0x5c => Opcode::TLoad,
        0x5d => Opcode::TStore,
        0x5e => Opcode::MCopy,
        0x5f => Opcode::Push0,
        0x80..=0x8f => Opcode::dup(byte - DUP_OPCODE_BASE_VALUE)?,
        0x90..=0x9f => Opcode::swap(byte - SWAP_OPCODE_BASE_VALUE)?,
        0xa0..=0xa4 => Opcode::log(byte - LOG_OPCODE_BASE_VALUE)?,
        0xf0 => Opcode::Create,
        0xf1 => Opcode::Call,
        0xf2 => Opcode::CallCode,
        0xf3 => Opcode::Return,
        0xf4 => Opcode::DelegateCall,
        0xf5 => Opcode::Create2,
        0xfa => Opcode::StaticCall,
        0xfd => Opcode::Revert,
        0xff => Opcode::SelfDestruct,
        // If we don't recognise it, it might be CBOR metadata or something otherwise
        // invalid. They should only be reachable intentionally to cause a revert, so we
        // just translate them to `INVALID`
        _ => Opcode::Invalid(byte),
    };

    Ok(opcode)
}
