//! This module contains useful macros for working with bytecode and opcodes.

/// Constructs a bytecode input from the input instructions as literal opcodes.
///
/// # Usage
///
/// ```
/// use evm_jump_resolver::{bytecode, opcode::Opcode};
///
/// let bytes = bytecode![
///     Opcode::push(1, &[0x03]).unwrap(),
///     Opcode::Jump,
///     Opcode::JumpDest,
///     Opcode::Stop,
/// ];
///
/// assert_eq!(bytes, vec![0x60, 0x03, 0x56, 0x5b, 0x00]);
/// ```
#[macro_export]
macro_rules! bytecode {
    ($($opcode:expr),*$(,)?) => {{
        let mut vec: Vec<u8> = vec![];
        $(vec.extend($crate::opcode::Opcode::encode(&$opcode));)*
        vec
    }};
}

// Export it scoped
pub use bytecode;
