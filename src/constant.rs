//! This module contains constants that are needed throughout the codebase.

/// The base byte value for the `PUSH` opcode, for `N > 0`.
///
/// This is constructed such that for `PUSHN`, `PUSH_OPCODE_BASE_VALUE` + `N`
/// equals the byte value for the corresponding `PUSH` opcode.
pub const PUSH_OPCODE_BASE_VALUE: u8 = 0x5f;

/// The base byte value for the `DUP` opcode.
///
/// This is constructed such that for `DUPN`, `DUP_OPCODE_BASE_VALUE` + `N`
/// equals the byte value for the corresponding `DUP` opcode.
pub const DUP_OPCODE_BASE_VALUE: u8 = 0x7f;

/// The base byte value for the `SWAP` opcode.
///
/// This is constructed such that for `SWAPN`, `SWAP_OPCODE_BASE_VALUE` + `N`
/// equals the byte value for the corresponding `SWAP` opcode.
pub const SWAP_OPCODE_BASE_VALUE: u8 = 0x8f;

/// The base byte value for the `LOG` opcode.
///
/// This is constructed such that for `LOGN`, `LOG_OPCODE_BASE_VALUE` + `N`
/// equals the byte value for the corresponding `LOG` opcode.
pub const LOG_OPCODE_BASE_VALUE: u8 = 0xa0;

/// The maximum number of bytes that can be pushed at once using the `PUSH`
/// opcode.
pub const PUSH_OPCODE_MAX_BYTES: u8 = 32;

/// The maximum number of items that can be duplicated or swapped by the `DUP`
/// and `SWAP` families of opcodes.
pub const DUP_SWAP_MAX_DEPTH: u8 = 16;

/// The maximum number of topics that can be attached to a `LOG` opcode.
pub const LOG_MAX_TOPICS: u8 = 4;

/// The maximum stack depth for the EVM.
pub const MAXIMUM_STACK_DEPTH: usize = 1024;

/// The width of word on the EVM in bits.
pub const WORD_SIZE_BITS: usize = 256;

/// The width of a byte on the EVM (and most other places) in bits.
pub const BYTE_SIZE_BITS: usize = 8;

/// The width of a word on the EVM in bytes.
pub const WORD_SIZE_BYTES: usize = WORD_SIZE_BITS / BYTE_SIZE_BITS;

/// The default maximum number of distinct abstract stacks that are kept apart
/// at a single program point before they are merged into one.
pub const DEFAULT_STACK_SET_BOUND: usize = 8;

/// The default number of times the pre-state of a program point may grow by
/// join before the dataflow engine switches to widening for that point.
pub const DEFAULT_WIDENING_THRESHOLD: usize = 5;

/// The default maximum number of worklist steps that the dataflow engine will
/// take before giving up on convergence.
pub const DEFAULT_MAX_FIXPOINT_ITERATIONS: usize = 1_000_000;

/// The default maximum number of outer rounds of edge discovery performed by
/// the jump solver.
pub const DEFAULT_MAX_SOLVER_ROUNDS: usize = 128;

/// The default value for whether jumps whose target is a literal pushed
/// directly before them are linked while the CFG is built.
pub const DEFAULT_LINK_PUSHED_JUMPS: bool = true;

/// The default value for whether jumps with an unknown target are linked to
/// every `JUMPDEST` in the contract.
pub const DEFAULT_LINK_UNSOUND_JUMPS_TO_ALL_JUMPDEST: bool = false;
