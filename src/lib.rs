//! This library implements an analysis of [EVM](https://ethereum.org/en/developers/docs/evm/)
//! bytecode that aims to discover the destination of every `JUMP` and `JUMPI`
//! in the contract being studied, and hence its complete control-flow graph.
//!
//! The analysis is an abstract interpretation. It is sound with respect to the
//! jumps it reports as resolved, and reports every jump it cannot resolve
//! rather than failing.
//!
//! # How it Works
//!
//! From a very high level, the jump resolution process is performed as
//! follows:
//!
//! 1. Bytecode is ingested and turned into an
//!    [`disassembly::InstructionStream`]. This is a sequence of
//!    [`opcode::Opcode`]s, each tagged with its program counter.
//! 2. The instructions are assembled into an [`cfg::EvmCfg`] that contains
//!    every edge that can be known without analysis: fall-through edges, and
//!    the edges of jumps whose destination is pushed immediately before them.
//! 3. The [`solver::JumpSolver`] runs a [`fixpoint::Analysis`] over the graph,
//!    computing an [`state::EvmAbstractState`] before each instruction. These
//!    states track a bounded set of possible stacks of
//!    [`value::Interval`]s, along with the contents of memory.
//! 4. The value on top of the stack before each remaining jump is used to
//!    link it to the `JUMPDEST`s it may target. Steps 3 and 4 repeat until no
//!    new edges are discovered.
//! 5. The jumps are classified into a [`solver::report::JumpReport`] that can
//!    then be output.
//!
//! # Basic Usage
//!
//! For the most basic usage of the library, it is sufficient to construct a
//! resolver and call the `.analyze` method, passing your contract.
//!
//! ```
//! use std::collections::BTreeSet;
//!
//! use evm_jump_resolver as ejr;
//! use evm_jump_resolver::{
//!     bytecode,
//!     cfg,
//!     opcode::Opcode,
//!     resolver::contract::Contract,
//!     solver,
//! };
//!
//! let bytes = bytecode![
//!     Opcode::push(1, &[0x06]).unwrap(), // The address to return to
//!     Opcode::push(1, &[0x08]).unwrap(), // The address of the function
//!     Opcode::Jump,                      // Call the function
//!     Opcode::Invalid(0xfe),             // Padding
//!     Opcode::JumpDest,                  // The return address
//!     Opcode::Stop,                      // Finish execution
//!     Opcode::JumpDest,                  // The function
//!     Opcode::Jump                       // Return from the function
//! ];
//!
//! let contract = Contract::new(bytes);
//! let resolver = ejr::new(contract, cfg::Config::default(), solver::Config::default())
//!     .analyze()
//!     .unwrap();
//!
//! let report = resolver.report();
//! assert_eq!(report.pushed_jumps, BTreeSet::from([0x04]));
//! assert_eq!(report.resolved_jumps[&0x09], BTreeSet::from([0x06]));
//! assert!(report.unsound_jumps.is_empty());
//! ```

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming

pub mod cfg;
pub mod constant;
pub mod disassembly;
pub mod error;
pub mod fixpoint;
pub mod lattice;
pub mod opcode;
pub mod resolver;
pub mod solver;
pub mod state;
pub mod value;

// Re-exports to provide the library interface.
pub use resolver::new;
