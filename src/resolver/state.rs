//! This module contains the state tracking functionality for the resolver.

use std::fmt::Debug;

use crate::{
    cfg,
    cfg::EvmCfg,
    disassembly::InstructionStream,
    fixpoint::AnalysisResult,
    solver,
    solver::report::{JumpReport, JumpStatistics},
    state::EvmAbstractState,
};

/// A marker trait that says that the type implementing it is a resolver
/// state.
///
/// Resolver states can be transitioned between as part of the
/// [`crate::resolver::Resolver`] state machine, and are intended to enforce
/// that correct state transitions take place.
pub trait State
where
    Self: Debug + Sized,
{
}

/// The initial state for the resolver.
#[derive(Debug)]
pub struct HasContract {
    /// The configuration for building the control-flow graph.
    pub cfg_config: cfg::Config,

    /// The configuration for the jump solver.
    pub solver_config: solver::Config,
}
impl State for HasContract {}

/// The state for a resolver that has successfully disassembled the bytecode.
#[derive(Debug)]
pub struct DisassemblyComplete {
    /// The disassembled bytecode for the contract being analyzed.
    pub instructions: InstructionStream,

    /// The configuration for building the control-flow graph.
    pub cfg_config: cfg::Config,

    /// The configuration for the jump solver.
    pub solver_config: solver::Config,
}
impl State for DisassemblyComplete {}

/// The resolver has built the control-flow graph, with only the edges known
/// from the bytecode alone.
#[derive(Debug)]
pub struct CfgReady {
    /// The disassembled bytecode for the contract being analyzed.
    pub instructions: InstructionStream,

    /// The incomplete control-flow graph.
    pub cfg: EvmCfg,

    /// The configuration for the jump solver.
    pub solver_config: solver::Config,
}
impl State for CfgReady {}

/// The resolver has completed the control-flow graph and is ready to provide
/// the results.
#[derive(Debug)]
pub struct SolvingComplete {
    /// The disassembled bytecode for the contract being analyzed.
    pub instructions: InstructionStream,

    /// The control-flow graph with every discovered jump edge.
    pub cfg: EvmCfg,

    /// The classification of the contract's jumps.
    pub report: JumpReport,

    /// The summary of the classification.
    pub statistics: JumpStatistics,

    /// The abstract states computed over the completed graph.
    pub states: AnalysisResult<EvmAbstractState>,
}
impl State for SolvingComplete {}
