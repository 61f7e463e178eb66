//! This module contains the definition of the resolver itself.

pub mod contract;
pub mod state;

use std::time::Instant;

use crate::{
    cfg,
    cfg::EvmCfg,
    disassembly::InstructionStream,
    error,
    error::{analysis, container::Locatable},
    fixpoint::AnalysisResult,
    resolver::{contract::Contract, state::State},
    solver,
    solver::{
        report::{JumpReport, JumpStatistics},
        JumpSolver,
    },
    state::EvmAbstractState,
};

/// Creates a new resolver wrapping the provided `contract`, and with the
/// provided `cfg_config` and `solver_config`.
#[must_use]
pub fn new(
    contract: Contract,
    cfg_config: cfg::Config,
    solver_config: solver::Config,
) -> Resolver<state::HasContract> {
    let state = state::HasContract {
        cfg_config,
        solver_config,
    };
    Resolver { contract, state }
}

/// The core of the jump analysis, the `Resolver` is responsible for ingesting
/// user data and outputting a control-flow graph with its jumps resolved.
///
/// # Enforcing Valid State Transitions
///
/// The resolver enforces that only correct state transitions can occur through
/// use of structs that implement the exact state required by it at any given
/// point.
///
/// There is the [`Self::state`] function that provides access to the state data
/// of whichever state the resolver is currently in.
#[derive(Debug)]
pub struct Resolver<S: State> {
    /// The contract that is being analyzed.
    contract: Contract,

    /// The internal state of the resolver.
    state: S,
}

/// The safe operations available in all states.
impl<S: State> Resolver<S> {
    /// Gets a reference to the contract being analyzed.
    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    /// Gets an immutable reference to the current state of the resolver.
    pub fn state(&self) -> &S {
        &self.state
    }
}

/// Unsafe operations available in all states.
///
/// These operations are capable of **violating the state invariants** of the
/// resolver, and must be used with the _utmost_ care.
impl<S: State> Resolver<S> {
    /// Gets a mutable reference to the current state of the resolver.
    ///
    /// # Safety
    ///
    /// Do not mutate the state instance unless you totally understand the
    /// state that the resolver is in, and the implications of doing so.
    pub unsafe fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Forces the resolver into the state `NS`, with the value of the state
    /// created by applying `transform` to the resolver's current state and
    /// disregarding any safety with regard to state transitions.
    ///
    /// # Safety
    ///
    /// Do not force a state transition for the resolver unless you totally
    /// understand the state that the resolver is in, and the implications of
    /// doing so.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the provided `transform` returns [`Err`].
    pub unsafe fn transform_state<NS: State>(
        self,
        transform: impl FnOnce(S) -> error::Result<NS>,
    ) -> error::Result<Resolver<NS>> {
        let state = transform(self.state)?;
        let contract = self.contract;

        Ok(Resolver { contract, state })
    }
}

/// A type that allows the user to easily name the initial state of the
/// resolver.
pub type InitialResolver = Resolver<state::HasContract>;

/// A type that allows the user to easily name the final state of the resolver.
pub type SolvedResolver = Resolver<state::SolvingComplete>;

/// Operations available on a newly-created resolver.
impl Resolver<state::HasContract> {
    /// Executes the analysis process from beginning to end, performing all the
    /// intermediate steps automatically and returning the solved resolver.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if any step in the process fails.
    pub fn analyze(self) -> error::Result<SolvedResolver> {
        let resolver = self.disassemble()?;
        let resolver = resolver.build_cfg()?;
        let resolver = resolver.solve()?;

        Ok(resolver)
    }

    /// Performs the disassembly process to turn the input contract code into
    /// instructions.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if disassembly fails.
    pub fn disassemble(self) -> error::Result<Resolver<state::DisassemblyComplete>> {
        let instructions = InstructionStream::try_from(self.contract.bytecode().as_slice())?;
        unsafe {
            self.transform_state(|old_state| {
                Ok(state::DisassemblyComplete {
                    instructions,
                    cfg_config: old_state.cfg_config,
                    solver_config: old_state.solver_config,
                })
            })
        }
    }
}

/// Operations available on a resolver that has completed the disassembly of
/// the bytecode.
impl Resolver<state::DisassemblyComplete> {
    /// Builds the control-flow graph of the disassembled instructions,
    /// containing every edge that is known without analysis.
    ///
    /// # Errors
    ///
    /// Returns [`Err`] if the graph has no entry point.
    pub fn build_cfg(self) -> error::Result<Resolver<state::CfgReady>> {
        unsafe {
            self.transform_state(|old_state| {
                let cfg = EvmCfg::new(&old_state.instructions, old_state.cfg_config);
                if cfg.entry().is_none() {
                    return Err(analysis::Error::MissingEntry.locate(0).into());
                }

                Ok(state::CfgReady {
                    instructions: old_state.instructions,
                    cfg,
                    solver_config: old_state.solver_config,
                })
            })
        }
    }
}

/// Operations available on a resolver that has built the control-flow graph.
impl Resolver<state::CfgReady> {
    /// Gets the control-flow graph before any jumps have been resolved.
    #[must_use]
    pub fn cfg(&self) -> &EvmCfg {
        &self.state.cfg
    }

    /// Runs the jump solver over the control-flow graph until no more edges
    /// can be discovered.
    ///
    /// # Errors
    ///
    /// Unresolved jumps are reported rather than being treated as errors, so
    /// this only fails if the state transition itself fails.
    pub fn solve(self) -> error::Result<Resolver<state::SolvingComplete>> {
        unsafe {
            self.transform_state(|mut old_state| {
                let solver = JumpSolver::new(old_state.solver_config);
                let start = Instant::now();
                let solution = solver.solve(&mut old_state.cfg);
                let statistics =
                    JumpStatistics::from_report(&solution.report, &old_state.cfg, start.elapsed());

                tracing::debug!(
                    total_jumps = statistics.total_jumps,
                    solved = statistics.total_solved_jumps,
                    time_millis = statistics.time_millis,
                    "Resolved jumps"
                );

                Ok(state::SolvingComplete {
                    instructions: old_state.instructions,
                    cfg: old_state.cfg,
                    report: solution.report,
                    statistics,
                    states: solution.states,
                })
            })
        }
    }
}

/// Operations available on a resolver that has completed jump resolution.
impl Resolver<state::SolvingComplete> {
    /// Gets the disassembled instructions of the contract.
    #[must_use]
    pub fn instructions(&self) -> &InstructionStream {
        &self.state.instructions
    }

    /// Gets the control-flow graph with every discovered jump edge.
    #[must_use]
    pub fn cfg(&self) -> &EvmCfg {
        &self.state.cfg
    }

    /// Gets the classification of the contract's jumps.
    #[must_use]
    pub fn report(&self) -> &JumpReport {
        &self.state.report
    }

    /// Gets the summary counts for the contract's jumps.
    #[must_use]
    pub fn statistics(&self) -> &JumpStatistics {
        &self.state.statistics
    }

    /// Gets the abstract states computed over the completed graph.
    #[must_use]
    pub fn states(&self) -> &AnalysisResult<EvmAbstractState> {
        &self.state.states
    }

    /// Gets the abstract state before the instruction at `offset` executes.
    ///
    /// # Errors
    ///
    /// If there is no instruction that begins at `offset`.
    pub fn state_before(&self, offset: u32) -> error::Result<&EvmAbstractState> {
        let node = self
            .state
            .cfg
            .node_at(offset)
            .ok_or_else(|| analysis::Error::NoSuchInstruction { offset }.locate(offset))?;
        Ok(self.state.states.state_before(node))
    }

    /// Gets the abstract state after the instruction at `offset` executes.
    ///
    /// # Errors
    ///
    /// If there is no instruction that begins at `offset`.
    pub fn state_after(&self, offset: u32) -> error::Result<&EvmAbstractState> {
        let node = self
            .state
            .cfg
            .node_at(offset)
            .ok_or_else(|| analysis::Error::NoSuchInstruction { offset }.locate(offset))?;
        Ok(self.state.states.state_after(node))
    }
}
