//! This module contains the jump solver, which completes the control-flow
//! graph by discovering the destinations of jumps that are not known from the
//! bytecode alone.
//!
//! The solver alternates between two phases until no more edges are found:
//!
//! 1. Running the dataflow [`Analysis`] over the current graph to compute the
//!    abstract state before every jump.
//! 2. Classifying every jump from its state and adding an edge to each
//!    `JUMPDEST` that the value on top of the stack may refer to.
//!
//! Edges are only ever added, and there are finitely many of them, so the
//! outer loop always terminates.

pub mod report;

use std::collections::{BTreeMap, BTreeSet};

use num_bigint::BigInt;
use petgraph::graph::NodeIndex;

use crate::{
    cfg::{EdgeKind, EvmCfg},
    constant::{
        DEFAULT_LINK_UNSOUND_JUMPS_TO_ALL_JUMPDEST,
        DEFAULT_MAX_SOLVER_ROUNDS,
        DEFAULT_STACK_SET_BOUND,
    },
    fixpoint::{self, Analysis, AnalysisResult},
    solver::report::JumpReport,
    state::{transfer::EvmTransfer, EvmAbstractState},
    value::Interval,
};

/// The configuration for the jump solver.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// The number of distinct stacks tracked at a program point before they
    /// are merged into one.
    ///
    /// Defaults to [`DEFAULT_STACK_SET_BOUND`].
    pub stack_set_bound: usize,

    /// Whether jumps whose destination cannot be determined are linked to
    /// every `JUMPDEST` in the contract.
    ///
    /// This trades precision for a graph that contains every feasible path.
    ///
    /// Defaults to [`DEFAULT_LINK_UNSOUND_JUMPS_TO_ALL_JUMPDEST`].
    pub link_unsound_jumps_to_all_jumpdest: bool,

    /// The maximum number of rounds of edge discovery.
    ///
    /// Defaults to [`DEFAULT_MAX_SOLVER_ROUNDS`].
    pub max_rounds: usize,

    /// The configuration for the dataflow analysis run in each round.
    pub fixpoint: fixpoint::Config,
}

impl Config {
    /// Sets the `stack_set_bound` config parameter to `value`.
    #[must_use]
    pub fn with_stack_set_bound(mut self, value: usize) -> Self {
        self.stack_set_bound = value;
        self
    }

    /// Sets the `link_unsound_jumps_to_all_jumpdest` config parameter to
    /// `value`.
    #[must_use]
    pub fn with_link_unsound_jumps_to_all_jumpdest(mut self, value: bool) -> Self {
        self.link_unsound_jumps_to_all_jumpdest = value;
        self
    }

    /// Sets the `max_rounds` config parameter to `value`.
    #[must_use]
    pub fn with_max_rounds(mut self, value: usize) -> Self {
        self.max_rounds = value;
        self
    }

    /// Sets the `fixpoint` config parameter to `value`.
    #[must_use]
    pub fn with_fixpoint(mut self, value: fixpoint::Config) -> Self {
        self.fixpoint = value;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        let stack_set_bound = DEFAULT_STACK_SET_BOUND;
        let link_unsound_jumps_to_all_jumpdest = DEFAULT_LINK_UNSOUND_JUMPS_TO_ALL_JUMPDEST;
        let max_rounds = DEFAULT_MAX_SOLVER_ROUNDS;
        let fixpoint = fixpoint::Config::default();
        Self {
            stack_set_bound,
            link_unsound_jumps_to_all_jumpdest,
            max_rounds,
            fixpoint,
        }
    }
}

/// The classification of the jumps in a graph from a single run of the
/// dataflow analysis.
///
/// A jump appears in at most one of `unreachable` and `maybe_unsound`, and a
/// jump in either of them has no entry in `targets` unless the solver links
/// unknown jumps to every `JUMPDEST`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Round {
    /// Jumps whose pre-state is bottom.
    pub unreachable: BTreeSet<NodeIndex>,

    /// Jumps whose pre-state is top.
    pub maybe_unsound: BTreeSet<NodeIndex>,

    /// Jumps where some stack has an unknown value on top, or where no
    /// `JUMPDEST` matches any of the values on top.
    pub unsound: BTreeSet<NodeIndex>,

    /// The values on top of each possible stack before each reachable jump.
    pub observed: BTreeMap<NodeIndex, Vec<Interval>>,

    /// The `JUMPDEST`s each jump may transfer control to.
    pub targets: BTreeMap<NodeIndex, BTreeSet<NodeIndex>>,
}

impl Round {
    /// Gets the edges implied by the targets of the round that are not yet
    /// part of `cfg`.
    #[must_use]
    pub fn pending_edges(&self, cfg: &EvmCfg) -> Vec<(NodeIndex, NodeIndex, EdgeKind)> {
        self.targets
            .iter()
            .flat_map(|(jump, targets)| {
                let kind = EvmCfg::jump_edge_kind(cfg.statement(*jump).opcode);
                targets.iter().map(move |target| (*jump, *target, kind))
            })
            .filter(|(from, to, kind)| !cfg.contains_edge(*from, *to, *kind))
            .collect()
    }
}

/// The outcome of solving a graph: the final classification of its jumps and
/// the states computed over the completed graph.
#[derive(Clone, Debug)]
pub struct Solution {
    pub report: JumpReport,
    pub states: AnalysisResult<EvmAbstractState>,
}

/// The jump solver itself.
#[derive(Clone, Debug, Default)]
pub struct JumpSolver {
    config: Config,
}

impl JumpSolver {
    /// Creates a new solver with the provided `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Gets the configuration of the solver.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the dataflow analysis over `cfg` as it currently stands, starting
    /// from the state at the beginning of execution.
    #[must_use]
    pub fn analyze(&self, cfg: &EvmCfg) -> AnalysisResult<EvmAbstractState> {
        let initial = EvmAbstractState::initial(self.config.stack_set_bound);
        Analysis::new(self.config.fixpoint, EvmTransfer).run(cfg, initial)
    }

    /// Classifies every jump in `cfg` that was not linked at construction,
    /// based on the `states` computed for it.
    #[must_use]
    pub fn classify(&self, cfg: &EvmCfg, states: &AnalysisResult<EvmAbstractState>) -> Round {
        let jumpdests: Vec<(BigInt, NodeIndex)> = cfg
            .jumpdests()
            .iter()
            .map(|node| (BigInt::from(cfg.statement(*node).offset), *node))
            .collect();
        let mut round = Round::default();

        for jump in cfg.jumps().difference(cfg.pushed_jumps()) {
            let frame = match states.state_before(*jump) {
                EvmAbstractState::Bottom => {
                    round.unreachable.insert(*jump);
                    continue;
                }
                EvmAbstractState::Top => {
                    round.maybe_unsound.insert(*jump);
                    continue;
                }
                EvmAbstractState::Value(frame) => frame,
            };

            let mut observed = Vec::new();
            let mut targets = BTreeSet::new();
            let mut unknown = false;
            for top in frame.stacks().tops() {
                match top {
                    None | Some(Interval::Top) => unknown = true,
                    Some(value) => {
                        // An imprecise destination still links every JUMPDEST it covers.
                        unknown |= !value.is_singleton();
                        targets.extend(
                            jumpdests
                                .iter()
                                .filter(|(offset, _)| value.contains(offset))
                                .map(|(_, node)| *node),
                        );
                        observed.push(value);
                    }
                }
            }

            if unknown || targets.is_empty() {
                round.unsound.insert(*jump);
            }
            if !targets.is_empty() {
                round.targets.insert(*jump, targets);
            }
            round.observed.insert(*jump, observed);
        }

        if self.config.link_unsound_jumps_to_all_jumpdest {
            let everywhere: BTreeSet<NodeIndex> = cfg.jumpdests().clone();
            for jump in round.unsound.iter().chain(&round.maybe_unsound) {
                round.targets.insert(*jump, everywhere.clone());
            }
        }

        round
    }

    /// Adds the edges discovered by `round` to `cfg`, returning the number of
    /// edges that were new.
    pub fn link(&self, cfg: &mut EvmCfg, round: &Round) -> usize {
        let mut added = 0;
        for (from, to, kind) in round.pending_edges(cfg) {
            if cfg.add_edge(from, to, kind) {
                added += 1;
            }
        }
        added
    }

    /// Completes `cfg` by repeatedly analysing it and adding the jump edges
    /// that the analysis discovers, until no new edges are found.
    ///
    /// The graph is modified in place. The returned solution describes the
    /// final graph.
    pub fn solve(&self, cfg: &mut EvmCfg) -> Solution {
        let mut rounds = 0;
        let mut edges_added = 0;

        loop {
            let states = self.analyze(cfg);
            rounds += 1;
            if !states.converged() {
                tracing::warn!(round = rounds, "Dataflow analysis stopped before converging");
            }

            let round = self.classify(cfg, &states);
            let new_edges = self.link(cfg, &round);
            edges_added += new_edges;

            tracing::debug!(
                round = rounds,
                edges_added = new_edges,
                unreachable = round.unreachable.len(),
                maybe_unsound = round.maybe_unsound.len(),
                unsound = round.unsound.len(),
                "Finished jump resolution round"
            );

            let fixpoint_reached = new_edges == 0;
            if fixpoint_reached || rounds >= self.config.max_rounds {
                // The states must describe the graph being reported on.
                let (states, round) = if fixpoint_reached {
                    (states, round)
                } else {
                    tracing::warn!(
                        max_rounds = self.config.max_rounds,
                        "Jump resolution hit the round limit"
                    );
                    let states = self.analyze(cfg);
                    let round = self.classify(cfg, &states);
                    (states, round)
                };

                for jump in &round.unsound {
                    tracing::warn!(pc = cfg.statement(*jump).offset, "Unsound jump");
                }
                for jump in &round.maybe_unsound {
                    tracing::warn!(pc = cfg.statement(*jump).offset, "Maybe unsound jump");
                }

                let report = JumpReport::new(cfg, &round, rounds, edges_added, fixpoint_reached);
                return Solution { report, states };
            }
        }
    }
}
