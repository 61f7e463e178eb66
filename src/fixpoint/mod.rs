//! A forward worklist dataflow engine over the control-flow graph.
//!
//! The engine computes, for each node, an over-approximation of the state
//! before and after it executes. Successor states are joined, and once a node
//! has been updated more than [`Config::widening_threshold`] times its state is
//! widened instead, which guarantees termination on the domains used here.

use std::collections::{BTreeSet, HashMap, VecDeque};

use petgraph::graph::NodeIndex;

use crate::{
    cfg::{EdgeKind, EvmCfg, Statement},
    constant::{DEFAULT_MAX_FIXPOINT_ITERATIONS, DEFAULT_WIDENING_THRESHOLD},
    lattice::{BoundedLattice, Lattice},
};

/// The configuration for the dataflow engine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// The number of times a node's state may grow by joining before it is
    /// widened instead.
    ///
    /// Defaults to [`DEFAULT_WIDENING_THRESHOLD`].
    pub widening_threshold: usize,

    /// The number of node visits after which the engine gives up and returns
    /// the states it has computed so far.
    ///
    /// Defaults to [`DEFAULT_MAX_FIXPOINT_ITERATIONS`].
    pub max_iterations: usize,
}

impl Config {
    /// Sets the `widening_threshold` config parameter to `value`.
    #[must_use]
    pub fn with_widening_threshold(mut self, value: usize) -> Self {
        self.widening_threshold = value;
        self
    }

    /// Sets the `max_iterations` config parameter to `value`.
    #[must_use]
    pub fn with_max_iterations(mut self, value: usize) -> Self {
        self.max_iterations = value;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        let widening_threshold = DEFAULT_WIDENING_THRESHOLD;
        let max_iterations = DEFAULT_MAX_FIXPOINT_ITERATIONS;
        Self {
            widening_threshold,
            max_iterations,
        }
    }
}

/// The semantics that the engine propagates through the graph.
pub trait Transfer {
    /// The abstract state at each program point.
    type Value: BoundedLattice;

    /// Computes the state after `statement` executes in the state `before`.
    fn apply(&self, statement: &Statement, before: &Self::Value) -> Self::Value;

    /// Computes the state that flows along an `edge` of the given kind out of
    /// `statement`, given the states `before` and `after` it executes.
    fn propagate(
        &self,
        statement: &Statement,
        edge: EdgeKind,
        before: &Self::Value,
        after: &Self::Value,
    ) -> Self::Value;
}

/// The engine itself, pairing a configuration with the semantics to compute.
#[derive(Clone, Debug)]
pub struct Analysis<T: Transfer> {
    config: Config,
    transfer: T,
}

impl<T: Transfer> Analysis<T> {
    /// Creates a new engine that computes `transfer` with `config`.
    pub fn new(config: Config, transfer: T) -> Self {
        Self { config, transfer }
    }

    /// Computes the fixpoint over `cfg`, starting with `initial` at the entry.
    pub fn run(&self, cfg: &EvmCfg, initial: T::Value) -> AnalysisResult<T::Value> {
        let mut result = AnalysisResult::new();
        let Some(entry) = cfg.entry() else {
            return result;
        };

        let mut updates: HashMap<NodeIndex, usize> = HashMap::new();
        let mut worklist = VecDeque::from([entry]);
        let mut queued = BTreeSet::from([entry]);
        result.before.insert(entry, initial);

        while let Some(node) = worklist.pop_front() {
            queued.remove(&node);
            if result.iterations >= self.config.max_iterations {
                tracing::warn!(
                    max_iterations = self.config.max_iterations,
                    "Dataflow analysis did not converge"
                );
                result.converged = false;
                break;
            }
            result.iterations += 1;

            let statement = cfg.statement(node);
            let before = result.state_before(node).clone();
            let after = self.transfer.apply(statement, &before);

            for (successor, edge) in cfg.successors(node) {
                let value = self.transfer.propagate(statement, edge, &before, &after);
                if value.is_bottom() {
                    continue;
                }

                let joined = match result.before.get(&successor) {
                    None => value,
                    Some(old) if value.less_or_equal(old) => continue,
                    Some(old) => {
                        let count = updates.entry(successor).or_default();
                        *count += 1;
                        if *count > self.config.widening_threshold {
                            old.widening(&value)
                        } else {
                            old.lub(&value)
                        }
                    }
                };
                result.before.insert(successor, joined);
                if queued.insert(successor) {
                    worklist.push_back(successor);
                }
            }

            result.after.insert(node, after);
        }

        tracing::debug!(
            iterations = result.iterations,
            converged = result.converged,
            "Dataflow analysis finished"
        );

        result
    }
}

/// The states computed by a run of the [`Analysis`].
#[derive(Clone, Debug)]
pub struct AnalysisResult<V> {
    before: HashMap<NodeIndex, V>,
    after: HashMap<NodeIndex, V>,
    bottom: V,
    iterations: usize,
    converged: bool,
}

impl<V: BoundedLattice> AnalysisResult<V> {
    fn new() -> Self {
        Self {
            before: HashMap::new(),
            after: HashMap::new(),
            bottom: V::bottom(),
            iterations: 0,
            converged: true,
        }
    }

    /// Gets the state before `node` executes, which is bottom if the node was
    /// never reached.
    #[must_use]
    pub fn state_before(&self, node: NodeIndex) -> &V {
        self.before.get(&node).unwrap_or(&self.bottom)
    }

    /// Gets the state after `node` executes, which is bottom if the node was
    /// never reached.
    #[must_use]
    pub fn state_after(&self, node: NodeIndex) -> &V {
        self.after.get(&node).unwrap_or(&self.bottom)
    }

    /// Gets the number of node visits the analysis performed.
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Checks whether the analysis reached a fixpoint rather than hitting the
    /// iteration limit.
    #[must_use]
    pub fn converged(&self) -> bool {
        self.converged
    }
}
