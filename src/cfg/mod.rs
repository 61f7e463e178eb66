//! This module contains the control-flow graph over which the jump analysis
//! runs.
//!
//! The graph has one node per instruction. Edges between instructions that
//! follow one another are known from the bytecode alone, as are the targets of
//! jumps whose destination is pushed immediately before them. Every other jump
//! has its outgoing edges discovered by the [`crate::solver::JumpSolver`].

use std::{
    collections::{BTreeSet, HashMap},
    fmt::{Display, Formatter},
};

use petgraph::{
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
    Direction,
};
use serde::{Deserialize, Serialize};

use crate::{
    constant::DEFAULT_LINK_PUSHED_JUMPS,
    disassembly::InstructionStream,
    opcode::Opcode,
};

/// The configuration for building the control-flow graph.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// Whether a `JUMP` or `JUMPI` preceded directly by a `PUSH` of a valid
    /// `JUMPDEST` is linked to that destination while building the graph.
    ///
    /// Defaults to [`DEFAULT_LINK_PUSHED_JUMPS`].
    pub link_pushed_jumps: bool,
}

impl Config {
    /// Sets the `link_pushed_jumps` config parameter to `value`.
    #[must_use]
    pub fn with_link_pushed_jumps(mut self, value: bool) -> Self {
        self.link_pushed_jumps = value;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        let link_pushed_jumps = DEFAULT_LINK_PUSHED_JUMPS;
        Self { link_pushed_jumps }
    }
}

/// A node in the control-flow graph: an opcode tagged with its program counter.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Statement {
    pub offset: u32,
    pub opcode: Opcode,
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#06x}: {}", self.offset, self.opcode)
    }
}

/// The kind of a control-flow edge.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum EdgeKind {
    /// Execution continues to the target unconditionally, either by falling
    /// through or through a `JUMP`.
    Sequential,

    /// The `JUMPI` condition was non-zero and the jump was taken.
    True,

    /// The `JUMPI` condition was zero and execution fell through.
    False,
}

/// The control-flow graph of a contract, with one node per instruction.
#[derive(Clone, Debug)]
pub struct EvmCfg {
    graph: DiGraph<Statement, EdgeKind>,
    by_offset: HashMap<u32, NodeIndex>,
    jumps: BTreeSet<NodeIndex>,
    jumpdests: BTreeSet<NodeIndex>,
    pushed_jumps: BTreeSet<NodeIndex>,
}

impl EvmCfg {
    /// Builds the graph for `instructions`, adding every edge that is known
    /// without analysis.
    #[must_use]
    pub fn new(instructions: &InstructionStream, config: Config) -> Self {
        let mut graph = DiGraph::with_capacity(instructions.len(), instructions.len());
        let mut by_offset = HashMap::with_capacity(instructions.len());
        let mut jumps = BTreeSet::new();
        let mut jumpdests = BTreeSet::new();

        let nodes: Vec<NodeIndex> = instructions
            .iter()
            .map(|instruction| {
                let node = graph.add_node(Statement {
                    offset: instruction.offset,
                    opcode: instruction.opcode,
                });
                by_offset.insert(instruction.offset, node);
                match instruction.opcode {
                    Opcode::Jump | Opcode::JumpI => {
                        jumps.insert(node);
                    }
                    Opcode::JumpDest => {
                        jumpdests.insert(node);
                    }
                    _ => {}
                }
                node
            })
            .collect();

        for pair in nodes.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            match graph[from].opcode {
                Opcode::JumpI => {
                    graph.add_edge(from, to, EdgeKind::False);
                }
                opcode if !opcode.is_terminator() => {
                    graph.add_edge(from, to, EdgeKind::Sequential);
                }
                _ => {}
            }
        }

        let mut cfg = Self {
            graph,
            by_offset,
            jumps,
            jumpdests,
            pushed_jumps: BTreeSet::new(),
        };
        if config.link_pushed_jumps {
            cfg.link_pushed_jumps(&nodes);
        }

        tracing::debug!(
            nodes = cfg.node_count(),
            edges = cfg.edge_count(),
            jumps = cfg.jumps.len(),
            jumpdests = cfg.jumpdests.len(),
            pushed_jumps = cfg.pushed_jumps.len(),
            "Built control-flow graph"
        );

        cfg
    }

    /// Links each jump directly preceded by a push of a valid `JUMPDEST` to
    /// that destination.
    fn link_pushed_jumps(&mut self, nodes: &[NodeIndex]) {
        for pair in nodes.windows(2) {
            let (push, jump) = (pair[0], pair[1]);
            let jump_opcode = self.graph[jump].opcode;
            if !jump_opcode.is_jump() {
                continue;
            }
            let Some(target) = self.graph[push]
                .opcode
                .push_value()
                .and_then(|v| v.as_offset())
                .and_then(|offset| self.jumpdest_at(offset))
            else {
                continue;
            };

            self.add_edge(jump, target, Self::jump_edge_kind(jump_opcode));
            self.pushed_jumps.insert(jump);
        }
    }

    /// Gets the kind of edge from a jump with `opcode` to its destination.
    #[must_use]
    pub fn jump_edge_kind(opcode: Opcode) -> EdgeKind {
        match opcode {
            Opcode::JumpI => EdgeKind::True,
            _ => EdgeKind::Sequential,
        }
    }

    /// Gets the node of the first instruction.
    #[must_use]
    pub fn entry(&self) -> Option<NodeIndex> {
        self.graph.node_indices().next()
    }

    /// Gets the node for the instruction at `offset`, if there is one.
    #[must_use]
    pub fn node_at(&self, offset: u32) -> Option<NodeIndex> {
        self.by_offset.get(&offset).copied()
    }

    /// Gets the node for the `JUMPDEST` at `offset`, if there is one.
    #[must_use]
    pub fn jumpdest_at(&self, offset: u32) -> Option<NodeIndex> {
        self.node_at(offset).filter(|n| self.jumpdests.contains(n))
    }

    /// Gets the statement at `node`.
    ///
    /// # Panics
    ///
    /// If `node` is not a node of this graph. This is a programmer error.
    #[must_use]
    pub fn statement(&self, node: NodeIndex) -> &Statement {
        &self.graph[node]
    }

    /// Iterates over the successors of `node` along with the kind of each
    /// edge.
    pub fn successors(&self, node: NodeIndex) -> impl Iterator<Item = (NodeIndex, EdgeKind)> + '_ {
        self.graph
            .edges_directed(node, Direction::Outgoing)
            .map(|edge| (edge.target(), *edge.weight()))
    }

    /// Checks whether there is an edge of `kind` from `from` to `to`.
    #[must_use]
    pub fn contains_edge(&self, from: NodeIndex, to: NodeIndex, kind: EdgeKind) -> bool {
        self.successors(from).any(|(target, k)| target == to && k == kind)
    }

    /// Adds an edge of `kind` from `from` to `to`, returning `true` if the
    /// edge was not already present.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, kind: EdgeKind) -> bool {
        if self.contains_edge(from, to, kind) {
            return false;
        }
        self.graph.add_edge(from, to, kind);
        true
    }

    /// Gets the targets of the edges out of `jump` that leave for a jump
    /// destination rather than falling through.
    #[must_use]
    pub fn jump_targets(&self, jump: NodeIndex) -> BTreeSet<NodeIndex> {
        let kind = Self::jump_edge_kind(self.statement(jump).opcode);
        self.successors(jump)
            .filter(|(_, k)| *k == kind)
            .map(|(target, _)| target)
            .collect()
    }

    /// Gets the number of edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Gets the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Gets every `JUMP` and `JUMPI` node.
    #[must_use]
    pub fn jumps(&self) -> &BTreeSet<NodeIndex> {
        &self.jumps
    }

    /// Gets every `JUMPDEST` node.
    #[must_use]
    pub fn jumpdests(&self) -> &BTreeSet<NodeIndex> {
        &self.jumpdests
    }

    /// Gets the jumps that were linked to a pushed destination when the graph
    /// was built.
    #[must_use]
    pub fn pushed_jumps(&self) -> &BTreeSet<NodeIndex> {
        &self.pushed_jumps
    }

    /// Renders the graph in the Graphviz `dot` format.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let nodes = self
            .graph
            .node_indices()
            .map(|node| format!("    n{} [label=\"{}\"];\n", node.index(), self.graph[node]));
        let edges = self.graph.raw_edges().iter().map(|edge| {
            format!(
                "    n{} -> n{} [label=\"{:?}\"];\n",
                edge.source().index(),
                edge.target().index(),
                edge.weight
            )
        });

        format!("digraph cfg {{\n{}}}", nodes.chain(edges).collect::<String>())
    }
}

#[cfg(test)]
mod test {
    use crate::{
        cfg::{Config, EdgeKind, EvmCfg},
        disassembly::InstructionStream,
        opcode::{macros::bytecode, Opcode},
    };

    fn build(bytes: &[u8], config: Config) -> anyhow::Result<EvmCfg> {
        let instructions = InstructionStream::try_from(bytes)?;
        Ok(EvmCfg::new(&instructions, config))
    }

    #[test]
    fn links_sequential_instructions() -> anyhow::Result<()> {
        // PUSH1 0x01 PUSH1 0x02 ADD STOP
        let cfg = build(&[0x60, 0x01, 0x60, 0x02, 0x01, 0x00], Config::default())?;
        assert_eq!(cfg.node_count(), 4);
        assert_eq!(cfg.edge_count(), 3);

        let entry = cfg.entry().expect("Graph had no entry");
        let second = cfg.node_at(2).expect("No node at offset 2");
        assert!(cfg.contains_edge(entry, second, EdgeKind::Sequential));
        assert_eq!(cfg.statement(second).opcode.as_byte(), 0x60);

        Ok(())
    }

    #[test]
    fn terminators_do_not_fall_through() -> anyhow::Result<()> {
        // STOP JUMPDEST RETURN JUMPDEST INVALID JUMPDEST
        let cfg = build(&[0x00, 0x5b, 0xf3, 0x5b, 0xfe, 0x5b], Config::default())?;
        assert_eq!(cfg.edge_count(), 2);
        let stop = cfg.node_at(0).expect("No STOP node");
        assert_eq!(cfg.successors(stop).count(), 0);
        assert_eq!(cfg.jumpdests().len(), 3);

        Ok(())
    }

    #[test]
    fn jumpi_falls_through_along_a_false_edge() -> anyhow::Result<()> {
        // CALLVALUE CALLVALUE JUMPI STOP
        let cfg = build(&[0x34, 0x34, 0x57, 0x00], Config::default())?;
        let jumpi = cfg.node_at(2).expect("No JUMPI node");
        let next = cfg.node_at(3).expect("No fall-through node");

        assert!(cfg.contains_edge(jumpi, next, EdgeKind::False));
        assert_eq!(cfg.jumps().len(), 1);
        assert!(cfg.pushed_jumps().is_empty());
        assert!(cfg.jump_targets(jumpi).is_empty());

        Ok(())
    }

    #[test]
    fn links_pushed_jumps_when_enabled() -> anyhow::Result<()> {
        let bytes = bytecode![
            Opcode::push(1, &[0x04])?,
            Opcode::Jump,
            Opcode::Invalid(0xfe),
            Opcode::JumpDest,
            Opcode::Stop
        ];

        let linked = build(&bytes, Config::default())?;
        let jump = linked.node_at(2).expect("No JUMP node");
        let dest = linked.node_at(4).expect("No JUMPDEST node");
        assert!(linked.contains_edge(jump, dest, EdgeKind::Sequential));
        assert!(linked.pushed_jumps().contains(&jump));
        assert_eq!(linked.jump_targets(jump).into_iter().collect::<Vec<_>>(), vec![dest]);

        let unlinked = build(&bytes, Config::default().with_link_pushed_jumps(false))?;
        assert!(unlinked.pushed_jumps().is_empty());
        assert!(unlinked.jump_targets(jump).is_empty());

        Ok(())
    }

    #[test]
    fn does_not_link_pushes_of_non_jumpdests() -> anyhow::Result<()> {
        let bytes = bytecode![Opcode::push(1, &[0x03])?, Opcode::Jump, Opcode::Stop];
        let cfg = build(&bytes, Config::default())?;
        assert!(cfg.pushed_jumps().is_empty());

        Ok(())
    }

    #[test]
    fn add_edge_reports_new_edges() -> anyhow::Result<()> {
        let mut cfg = build(&[0x5b, 0x56], Config::default())?;
        let dest = cfg.node_at(0).expect("No JUMPDEST node");
        let jump = cfg.node_at(1).expect("No JUMP node");

        assert!(cfg.add_edge(jump, dest, EdgeKind::Sequential));
        assert!(!cfg.add_edge(jump, dest, EdgeKind::Sequential));
        assert_eq!(cfg.edge_count(), 2);

        let dot = cfg.to_dot();
        assert!(dot.starts_with("digraph cfg {"));
        assert!(dot.contains("n1 -> n0"));
        assert!(dot.contains("n0 [label=\"0x0000: JUMPDEST\"];"));
        assert!(dot.ends_with("];\n}"));

        Ok(())
    }
}
