//! The results of jump resolution, expressed in terms of program counters so
//! that they can be serialized and compared across runs.

use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

use crate::{cfg::EvmCfg, solver::Round, value::Interval};

/// The classification of every jump in a contract after jump resolution.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct JumpReport {
    /// Jumps that no execution reaches.
    pub unreachable_jumps: BTreeSet<u32>,

    /// Jumps reached in a state about which nothing is known.
    pub maybe_unsound_jumps: BTreeSet<u32>,

    /// Jumps whose destination could not be bounded, or whose destination
    /// matches no `JUMPDEST`.
    pub unsound_jumps: BTreeSet<u32>,

    /// Jumps linked at graph construction from the push that precedes them.
    pub pushed_jumps: BTreeSet<u32>,

    /// Every jump with at least one outgoing jump edge, mapped to the offsets
    /// of its destinations.
    pub resolved_jumps: BTreeMap<u32, BTreeSet<u32>>,

    /// The top-of-stack intervals observed before each analysed jump.
    pub observed_targets: BTreeMap<u32, Vec<Interval>>,

    /// The number of rounds of analysis that were run.
    pub rounds: usize,

    /// The number of edges added by jump resolution across all rounds.
    pub edges_added: usize,

    /// Whether the last round added no edges, rather than the round limit
    /// being hit.
    pub fixpoint_reached: bool,
}

impl JumpReport {
    /// Builds the report from the classification of the final `round` over
    /// `cfg`.
    #[must_use]
    pub fn new(
        cfg: &EvmCfg,
        round: &Round,
        rounds: usize,
        edges_added: usize,
        fixpoint_reached: bool,
    ) -> Self {
        let offsets = |nodes: &BTreeSet<NodeIndex>| -> BTreeSet<u32> {
            nodes.iter().map(|n| cfg.statement(*n).offset).collect()
        };

        let resolved_jumps = cfg
            .jumps()
            .iter()
            .filter_map(|jump| {
                let targets: BTreeSet<u32> =
                    cfg.jump_targets(*jump).iter().map(|t| cfg.statement(*t).offset).collect();
                (!targets.is_empty()).then(|| (cfg.statement(*jump).offset, targets))
            })
            .collect();
        let observed_targets = round
            .observed
            .iter()
            .map(|(jump, tops)| (cfg.statement(*jump).offset, tops.clone()))
            .collect();

        Self {
            unreachable_jumps: offsets(&round.unreachable),
            maybe_unsound_jumps: offsets(&round.maybe_unsound),
            unsound_jumps: offsets(&round.unsound),
            pushed_jumps: offsets(cfg.pushed_jumps()),
            resolved_jumps,
            observed_targets,
            rounds,
            edges_added,
            fixpoint_reached,
        }
    }

    /// Gets the jumps that were resolved by the analysis to at least one
    /// destination and are neither unsound nor maybe unsound.
    pub fn solved_jumps(&self) -> impl Iterator<Item = u32> + '_ {
        self.resolved_jumps.keys().copied().filter(|jump| {
            !self.pushed_jumps.contains(jump)
                && !self.unsound_jumps.contains(jump)
                && !self.maybe_unsound_jumps.contains(jump)
        })
    }
}

/// Summary counts over a [`JumpReport`].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct JumpStatistics {
    pub total_opcodes: usize,
    pub total_jumps: usize,
    pub pushed_jumps: usize,
    pub solved_jumps: usize,
    pub definitely_unreachable_jumps: usize,

    /// Jumps that were neither resolved nor classified, which is only possible
    /// if the analysis stopped early.
    pub maybe_unreachable_jumps: usize,
    pub unsound_jumps: usize,
    pub maybe_unsound_jumps: usize,

    /// Pushed, solved and definitely unreachable jumps together.
    pub total_solved_jumps: usize,

    /// The share of jumps that are solved, as a percentage.
    pub percent_solved: f64,
    pub time_millis: u128,
}

impl JumpStatistics {
    /// Summarises `report` for `cfg`, where the analysis took `elapsed`.
    #[must_use]
    pub fn from_report(report: &JumpReport, cfg: &EvmCfg, elapsed: Duration) -> Self {
        let total_opcodes = cfg.node_count();
        let total_jumps = cfg.jumps().len();
        let pushed_jumps = report.pushed_jumps.len();
        let solved_jumps = report.solved_jumps().count();
        let definitely_unreachable_jumps = report.unreachable_jumps.len();
        let unsound_jumps = report.unsound_jumps.len();
        let maybe_unsound_jumps = report.maybe_unsound_jumps.len();
        let total_solved_jumps = pushed_jumps + solved_jumps + definitely_unreachable_jumps;
        let maybe_unreachable_jumps = total_jumps
            .saturating_sub(total_solved_jumps + unsound_jumps + maybe_unsound_jumps);

        #[allow(clippy::cast_precision_loss)] // Jump counts are far below 2^52
        let percent_solved = if total_jumps == 0 {
            100.0
        } else {
            total_solved_jumps as f64 / total_jumps as f64 * 100.0
        };

        Self {
            total_opcodes,
            total_jumps,
            pushed_jumps,
            solved_jumps,
            definitely_unreachable_jumps,
            maybe_unreachable_jumps,
            unsound_jumps,
            maybe_unsound_jumps,
            total_solved_jumps,
            percent_solved,
            time_millis: elapsed.as_millis(),
        }
    }
}
