//! This module contains common utilities for simplifying the writing of
//! integration tests for this library.

#![cfg(test)]

use std::collections::BTreeSet;

use evm_jump_resolver as ejr;
use evm_jump_resolver::{
    cfg,
    resolver::{contract::Contract, InitialResolver, SolvedResolver},
    solver,
};

/// Constructs a new resolver for the hex-encoded (with or without the `0x`
/// prefix) contract bytecode provided in `code`.
///
/// It uses the default configurations for the resolver.
#[allow(unused)] // It is actually
pub fn new_resolver_from_bytecode(code: &str) -> anyhow::Result<InitialResolver> {
    let contract = Contract::from_hex(code)?;
    Ok(ejr::new(
        contract,
        cfg::Config::default(),
        solver::Config::default(),
    ))
}

/// Constructs a new resolver for the raw contract `bytes`, building the
/// control-flow graph with `link_pushed_jumps` and solving it with
/// `solver_config`.
#[allow(unused)] // It is actually
pub fn new_resolver_from_bytes(
    bytes: Vec<u8>,
    link_pushed_jumps: bool,
    solver_config: solver::Config,
) -> InitialResolver {
    let cfg_config = cfg::Config::default().with_link_pushed_jumps(link_pushed_jumps);
    ejr::new(Contract::new(bytes), cfg_config, solver_config)
}

/// Checks the properties that every solved resolver must satisfy, whatever
/// the contract.
#[allow(unused)] // It is actually
pub fn assert_report_is_consistent(resolver: &SolvedResolver) {
    let report = resolver.report();
    let statistics = resolver.statistics();
    let cfg = resolver.cfg();

    // The classifications never overlap.
    assert!(report.unreachable_jumps.is_disjoint(&report.maybe_unsound_jumps));
    assert!(report.unreachable_jumps.is_disjoint(&report.unsound_jumps));
    assert!(report.maybe_unsound_jumps.is_disjoint(&report.unsound_jumps));
    assert!(report.pushed_jumps.is_disjoint(&report.unreachable_jumps));

    // Unreachable jumps never gain edges.
    let resolved: BTreeSet<u32> = report.resolved_jumps.keys().copied().collect();
    assert!(resolved.is_disjoint(&report.unreachable_jumps));

    // Every resolved jump leads to a `JUMPDEST`.
    for targets in report.resolved_jumps.values() {
        for target in targets {
            assert!(cfg.jumpdest_at(*target).is_some(), "{target:#x} is not a JUMPDEST");
        }
    }

    // The statistics account for every jump exactly once.
    assert_eq!(statistics.total_jumps, cfg.jumps().len());
    assert_eq!(
        statistics.total_solved_jumps
            + statistics.unsound_jumps
            + statistics.maybe_unsound_jumps
            + statistics.maybe_unreachable_jumps,
        statistics.total_jumps
    );
    assert!((0.0..=100.0).contains(&statistics.percent_solved));
}
