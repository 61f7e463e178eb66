//! This module tests the library's analysis capabilities on the
//! `BatchEnsLookups` contract, which calls an internal function and returns
//! through a jump whose destination is only known at runtime.
#![cfg(test)]

use std::collections::BTreeSet;

mod common;

const BYTECODE: &str = "0x6080604052348015600f57600080fd5b506004361060285760003560e01c8063b709959614602d575b600080fd5b60336035565b005b6028600020604051602001604b91815260200190565b60408051601f198184030190525256fea2646970667358221220645e42249fb219b90bda62dd9e9539000ea399d67aa68ba2a3521720a942364964736f6c634300080f0033";

#[test]
fn resolves_every_jump() -> anyhow::Result<()> {
    let resolver = common::new_resolver_from_bytecode(BYTECODE)?.analyze()?;
    common::assert_report_is_consistent(&resolver);

    let report = resolver.report();
    assert!(report.fixpoint_reached);
    assert_eq!(report.pushed_jumps, BTreeSet::from([0x0a, 0x17, 0x27, 0x32]));
    assert!(report.unsound_jumps.is_empty());
    assert!(report.maybe_unsound_jumps.is_empty());
    assert!(report.unreachable_jumps.is_empty());

    // The call into the encoding helper, and the return from the function.
    assert_eq!(report.resolved_jumps[&0x4a], BTreeSet::from([0x4b]));
    assert_eq!(report.resolved_jumps[&0x5a], BTreeSet::from([0x33]));
    assert_eq!(report.edges_added, 2);

    let statistics = resolver.statistics();
    assert_eq!(statistics.total_jumps, 6);
    assert_eq!(statistics.pushed_jumps, 4);
    assert_eq!(statistics.solved_jumps, 2);
    assert_eq!(statistics.total_solved_jumps, 6);
    assert!((statistics.percent_solved - 100.0).abs() < f64::EPSILON);

    Ok(())
}

#[test]
fn tracks_the_free_memory_pointer() -> anyhow::Result<()> {
    let resolver = common::new_resolver_from_bytecode(BYTECODE)?.analyze()?;

    // `MLOAD(0x40)` at 0x4f reads the pointer stored by the prologue.
    let state = resolver.state_after(0x4f)?;
    let frame = state.frame().expect("State at 0x4f was not reachable");
    let tops: Vec<String> = frame
        .stacks()
        .tops()
        .into_iter()
        .flatten()
        .map(|top| top.to_string())
        .collect();
    assert_eq!(tops, vec!["[128, 128]".to_string()]);

    // There is no instruction in the middle of a push.
    resolver.state_before(0x4d).expect_err("Found a state mid-instruction");

    Ok(())
}

#[test]
fn reports_serialize_to_json() -> anyhow::Result<()> {
    let resolver = common::new_resolver_from_bytecode(BYTECODE)?.analyze()?;
    let json = serde_json::to_value(resolver.report())?;

    assert_eq!(json["resolved_jumps"]["74"], serde_json::json!([75]));
    assert_eq!(json["observed_targets"]["90"], serde_json::json!(["[51, 51]"]));
    assert_eq!(json["fixpoint_reached"], serde_json::json!(true));

    let statistics = serde_json::to_string(resolver.statistics())?;
    let restored: evm_jump_resolver::solver::report::JumpStatistics =
        serde_json::from_str(&statistics)?;
    assert_eq!(&restored, resolver.statistics());

    Ok(())
}
