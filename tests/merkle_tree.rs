//! This module tests the library's analysis capabilities on the
//! `MerkleTree` contract, which loops over an array and calls internal
//! functions from inside the loop body.
#![cfg(test)]

use std::collections::BTreeSet;

mod common;

const BYTECODE: &str = "0x6080604052348015600f57600080fd5b506004361060285760003560e01c806388572a5c14602d575b600080fd5b60336035565b005b604080516001808252818301909252600091602080830190803683370190505090506000805b8251811015609d57608c838281518110607457607460a2565b60200260200101518360009182526020526040902090565b91508060968160b8565b915050605b565b505050565b634e487b7160e01b600052603260045260246000fd5b60006001820160d757634e487b7160e01b600052601160045260246000fd5b506001019056fea26469706673582212204208c6f43bc343f0a115564be7291cf69f0cd24036b2d9d1701db9b25bf6cb0264736f6c634300080f0033";

#[test]
fn resolves_returns_from_inside_a_loop() -> anyhow::Result<()> {
    let resolver = common::new_resolver_from_bytecode(BYTECODE)?.analyze()?;
    common::assert_report_is_consistent(&resolver);

    let report = resolver.report();
    assert!(report.fixpoint_reached);
    assert!(report.unsound_jumps.is_empty());
    assert!(report.maybe_unsound_jumps.is_empty());

    // Returns from the hashing helper, the increment helper and the function.
    assert_eq!(report.resolved_jumps[&0x8b], BTreeSet::from([0x8c]));
    assert_eq!(report.resolved_jumps[&0xdd], BTreeSet::from([0x96]));
    assert_eq!(report.resolved_jumps[&0xa1], BTreeSet::from([0x33]));

    // The stray `JUMP` byte in the metadata can never execute.
    assert!(report.unreachable_jumps.contains(&0xf3));

    Ok(())
}

#[test]
fn resolves_the_same_jumps_without_pushed_jump_linking() -> anyhow::Result<()> {
    let bytes = hex::decode(&BYTECODE[2..])?;
    let resolver = common::new_resolver_from_bytes(
        bytes,
        false,
        evm_jump_resolver::solver::Config::default(),
    )
    .analyze()?;
    common::assert_report_is_consistent(&resolver);

    let report = resolver.report();
    assert!(report.pushed_jumps.is_empty());
    assert_eq!(report.resolved_jumps[&0x9c], BTreeSet::from([0x5b]));
    assert_eq!(report.resolved_jumps[&0x95], BTreeSet::from([0xb8]));
    assert_eq!(report.resolved_jumps[&0x8b], BTreeSet::from([0x8c]));

    Ok(())
}
