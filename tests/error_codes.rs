//! Error code uniqueness and completeness tests.

use solana_program::program_error::ProgramError;
use tranche_vault::error::VaultError;

#[test]
fn test_all_error_codes_unique() {
    let codes: Vec<u32> = vec![
        VaultError::Unauthorized as u32,
        VaultError::Paused as u32,
        VaultError::InsufficientGas as u32,
        VaultError::TrancheLocked as u32,
        VaultError::Reentrancy as u32,
        VaultError::InsufficientBalance as u32,
        VaultError::InvalidTranche as u32,
        VaultError::ZeroAmount as u32,
        VaultError::InvalidCurve as u32,
        VaultError::InvalidAllocationSum as u32,
        VaultError::CircuitBreakerTripped as u32,
        VaultError::OverflowApproaching as u32,
        VaultError::Insolvent as u32,
        VaultError::BounceExhausted as u32,
        VaultError::AlreadyPaid as u32,
        VaultError::RefundUnclaimed as u32,
        VaultError::ArithmeticOverflow as u32,
        VaultError::PendingTxNotFound as u32,
        VaultError::PendingTxAlreadyResolved as u32,
        VaultError::SeqNoOverflow as u32,
    ];

    let mut sorted = codes.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), codes.len(), "duplicate error discriminants found");
}

#[test]
fn test_policy_errors_occupy_the_low_band() {
    // Policy errors (no mutation occurred) are 0..=9; integrity events start at 10.
    let policy_codes = [
        VaultError::Unauthorized as u32,
        VaultError::Paused as u32,
        VaultError::InsufficientGas as u32,
        VaultError::TrancheLocked as u32,
        VaultError::Reentrancy as u32,
        VaultError::InsufficientBalance as u32,
        VaultError::InvalidTranche as u32,
        VaultError::ZeroAmount as u32,
        VaultError::InvalidCurve as u32,
        VaultError::InvalidAllocationSum as u32,
    ];
    for code in policy_codes {
        assert!(code < 10, "policy error {code} strayed into the integrity-event band");
    }

    let integrity_codes = [
        VaultError::CircuitBreakerTripped as u32,
        VaultError::OverflowApproaching as u32,
        VaultError::Insolvent as u32,
        VaultError::BounceExhausted as u32,
        VaultError::AlreadyPaid as u32,
        VaultError::RefundUnclaimed as u32,
        VaultError::ArithmeticOverflow as u32,
        VaultError::PendingTxNotFound as u32,
        VaultError::PendingTxAlreadyResolved as u32,
        VaultError::SeqNoOverflow as u32,
    ];
    for code in integrity_codes {
        assert!(code >= 10, "integrity event {code} strayed into the policy-error band");
    }
}

#[test]
fn test_converts_to_program_error_custom() {
    let err: ProgramError = VaultError::TrancheLocked.into();
    assert_eq!(err, ProgramError::Custom(VaultError::TrancheLocked as u32));

    let err: ProgramError = VaultError::CircuitBreakerTripped.into();
    assert_eq!(err, ProgramError::Custom(VaultError::CircuitBreakerTripped as u32));
}

#[test]
fn test_error_is_copy_and_comparable() {
    let a = VaultError::Unauthorized;
    let b = a;
    assert_eq!(a, b);
    assert_ne!(VaultError::Unauthorized, VaultError::Paused);
}
