//! Struct layout verification tests.
//!
//! Ensures bytemuck Pod compliance and that struct sizes don't accidentally
//! change (would break on-chain state / a running `state_digest`).

use bytemuck::Zeroable;
use tranche_vault::state::{
    CircuitBreakerState, Tranche, TrancheLock, VaultState, CIRCUIT_BREAKER_STATE_SIZE,
    TRANCHE_LOCK_SIZE, TRANCHE_SIZE, VAULT_STATE_SIZE,
};

#[test]
fn test_tranche_size_is_120() {
    // If this changes, existing on-chain tranche records become unreadable.
    // NEVER change this without a migration plan.
    assert_eq!(TRANCHE_SIZE, 120);
    assert_eq!(std::mem::size_of::<Tranche>(), 120);
}

#[test]
fn test_tranche_lock_size_is_24() {
    assert_eq!(TRANCHE_LOCK_SIZE, 24);
    assert_eq!(std::mem::size_of::<TrancheLock>(), 24);
}

#[test]
fn test_circuit_breaker_state_size_is_32() {
    assert_eq!(CIRCUIT_BREAKER_STATE_SIZE, 32);
    assert_eq!(std::mem::size_of::<CircuitBreakerState>(), 32);
}

#[test]
fn test_vault_state_size_is_200() {
    assert_eq!(VAULT_STATE_SIZE, 200);
    assert_eq!(std::mem::size_of::<VaultState>(), 200);
}

#[test]
fn test_tranche_alignment() {
    assert_eq!(std::mem::align_of::<Tranche>(), 8);
}

#[test]
fn test_vault_state_alignment() {
    assert_eq!(std::mem::align_of::<VaultState>(), 8);
}

#[test]
fn test_tranche_zeroed_is_untouched() {
    let t = Tranche::zeroed();
    assert_eq!(t.id, 0);
    assert_eq!(t.capital, 0);
    assert_eq!(t.capital_basis, 0);
    assert_eq!(t.total_shares, 0);
    assert_eq!(t.accumulated_yield, 0);
    assert_eq!(t.protocol_earned_overflow, 0);
    assert_eq!(t.lp_token_ref_set, 0);
}

#[test]
fn test_vault_state_zeroed_is_unpaused_and_not_reentered() {
    let s = VaultState::zeroed();
    assert_eq!(s.paused, 0);
    assert_eq!(s.reentrancy_guard, 0);
    assert_eq!(s.seq_no, 0);
    assert_eq!(s.version, 0);
}

#[test]
fn test_bytemuck_roundtrip_tranche() {
    let mut t = Tranche::zeroed();
    t.id = 6;
    t.curve_id = 5;
    t.capital = 1_000_000;
    t.capital_basis = 1_000_000;
    t.total_shares = 500_000;
    t.apy_min_bps = 2_200;
    t.apy_max_bps = 5_000;
    t.allocation_bps = 2_000;

    let bytes: &[u8] = bytemuck::bytes_of(&t);
    assert_eq!(bytes.len(), TRANCHE_SIZE);

    let recovered: &Tranche = bytemuck::from_bytes(bytes);
    assert_eq!(recovered.id, 6);
    assert_eq!(recovered.curve_id, 5);
    assert_eq!(recovered.capital, 1_000_000);
    assert_eq!(recovered.total_shares, 500_000);
    assert_eq!(recovered.apy_max_bps, 5_000);
    assert_eq!(recovered.allocation_bps, 2_000);
}

#[test]
fn test_bytemuck_roundtrip_vault_state() {
    let mut s = VaultState::zeroed();
    s.total_capital = 42_000;
    s.seq_no = 7;
    s.version = 1;
    s.paused = 1;

    let bytes: &[u8] = bytemuck::bytes_of(&s);
    assert_eq!(bytes.len(), VAULT_STATE_SIZE);

    let recovered: &VaultState = bytemuck::from_bytes(bytes);
    assert_eq!(recovered.total_capital, 42_000);
    assert_eq!(recovered.seq_no, 7);
    assert_eq!(recovered.version, 1);
    assert_eq!(recovered.paused, 1);
}

use bytemuck::Pod;

#[test]
fn test_pod_zeroable_impls() {
    // Compile-time checks that the Pod + Zeroable derives are valid.
    fn assert_pod<T: Pod + Zeroable>() {}
    assert_pod::<Tranche>();
    assert_pod::<TrancheLock>();
    assert_pod::<CircuitBreakerState>();
    assert_pod::<VaultState>();
}

/// Field offset verification — ensures no hidden padding changes.
#[test]
fn test_tranche_field_offsets() {
    let t = Tranche::zeroed();
    let base = &t as *const _ as usize;

    assert_eq!(&t.id as *const _ as usize - base, 0);
    assert_eq!(&t.curve_id as *const _ as usize - base, 1);
    assert_eq!(&t.capital as *const _ as usize - base, 8);
    assert_eq!(&t.capital_basis as *const _ as usize - base, 16);
    assert_eq!(&t.total_shares as *const _ as usize - base, 24);
    assert_eq!(&t.accumulated_yield as *const _ as usize - base, 32);
    assert_eq!(&t.protocol_earned_overflow as *const _ as usize - base, 40);
    assert_eq!(&t.apy_min_bps as *const _ as usize - base, 48);
    assert_eq!(&t.apy_max_bps as *const _ as usize - base, 50);
    assert_eq!(&t.allocation_bps as *const _ as usize - base, 52);
    assert_eq!(&t.lp_token_ref as *const _ as usize - base, 56);
    assert_eq!(&t.lp_token_ref_set as *const _ as usize - base, 88);
}

#[test]
fn test_vault_state_field_offsets() {
    let s = VaultState::zeroed();
    let base = &s as *const _ as usize;

    assert_eq!(&s.total_capital as *const _ as usize - base, 0);
    assert_eq!(&s.total_coverage_sold as *const _ as usize - base, 8);
    assert_eq!(&s.accumulated_premiums as *const _ as usize - base, 16);
    assert_eq!(&s.accumulated_losses as *const _ as usize - base, 24);
    assert_eq!(&s.seq_no as *const _ as usize - base, 32);
    assert_eq!(&s.version as *const _ as usize - base, 36);
    assert_eq!(&s.paused as *const _ as usize - base, 38);
    assert_eq!(&s.reentrancy_guard as *const _ as usize - base, 39);
    assert_eq!(&s.admin as *const _ as usize - base, 40);
    assert_eq!(&s.claims_processor as *const _ as usize - base, 72);
    assert_eq!(&s.factory as *const _ as usize - base, 104);
    assert_eq!(&s.oracle as *const _ as usize - base, 136);
    assert_eq!(&s._reserved as *const _ as usize - base, 168);
}
