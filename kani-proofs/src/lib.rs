//! Kani formal verification for the vault's NAV/shares/waterfall math.
//!
//! ZERO dependencies. Pure Rust. CBMC-friendly.
//!
//! KEY DESIGN DECISION: functions use u32 inputs / u64 intermediates. The
//! production code in `math.rs` runs on u64/u128 (and `Fp = i128` for NAV),
//! but the arithmetic properties (conservation, monotonicity, rounding
//! direction) are scale-invariant. u32 keeps SAT formulas tractable for CBMC
//! (<60s per proof). The transcendental bonding-curve piece (`curve.rs`) is
//! deliberately not mirrored here — it has no exactly-checkable invariant
//! narrower-integer Kani could verify cheaply; its tests live in `curve.rs`
//! itself instead.
//!
//! Run all:   cargo kani --lib
//! Run one:   cargo kani --harness proof_first_depositor_exact

// ═══════════════════════════════════════════════════════════════
// Vault math (u32/u64 mirror of tranche-vault/src/math.rs)
// Arithmetic is IDENTICAL in shape — just narrower types for CBMC tractability.
// ═══════════════════════════════════════════════════════════════

/// Shares for a deposit at a given per-share price (scaled by `SCALE`).
/// First depositor (`total_shares == 0 && capital_basis == 0`): 1:1.
/// Orphaned value (`total_shares == 0 && capital_basis > 0`): blocked.
pub const SCALE: u32 = 1_000;

pub fn calc_shares_for_deposit(total_shares: u32, nav_scaled: u32, amount: u32) -> Option<u32> {
    if total_shares == 0 {
        return if amount == 0 { Some(0) } else { Some(amount) };
    }
    if nav_scaled == 0 {
        return None;
    }
    let shares = (amount as u64).checked_mul(SCALE as u64)?.checked_div(nav_scaled as u64)?;
    if shares > u32::MAX as u64 {
        None
    } else {
        Some(shares as u32)
    }
}

/// Base-currency payout for burning `shares` at `nav_scaled`. Rounds down.
pub fn calc_base_for_withdraw(nav_scaled: u32, shares: u32) -> Option<u32> {
    let base = (shares as u64).checked_mul(nav_scaled as u64)?.checked_div(SCALE as u64)?;
    if base > u32::MAX as u64 {
        None
    } else {
        Some(base as u32)
    }
}

/// Par-capital reduction proportional to shares burned out of total shares.
pub fn calc_basis_reduction(capital_basis: u32, total_shares: u32, shares_burned: u32) -> Option<u32> {
    if total_shares == 0 {
        return None;
    }
    let r = (capital_basis as u64).checked_mul(shares_burned as u64)?.checked_div(total_shares as u64)?;
    u32::try_from(r).ok()
}

/// Six-slot equity-first waterfall: absorb `loss` against `capitals` in
/// order, returning per-slot absorption and any unabsorbed remainder.
pub fn distribute_loss_waterfall(capitals: [u32; 6], loss: u32) -> ([u32; 6], u32) {
    let mut remaining = loss;
    let mut absorbed = [0u32; 6];
    for i in 0..6 {
        if remaining == 0 {
            break;
        }
        let take = if capitals[i] < remaining { capitals[i] } else { remaining };
        absorbed[i] = take;
        remaining -= take;
    }
    (absorbed, remaining)
}

/// Split `total_premium` across six slots weighted by `allocations`, dust to
/// the last slot.
pub fn distribute_premium(allocations: [u32; 6], total_premium: u32) -> [u32; 6] {
    let total_alloc: u64 = allocations.iter().map(|&a| a as u64).sum();
    if total_premium == 0 || total_alloc == 0 {
        return [0; 6];
    }
    let mut shares = [0u32; 6];
    let mut distributed: u64 = 0;
    for i in 0..6 {
        let share = (total_premium as u64) * (allocations[i] as u64) / total_alloc;
        shares[i] = share as u32;
        distributed += share;
    }
    let remainder = (total_premium as u64).saturating_sub(distributed) as u32;
    shares[5] = shares[5].saturating_add(remainder);
    shares
}

/// Whether cumulative losses in the window trip the breaker at `threshold_bps`
/// of `capital_at_window_start`.
pub fn circuit_breaker_trips(losses_in_window: u32, capital_at_window_start: u32, threshold_bps: u32) -> bool {
    if capital_at_window_start == 0 {
        return losses_in_window > 0;
    }
    let threshold = (capital_at_window_start as u64) * (threshold_bps as u64) / 10_000;
    (losses_in_window as u64) > threshold
}

/// Exponential backoff schedule: `1 << retry_count` seconds, exhausted at
/// `MAX_RETRIES`.
pub const MAX_RETRIES: u32 = 5;

pub fn retry_delay_secs(retry_count: u32) -> Option<u32> {
    if retry_count >= MAX_RETRIES {
        None
    } else {
        Some(1u32 << retry_count)
    }
}

// ═══════════════════════════════════════════════════════════════
// KANI PROOFS
// ═══════════════════════════════════════════════════════════════

#[cfg(kani)]
mod proofs {
    use super::*;

    // ───────────────────────── deposit / withdraw ─────────────────────────

    /// Deposit→withdraw roundtrip at a stable NAV: can't get back more than
    /// deposited.
    #[kani::proof]
    #[kani::unwind(9)]
    fn proof_deposit_withdraw_no_inflation() {
        let total_shares: u32 = kani::any();
        let nav: u32 = kani::any();
        let amount: u32 = kani::any();
        kani::assume(amount > 0 && amount < 1_000);
        kani::assume(total_shares < 1_000);
        kani::assume(nav > 0 && nav < 10 * SCALE);

        let shares = match calc_shares_for_deposit(total_shares, nav, amount) {
            Some(s) if s > 0 => s,
            _ => return,
        };
        let back = match calc_base_for_withdraw(nav, shares) {
            Some(v) => v,
            None => return,
        };
        assert!(back <= amount);
    }

    /// True first depositor mints exactly 1:1.
    #[kani::proof]
    #[kani::unwind(9)]
    fn proof_first_depositor_exact() {
        let amount: u32 = kani::any();
        kani::assume(amount > 0 && amount < 1_000);
        assert_eq!(calc_shares_for_deposit(0, 0, amount), Some(amount));
    }

    /// Rounding always favors the pool: `shares * nav <= amount * SCALE`.
    #[kani::proof]
    #[kani::unwind(9)]
    fn proof_shares_rounding_favors_pool() {
        let total_shares: u32 = kani::any();
        let nav: u32 = kani::any();
        let amount: u32 = kani::any();
        kani::assume(total_shares > 0 && total_shares < 1_000);
        kani::assume(nav > 0 && nav < 10 * SCALE);
        kani::assume(amount < 1_000);

        if let Some(shares) = calc_shares_for_deposit(total_shares, nav, amount) {
            assert!((shares as u64) * (nav as u64) <= (amount as u64) * (SCALE as u64));
        }
    }

    /// Larger deposit → at least as many shares (monotone).
    #[kani::proof]
    #[kani::unwind(9)]
    fn proof_larger_deposit_more_shares() {
        let total_shares: u32 = kani::any();
        let nav: u32 = kani::any();
        let small: u32 = kani::any();
        let large: u32 = kani::any();
        kani::assume(total_shares > 0 && total_shares < 1_000);
        kani::assume(nav > 0 && nav < 10 * SCALE);
        kani::assume(small > 0 && small < 500);
        kani::assume(large >= small && large < 1_000);

        match (
            calc_shares_for_deposit(total_shares, nav, small),
            calc_shares_for_deposit(total_shares, nav, large),
        ) {
            (Some(s), Some(l)) => assert!(l >= s),
            _ => {}
        }
    }

    /// Larger share burn → at least as much payout (monotone).
    #[kani::proof]
    #[kani::unwind(9)]
    fn proof_larger_burn_more_payout() {
        let nav: u32 = kani::any();
        let small: u32 = kani::any();
        let large: u32 = kani::any();
        kani::assume(nav < 10 * SCALE);
        kani::assume(small < 1_000);
        kani::assume(large >= small && large < 1_000);

        match (calc_base_for_withdraw(nav, small), calc_base_for_withdraw(nav, large)) {
            (Some(s), Some(l)) => assert!(l >= s),
            _ => {}
        }
    }

    /// Burning zero shares never yields a positive payout.
    #[kani::proof]
    #[kani::unwind(9)]
    fn proof_zero_burn_zero_payout() {
        let nav: u32 = kani::any();
        kani::assume(nav < 10 * SCALE);
        assert_eq!(calc_base_for_withdraw(nav, 0), Some(0));
    }

    /// Neither deposit nor withdraw math ever panics, across the full
    /// `u32` domain.
    #[kani::proof]
    #[kani::unwind(9)]
    fn proof_deposit_withdraw_no_panic() {
        let _ = calc_shares_for_deposit(kani::any(), kani::any(), kani::any());
        let _ = calc_base_for_withdraw(kani::any(), kani::any());
    }

    // ───────────────────────── basis reduction ─────────────────────────

    /// Basis reduction never exceeds `capital_basis` itself (you can't
    /// reduce par contributions by more than they were).
    #[kani::proof]
    #[kani::unwind(9)]
    fn proof_basis_reduction_bounded() {
        let capital_basis: u32 = kani::any();
        let total_shares: u32 = kani::any();
        let shares_burned: u32 = kani::any();
        kani::assume(total_shares > 0 && total_shares < 1_000);
        kani::assume(shares_burned <= total_shares);
        kani::assume(capital_basis < 1_000);

        if let Some(r) = calc_basis_reduction(capital_basis, total_shares, shares_burned) {
            assert!(r <= capital_basis);
        }
    }

    /// Burning every outstanding share reduces basis by exactly the full
    /// `capital_basis` (no dust left stranded).
    #[kani::proof]
    #[kani::unwind(9)]
    fn proof_full_burn_reduces_full_basis() {
        let capital_basis: u32 = kani::any();
        let total_shares: u32 = kani::any();
        kani::assume(total_shares > 0 && total_shares < 1_000);
        kani::assume(capital_basis < 1_000);
        assert_eq!(calc_basis_reduction(capital_basis, total_shares, total_shares), Some(capital_basis));
    }

    // ───────────────────────── loss waterfall ─────────────────────────

    /// Total absorbed across all six slots plus the remainder always equals
    /// the original loss (conservation — nothing created or destroyed).
    #[kani::proof]
    #[kani::unwind(9)]
    fn proof_waterfall_conserves_loss() {
        let capitals: [u32; 6] = [
            kani::any(),
            kani::any(),
            kani::any(),
            kani::any(),
            kani::any(),
            kani::any(),
        ];
        let loss: u32 = kani::any();
        kani::assume(capitals.iter().all(|&c| c < 1_000));
        kani::assume(loss < 1_000);

        let (absorbed, remainder) = distribute_loss_waterfall(capitals, loss);
        let total_absorbed: u64 = absorbed.iter().map(|&a| a as u64).sum();
        assert_eq!(total_absorbed + remainder as u64, loss as u64);
    }

    /// No slot ever absorbs more than its own capital.
    #[kani::proof]
    #[kani::unwind(9)]
    fn proof_waterfall_per_slot_bounded() {
        let capitals: [u32; 6] = [
            kani::any(),
            kani::any(),
            kani::any(),
            kani::any(),
            kani::any(),
            kani::any(),
        ];
        let loss: u32 = kani::any();
        kani::assume(capitals.iter().all(|&c| c < 1_000));
        kani::assume(loss < 1_000);

        let (absorbed, _remainder) = distribute_loss_waterfall(capitals, loss);
        for i in 0..6 {
            assert!(absorbed[i] <= capitals[i]);
        }
    }

    /// A loss within total capital always leaves zero remainder (solvent).
    #[kani::proof]
    #[kani::unwind(9)]
    fn proof_waterfall_solvent_when_loss_within_capital() {
        let capitals: [u32; 6] = [
            kani::any(),
            kani::any(),
            kani::any(),
            kani::any(),
            kani::any(),
            kani::any(),
        ];
        let loss: u32 = kani::any();
        kani::assume(capitals.iter().all(|&c| c < 500));
        let total: u64 = capitals.iter().map(|&c| c as u64).sum();
        kani::assume((loss as u64) <= total);

        let (_absorbed, remainder) = distribute_loss_waterfall(capitals, loss);
        assert_eq!(remainder, 0);
    }

    // ───────────────────────── premium distribution ─────────────────────────

    /// Shares distributed across all six slots sum to exactly the premium
    /// paid in (dust goes to the last slot, never vanishes).
    #[kani::proof]
    #[kani::unwind(9)]
    fn proof_premium_distribution_conserves_total() {
        let allocations: [u32; 6] = [
            kani::any(),
            kani::any(),
            kani::any(),
            kani::any(),
            kani::any(),
            kani::any(),
        ];
        let premium: u32 = kani::any();
        kani::assume(allocations.iter().all(|&a| a < 10_000));
        kani::assume(allocations.iter().any(|&a| a > 0));
        kani::assume(premium < 10_000);

        let shares = distribute_premium(allocations, premium);
        let total: u64 = shares.iter().map(|&s| s as u64).sum();
        assert_eq!(total, premium as u64);
    }

    /// A zero-weight slot never receives a share (except via last-slot dust,
    /// which only lands on index 5).
    #[kani::proof]
    #[kani::unwind(9)]
    fn proof_premium_zero_weight_gets_nothing_except_dust_slot() {
        let allocations: [u32; 6] = [0, kani::any(), 0, kani::any(), 0, kani::any()];
        let premium: u32 = kani::any();
        kani::assume(allocations.iter().all(|&a| a < 10_000));
        kani::assume(allocations.iter().any(|&a| a > 0));
        kani::assume(premium < 10_000);

        let shares = distribute_premium(allocations, premium);
        assert_eq!(shares[0], 0);
        assert_eq!(shares[2], 0);
    }

    // ───────────────────────── circuit breaker ─────────────────────────

    /// The breaker never trips below its own threshold.
    #[kani::proof]
    #[kani::unwind(9)]
    fn proof_circuit_breaker_respects_threshold() {
        let losses: u32 = kani::any();
        let capital: u32 = kani::any();
        kani::assume(capital > 0 && capital < 100_000);
        kani::assume(losses < 100_000);

        let threshold = (capital as u64) * 1_000 / 10_000;
        if (losses as u64) <= threshold {
            assert!(!circuit_breaker_trips(losses, capital, 1_000));
        }
    }

    /// Zero capital trips on any positive loss (can't divide by zero
    /// capital to define a ratio, so any loss is infinite relative loss).
    #[kani::proof]
    #[kani::unwind(9)]
    fn proof_circuit_breaker_zero_capital_trips_on_any_loss() {
        let losses: u32 = kani::any();
        kani::assume(losses > 0 && losses < 100_000);
        assert!(circuit_breaker_trips(losses, 0, 1_000));
    }

    // ───────────────────────── retry schedule ─────────────────────────

    /// Retry delay strictly doubles until the schedule is exhausted.
    #[kani::proof]
    #[kani::unwind(9)]
    fn proof_retry_delay_doubles_until_exhausted() {
        let count: u32 = kani::any();
        kani::assume(count + 1 < MAX_RETRIES);

        match (retry_delay_secs(count), retry_delay_secs(count + 1)) {
            (Some(a), Some(b)) => assert_eq!(b, 2 * a),
            _ => {}
        }
    }

    /// The schedule is exhausted at exactly `MAX_RETRIES`, never before.
    #[kani::proof]
    #[kani::unwind(9)]
    fn proof_retry_delay_exhausts_at_max_retries() {
        assert!(retry_delay_secs(MAX_RETRIES - 1).is_some());
        assert!(retry_delay_secs(MAX_RETRIES).is_none());
    }
}
