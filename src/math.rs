//! Pure NAV / share / waterfall math — extracted for Kani formal verification.
//!
//! No Solana/Pubkey dependencies. Just arithmetic, mirrored (with narrower
//! integer types) into `kani-proofs`.

use crate::curve::{self, CurveId};

/// Fixed-point scale: 9 fractional digits, per the "never floating point"
/// design note. `1_000_000_000` represents `1.0`.
pub type Fp = i128;
pub const FP_SCALE: Fp = 1_000_000_000;

/// EQT's NAV is capped at 1.25x; anything a premium credit would push above
/// that is diverted to `protocol_earned_overflow` instead of
/// `accumulated_yield`.
pub const EQT_NAV_CAP_FP: Fp = 1_250_000_000;

/// Fixed-point multiply: `a * b / SCALE`. Both operands and the result are
/// scaled by `FP_SCALE`.
pub fn fp_mul(a: Fp, b: Fp) -> Option<Fp> {
    a.checked_mul(b)?.checked_div(FP_SCALE)
}

/// Fixed-point divide: `a * SCALE / b`.
pub fn fp_div(a: Fp, b: Fp) -> Option<Fp> {
    if b == 0 {
        return None;
    }
    a.checked_mul(FP_SCALE)?.checked_div(b)
}

/// Per-share NAV, blending the tranche's bonding curve with the ratio of
/// actual value (`capital + accumulated_yield`) to par contributions
/// (`capital_basis`). See DESIGN.md for why both a curve and a ratio are
/// needed. `capital_basis == 0` has no defined NAV — the caller (`Tranche`)
/// must special-case the true-first-depositor path before reaching here.
#[allow(clippy::too_many_arguments)]
pub fn nav_per_share(
    curve_id: CurveId,
    apy_max_bps: u16,
    elapsed_secs: i64,
    capital: u64,
    accumulated_yield: u64,
    capital_basis: u64,
    apply_eqt_cap: bool,
) -> Option<Fp> {
    if capital_basis == 0 {
        return None;
    }
    let base = curve::curve_nav_fp(curve_id, apy_max_bps, elapsed_secs)?;
    let value = (capital as i128).checked_add(accumulated_yield as i128)?;
    let ratio = fp_div(value, capital_basis as i128)?;
    let nav = fp_mul(base, ratio)?;
    if apply_eqt_cap {
        Some(nav.min(EQT_NAV_CAP_FP))
    } else {
        Some(nav)
    }
}

/// Shares to mint for a deposit into a tranche that already has shares
/// outstanding. The true-first-depositor case (`total_shares == 0`) is
/// handled separately by `calc_shares_for_first_deposit` since it has no
/// well-defined NAV to divide by.
///
/// Rounds down — pool-favoring.
pub fn calc_shares_for_deposit(nav: Fp, amount_base: u64) -> Option<u64> {
    if nav <= 0 {
        return None;
    }
    let amount_fp = (amount_base as i128).checked_mul(FP_SCALE)?;
    let shares = amount_fp.checked_div(nav)?;
    u64::try_from(shares).ok()
}

/// First deposit into a tranche: 1:1. Blocked (`None`) if `capital_basis != 0`
/// with zero shares — orphaned value from a fully-withdrawn-but-not-yet-reset
/// tranche, which must not mint against value nobody's shares cover.
pub fn calc_shares_for_first_deposit(capital_basis: u64, amount_base: u64) -> Option<u64> {
    if capital_basis == 0 {
        Some(amount_base)
    } else {
        None
    }
}

/// Base-currency payout for burning `shares` at a given NAV. Rounds down.
pub fn calc_base_for_withdraw(nav: Fp, shares: u64) -> Option<u64> {
    if nav <= 0 {
        return None;
    }
    (shares as i128).checked_mul(nav)?.checked_div(FP_SCALE).and_then(|v| u64::try_from(v).ok())
}

/// Par-capital reduction attributable to burning `shares_burned` out of
/// `total_shares`, proportional to `capital_basis`. Rounds down.
pub fn calc_basis_reduction(
    capital_basis: u64,
    total_shares: u64,
    shares_burned: u64,
) -> Option<u64> {
    if total_shares == 0 {
        return None;
    }
    let r = (capital_basis as u128)
        .checked_mul(shares_burned as u128)?
        .checked_div(total_shares as u128)?;
    u64::try_from(r).ok()
}

/// Walk the six tranches in waterfall order (equity-first, `WATERFALL_ORDER`)
/// absorbing `loss_amount`. Returns the amount absorbed by each tranche (same
/// order as the input) and any amount left unabsorbed once every tranche is
/// wiped — a non-zero remainder means the vault is insolvent for this loss.
pub fn distribute_loss_waterfall(capitals_in_order: [u64; 6], loss_amount: u64) -> ([u64; 6], u64) {
    let mut remaining = loss_amount;
    let mut absorbed = [0u64; 6];
    for i in 0..6 {
        if remaining == 0 {
            break;
        }
        let take = capitals_in_order[i].min(remaining);
        absorbed[i] = take;
        remaining -= take;
    }
    (absorbed, remaining)
}

/// Split a premium payment across the six tranches by `allocation_bps`
/// weight (fixed tranche-id order 1..=6, *not* waterfall order). Dust from
/// integer rounding is credited to the last slot.
pub fn distribute_premium(allocations_bps: [u16; 6], total_premium: u64) -> [u64; 6] {
    if total_premium == 0 {
        return [0; 6];
    }
    let total_bps: u128 = allocations_bps.iter().map(|&b| b as u128).sum();
    if total_bps == 0 {
        return [0; 6];
    }
    let mut shares = [0u64; 6];
    let mut distributed: u128 = 0;
    for i in 0..6 {
        let share = (total_premium as u128) * (allocations_bps[i] as u128) / total_bps;
        shares[i] = share as u64;
        distributed += share;
    }
    let remainder = (total_premium as u128).saturating_sub(distributed) as u64;
    shares[5] = shares[5].saturating_add(remainder);
    shares
}

/// Given EQT's state and a proposed premium credit, split it into the part
/// that can be credited to `accumulated_yield` without pushing NAV above
/// `nav_cap`, and the part that overflows to `protocol_earned_overflow`.
pub fn eqt_overflow_split(
    capital: u64,
    capital_basis: u64,
    accumulated_yield: u64,
    premium_share: u64,
    base_curve_nav: Fp,
    nav_cap: Fp,
) -> Option<(u64, u64)> {
    if capital_basis == 0 || base_curve_nav <= 0 {
        return Some((premium_share, 0));
    }
    let max_ratio = fp_div(nav_cap, base_curve_nav)?;
    let max_value = max_ratio.checked_mul(capital_basis as i128)?.checked_div(FP_SCALE)?;
    let current_value = (capital as i128).checked_add(accumulated_yield as i128)?;
    let headroom = max_value.checked_sub(current_value)?.max(0);
    let headroom_u64 = u64::try_from(headroom).unwrap_or(u64::MAX);
    let credited = premium_share.min(headroom_u64);
    let overflow = premium_share.saturating_sub(credited);
    Some((credited, overflow))
}

/// Exponential backoff schedule for bounced acks: 1s, 2s, 4s, 8s, 16s, then
/// exhausted. `retry_count` is 0-indexed (the delay before the *next*
/// attempt after `retry_count` prior attempts).
pub const MAX_RETRIES: u8 = 5;

pub fn retry_delay_secs(retry_count: u8) -> Option<i64> {
    if retry_count >= MAX_RETRIES {
        None
    } else {
        Some(1i64 << retry_count)
    }
}

/// Whether cumulative losses in the current window trip the breaker:
/// `losses_in_window` (after adding the new loss) exceeds `threshold_bps` of
/// `capital_at_window_start`.
pub fn circuit_breaker_trips(
    losses_in_window: u64,
    capital_at_window_start: u64,
    threshold_bps: u16,
) -> bool {
    if capital_at_window_start == 0 {
        return losses_in_window > 0;
    }
    let threshold = (capital_at_window_start as u128) * (threshold_bps as u128) / 10_000;
    (losses_in_window as u128) > threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fp_mul_identity() {
        assert_eq!(fp_mul(FP_SCALE, FP_SCALE), Some(FP_SCALE));
    }

    #[test]
    fn test_fp_div_identity() {
        assert_eq!(fp_div(FP_SCALE, FP_SCALE), Some(FP_SCALE));
    }

    #[test]
    fn test_fp_div_by_zero() {
        assert_eq!(fp_div(FP_SCALE, 0), None);
    }

    #[test]
    fn test_first_depositor_gets_1_to_1() {
        assert_eq!(calc_shares_for_first_deposit(0, 1_000_000), Some(1_000_000));
    }

    #[test]
    fn test_first_depositor_blocked_on_orphaned_basis() {
        assert_eq!(calc_shares_for_first_deposit(500, 1_000_000), None);
    }

    #[test]
    fn test_calc_shares_pro_rata_at_flat_nav() {
        // nav == 1.0 exactly → shares == amount
        assert_eq!(calc_shares_for_deposit(FP_SCALE, 1_000), Some(1_000));
    }

    #[test]
    fn test_calc_shares_rounds_down() {
        // nav == 1.5 → 999 / 1.5 = 666
        assert_eq!(calc_shares_for_deposit(1_500_000_000, 999), Some(666));
    }

    #[test]
    fn test_calc_base_for_withdraw_at_flat_nav() {
        assert_eq!(calc_base_for_withdraw(FP_SCALE, 1_000), Some(1_000));
    }

    #[test]
    fn test_calc_basis_reduction_proportional() {
        assert_eq!(calc_basis_reduction(2_000, 1_000, 250), Some(500));
    }

    #[test]
    fn test_waterfall_eqt_absorbs_first() {
        // capitals in WATERFALL_ORDER: [EQT, JNR_PLUS, JNR, MEZZ, SNR, BTC]
        let capitals = [100, 200, 300, 400, 500, 600];
        let (absorbed, remainder) = distribute_loss_waterfall(capitals, 50);
        assert_eq!(absorbed, [50, 0, 0, 0, 0, 0]);
        assert_eq!(remainder, 0);
    }

    #[test]
    fn test_waterfall_cascades_through_wiped_tranches() {
        let capitals = [100, 200, 300, 400, 500, 600];
        let (absorbed, remainder) = distribute_loss_waterfall(capitals, 350);
        assert_eq!(absorbed, [100, 200, 50, 0, 0, 0]);
        assert_eq!(remainder, 0);
    }

    #[test]
    fn test_waterfall_insolvent_when_loss_exceeds_total_capital() {
        let capitals = [10, 10, 10, 10, 10, 10];
        let (absorbed, remainder) = distribute_loss_waterfall(capitals, 1_000);
        assert_eq!(absorbed, [10, 10, 10, 10, 10, 10]);
        assert_eq!(remainder, 940);
    }

    #[test]
    fn test_distribute_premium_matches_allocation_weights() {
        let shares = distribute_premium([1_000, 2_000, 2_000, 2_000, 1_000, 2_000], 1_000);
        assert_eq!(shares, [100, 200, 200, 200, 100, 200]);
    }

    #[test]
    fn test_distribute_premium_dust_goes_to_last_slot() {
        let shares = distribute_premium([3_333, 3_333, 3_334], 10);
        // only first three slots used in this synthetic 3-weight case would need padding;
        // exercise the real 6-slot path instead with a non-dividing total.
        let shares6 = distribute_premium([1_000, 1_000, 1_000, 1_000, 1_000, 5_000], 7);
        let total: u64 = shares6.iter().sum();
        assert_eq!(total, 7);
        let _ = shares;
    }

    #[test]
    fn test_eqt_overflow_split_under_cap_credits_everything() {
        // capital_basis 1_000, capital 1_000, yield 0 → value/basis == 1.0,
        // base curve 1.0 → nav 1.0, cap 1.25, headroom is large.
        let (credited, overflow) =
            eqt_overflow_split(1_000, 1_000, 0, 100, FP_SCALE, EQT_NAV_CAP_FP).unwrap();
        assert_eq!(credited, 100);
        assert_eq!(overflow, 0);
    }

    #[test]
    fn test_eqt_overflow_split_caps_excess() {
        // value already at the cap (1_250 / 1_000 == 1.25) → no headroom left.
        let (credited, overflow) =
            eqt_overflow_split(1_000, 1_000, 250, 100, FP_SCALE, EQT_NAV_CAP_FP).unwrap();
        assert_eq!(credited, 0);
        assert_eq!(overflow, 100);
    }

    #[test]
    fn test_eqt_overflow_split_partial() {
        // value at 1_200 / 1_000 = 1.20, cap at 1.25 → headroom 50.
        let (credited, overflow) =
            eqt_overflow_split(1_000, 1_000, 200, 100, FP_SCALE, EQT_NAV_CAP_FP).unwrap();
        assert_eq!(credited, 50);
        assert_eq!(overflow, 50);
    }

    #[test]
    fn test_retry_delay_schedule() {
        assert_eq!(retry_delay_secs(0), Some(1));
        assert_eq!(retry_delay_secs(1), Some(2));
        assert_eq!(retry_delay_secs(2), Some(4));
        assert_eq!(retry_delay_secs(3), Some(8));
        assert_eq!(retry_delay_secs(4), Some(16));
        assert_eq!(retry_delay_secs(5), None);
    }

    #[test]
    fn test_circuit_breaker_trips_over_threshold() {
        // 10% of 10_000 == 1_000
        assert!(!circuit_breaker_trips(1_000, 10_000, 1_000));
        assert!(circuit_breaker_trips(1_001, 10_000, 1_000));
    }

    #[test]
    fn test_circuit_breaker_zero_capital_trips_on_any_loss() {
        assert!(circuit_breaker_trips(1, 0, 1_000));
        assert!(!circuit_breaker_trips(0, 0, 1_000));
    }
}
