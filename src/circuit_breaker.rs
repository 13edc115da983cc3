//! Rolling 24h loss-rate circuit breaker.
//!
//! `CircuitBreakerState` (the POD data) lives in `state.rs`, alongside the
//! rest of the persisted account layout; the roll-forward and trip-check
//! logic lives here as plain functions over that state, in the style of
//! `Tranche::pool_value()`'s small checked-arithmetic accessors.

use crate::math;
use crate::state::CircuitBreakerState;

pub const WINDOW_SECS: i64 = 86_400;
pub const THRESHOLD_BPS: u16 = 1_000;

/// Roll the window forward if `now` is past `window_start_ts + WINDOW_SECS`,
/// resetting `losses_in_window` and re-baselining `capital_at_window_start`.
/// Must be called before recording a loss so the loss lands in the correct
/// window.
pub fn roll_window(breaker: &mut CircuitBreakerState, now: i64, total_capital: u64) {
    if now.saturating_sub(breaker.window_start_ts) >= WINDOW_SECS {
        breaker.window_start_ts = now;
        breaker.losses_in_window = 0;
        breaker.capital_at_window_start = total_capital;
        breaker.tripped = 0;
    }
}

/// Record a loss into the current window and report whether the breaker
/// trips as a result. Does not roll the window — call `roll_window` first.
pub fn record_loss(breaker: &mut CircuitBreakerState, loss_amount: u64) -> bool {
    breaker.losses_in_window = breaker.losses_in_window.saturating_add(loss_amount);
    let trips = math::circuit_breaker_trips(
        breaker.losses_in_window,
        breaker.capital_at_window_start,
        THRESHOLD_BPS,
    );
    if trips {
        breaker.tripped = 1;
    }
    trips
}

pub fn is_tripped(breaker: &CircuitBreakerState) -> bool {
    breaker.tripped == 1
}
