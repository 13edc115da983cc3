use solana_program::program_error::ProgramError;

/// Error taxonomy for the vault.
///
/// Split into two bands, per the external contract: **policy errors** (0..9)
/// are returned directly to the caller with no state mutation — the
/// operation never started. **Integrity events** (10..19) are observable
/// consequences of an operation that did partially execute; some of them can
/// trip the circuit breaker or force `VaultState.paused`. Both bands convert
/// to `ProgramError::Custom` the same way; the split is informational (it
/// governs which variants `processor.rs` logs at `warn!`/`error!` instead of
/// `debug!`) and is asserted by `tests/error_codes.rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum VaultError {
    // ---- policy errors: no mutation occurred ----
    /// Caller is not the address authorized for this operation.
    Unauthorized = 0,
    /// Vault is paused and this operation is not one of the ones that drain
    /// inflight state regardless of pause.
    Paused = 1,
    /// Caller did not attach enough gas budget to cover the external dispatch.
    InsufficientGas = 2,
    /// The tranche involved is held by another pending transaction's lock.
    TrancheLocked = 3,
    /// Reentrant call into premium distribution or waterfall while one is
    /// already in flight.
    Reentrancy = 4,
    /// Depositor balance or vault liquidity is smaller than requested.
    InsufficientBalance = 5,
    /// Tranche id outside 1..=6.
    InvalidTranche = 6,
    /// Amount argument was zero where a positive amount is required.
    ZeroAmount = 7,
    /// Unrecognized bonding-curve discriminant.
    InvalidCurve = 8,
    /// `Σ allocation_bps` across the six tranches did not equal 10_000.
    InvalidAllocationSum = 9,

    // ---- integrity events: partial execution occurred, may auto-pause ----
    /// Cumulative losses in the rolling 24h window exceeded the threshold.
    CircuitBreakerTripped = 10,
    /// A tranche's NAV is approaching the representable fixed-point ceiling.
    OverflowApproaching = 11,
    /// Waterfall exhausted all six tranches' capital before absorbing the
    /// full loss.
    Insolvent = 12,
    /// A pending transaction exhausted its retry schedule without an ack.
    BounceExhausted = 13,
    /// A payout was requested for a `PendingTx` already in a terminal state.
    AlreadyPaid = 14,
    /// Rollback could not refund the depositor and the amount is stranded
    /// pending manual claim.
    RefundUnclaimed = 15,
    /// Checked arithmetic overflowed.
    ArithmeticOverflow = 16,
    /// No `PendingTx` exists for the given `tx_id`.
    PendingTxNotFound = 17,
    /// The `PendingTx` for this `tx_id` already left the `Pending` state.
    PendingTxAlreadyResolved = 18,
    /// `VaultState.seq_no` is within the near-overflow watermark.
    SeqNoOverflow = 19,
}

impl From<VaultError> for ProgramError {
    fn from(e: VaultError) -> Self {
        ProgramError::Custom(e as u32)
    }
}
