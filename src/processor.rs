//! The vault engine: all six tranches, the depositor ledger, the pending-tx
//! journal and the circuit breaker, wired together into one `Vault<G>`.
//!
//! A stateless `fn process(program_id, accounts, data)` that borrows its
//! state fresh out of `AccountInfo` on every call doesn't fit this vault's
//! state directly — six fixed tranches plus an unbounded depositor/pending-tx
//! ledger has no static size to give a PDA — so it's modeled as a long-lived
//! struct with one method per external operation instead, and
//! `dispatch_bytes` plays the role a top-level `process` entry point would.

use std::collections::BTreeMap;

use bytemuck::Zeroable;
use solana_program::entrypoint::ProgramResult;
use solana_program::pubkey::Pubkey;

use crate::circuit_breaker;
use crate::curve::{self, CurveId};
use crate::error::VaultError;
use crate::events::VaultEvent;
use crate::gateway::Gateway;
use crate::instruction::VaultOperation;
use crate::locks;
use crate::math;
use crate::state::{
    tranche_index, CircuitBreakerState, DepositorEntry, OpKind, PendingTx, Tranche, TrancheLock,
    TxStatus, VaultState, TRANCHE_EQT, WATERFALL_ORDER,
};

/// Tunables that aren't part of the persisted account layout, grouped into
/// one struct (rather than free-standing constants) so tests can override
/// them.
#[derive(Debug, Clone, Copy)]
pub struct VaultConfig {
    pub lock_duration_secs: i64,
    pub min_deposit_gas: u64,
    pub min_withdraw_gas: u64,
    /// `seq_no` value at which the vault auto-pauses and emits
    /// `OverflowWarning`, per the near-`u32::MAX` watermark.
    pub seq_no_watermark: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            lock_duration_secs: 60,
            min_deposit_gas: 5_000,
            min_withdraw_gas: 5_000,
            seq_no_watermark: u32::MAX - 10,
        }
    }
}

/// Default per-tranche risk/reward bands. Not named by the op table itself —
/// an implementation has to start the six tranches somewhere, and governance
/// can retune them afterward via `SET_TRANCHE_PARAMS`.
const DEFAULT_TRANCHE_PARAMS: [(u8, CurveId, u16, u16, u16); 6] = [
    (crate::state::TRANCHE_BTC, CurveId::Flat, 200, 400, 1_000),
    (crate::state::TRANCHE_SNR, CurveId::Linear, 400, 700, 1_500),
    (crate::state::TRANCHE_MEZZ, CurveId::Logarithmic, 700, 1_100, 2_000),
    (crate::state::TRANCHE_JNR, CurveId::Sigmoid, 1_100, 1_600, 2_000),
    (crate::state::TRANCHE_JNR_PLUS, CurveId::Quadratic, 1_600, 2_200, 1_500),
    (TRANCHE_EQT, CurveId::CappedExponential, 2_200, 5_000, 2_000),
];

pub struct Vault<G: Gateway> {
    pub state: VaultState,
    pub tranches: [Tranche; 6],
    pub locks: [TrancheLock; 6],
    pub breaker: CircuitBreakerState,
    pub depositors: BTreeMap<(Pubkey, u8), DepositorEntry>,
    pub pending: BTreeMap<u64, PendingTx>,
    pub next_tx_id: u64,
    /// Anchor for every tranche's "elapsed-years from protocol epoch" curve
    /// input — one epoch for the whole vault, not per-tranche.
    pub epoch_ts: i64,
    pub config: VaultConfig,
    pub gateway: G,
    pub events: Vec<VaultEvent>,
}

impl<G: Gateway> Vault<G> {
    pub fn new(
        admin: Pubkey,
        claims_processor: Pubkey,
        factory: Pubkey,
        oracle: Pubkey,
        epoch_ts: i64,
        gateway: G,
    ) -> Self {
        Self::with_config(admin, claims_processor, factory, oracle, epoch_ts, gateway, VaultConfig::default())
    }

    pub fn with_config(
        admin: Pubkey,
        claims_processor: Pubkey,
        factory: Pubkey,
        oracle: Pubkey,
        epoch_ts: i64,
        gateway: G,
        config: VaultConfig,
    ) -> Self {
        let mut state = VaultState::zeroed();
        state.admin = admin.to_bytes();
        state.claims_processor = claims_processor.to_bytes();
        state.factory = factory.to_bytes();
        state.oracle = oracle.to_bytes();
        state.version = 1;

        let tranches = DEFAULT_TRANCHE_PARAMS.map(|(id, curve_id, apy_min, apy_max, alloc)| {
            let mut t = Tranche::zeroed();
            t.id = id;
            t.curve_id = curve_id.to_u8();
            t.apy_min_bps = apy_min;
            t.apy_max_bps = apy_max;
            t.allocation_bps = alloc;
            t
        });

        // Start the window already "expired" so the first `absorb_loss` call
        // re-baselines `capital_at_window_start` against whatever capital has
        // actually accumulated by then, rather than freezing it at the
        // pre-deposit value of 0 for a full 24h from construction.
        let mut breaker = CircuitBreakerState::zeroed();
        breaker.window_start_ts = i64::MIN / 2;

        Self {
            state,
            tranches,
            locks: [TrancheLock::zeroed(); 6],
            breaker,
            depositors: BTreeMap::new(),
            pending: BTreeMap::new(),
            next_tx_id: 1,
            epoch_ts,
            config,
            gateway,
            events: Vec::new(),
        }
    }

    fn elapsed(&self, now: i64) -> i64 {
        now.saturating_sub(self.epoch_ts)
    }

    fn emit(&mut self, event: VaultEvent) {
        match &event {
            VaultEvent::CircuitBreakerTripped { .. }
            | VaultEvent::Insolvent { .. }
            | VaultEvent::OverflowWarning { .. }
            | VaultEvent::RefundUnclaimed { .. } => {
                tracing::warn!(?event, "vault integrity event");
            }
            _ => tracing::debug!(?event, "vault event"),
        }
        self.events.push(event);
    }

    /// Bump `seq_no` and auto-pause once it nears the `u32` ceiling. Every
    /// state-mutating operation calls this exactly once, on success.
    fn bump_seq(&mut self) {
        self.state.seq_no = self.state.seq_no.wrapping_add(1);
        if self.state.seq_no >= self.config.seq_no_watermark {
            self.state.paused = 1;
            self.emit(VaultEvent::OverflowWarning { seq_no: self.state.seq_no });
        }
    }

    // ---- deposit / withdraw (two-phase) ----

    pub fn deposit(
        &mut self,
        user: Pubkey,
        tranche_id: u8,
        amount_base: u64,
        gas_budget: u64,
        now: i64,
    ) -> Result<u64, VaultError> {
        if self.state.is_paused() {
            return Err(VaultError::Paused);
        }
        if amount_base == 0 {
            return Err(VaultError::ZeroAmount);
        }
        if gas_budget < self.config.min_deposit_gas {
            return Err(VaultError::InsufficientGas);
        }
        let idx = tranche_index(tranche_id).ok_or(VaultError::InvalidTranche)?;
        let tx_id = self.next_tx_id;
        locks::acquire(&mut self.locks[idx], tx_id, now, self.config.lock_duration_secs)?;

        let elapsed = self.elapsed(now);
        let shares = match self.tranches[idx].calc_shares_for_deposit(amount_base, elapsed) {
            Some(s) if s > 0 => s,
            _ => {
                locks::release(&mut self.locks[idx], tx_id);
                return Err(VaultError::ArithmeticOverflow);
            }
        };

        {
            let tranche = &mut self.tranches[idx];
            tranche.capital = tranche.capital.checked_add(amount_base).ok_or(VaultError::ArithmeticOverflow)?;
            tranche.capital_basis =
                tranche.capital_basis.checked_add(amount_base).ok_or(VaultError::ArithmeticOverflow)?;
            tranche.total_shares = tranche.total_shares.checked_add(shares).ok_or(VaultError::ArithmeticOverflow)?;
        }
        self.state.total_capital =
            self.state.total_capital.checked_add(amount_base).ok_or(VaultError::ArithmeticOverflow)?;

        let entry = self.depositors.entry((user, tranche_id)).or_insert_with(|| DepositorEntry::new(0, now));
        entry.balance = entry.balance.checked_add(shares).ok_or(VaultError::ArithmeticOverflow)?;

        self.pending.insert(
            tx_id,
            PendingTx {
                tx_id,
                op_kind: OpKind::Deposit,
                user,
                tranche_id,
                amount_base,
                amount_shares: shares,
                status: TxStatus::Pending,
                retry_count: 0,
                next_retry_ts: 0,
                created_ts: now,
                basis_reduction: 0,
                yield_drawn: 0,
            },
        );
        self.next_tx_id += 1;

        self.gateway.dispatch_mint(tranche_id, &user, shares, tx_id);
        Ok(tx_id)
    }

    pub fn ack_mint(&mut self, tx_id: u64, caller: &Pubkey, now: i64) -> Result<(), VaultError> {
        let ptx = self.pending.get(&tx_id).copied().ok_or(VaultError::PendingTxNotFound)?;
        if ptx.op_kind != OpKind::Deposit {
            return Err(VaultError::PendingTxNotFound);
        }
        if ptx.status != TxStatus::Pending {
            return Err(VaultError::PendingTxAlreadyResolved);
        }
        let idx = tranche_index(ptx.tranche_id).ok_or(VaultError::InvalidTranche)?;
        let expected = self.tranches[idx].lp_token_ref_pubkey().ok_or(VaultError::Unauthorized)?;
        if expected != *caller {
            return Err(VaultError::Unauthorized);
        }

        self.pending.get_mut(&tx_id).unwrap().status = TxStatus::Committed;
        locks::release(&mut self.locks[idx], tx_id);
        self.emit(VaultEvent::DepositCommitted {
            tx_id,
            user: ptx.user,
            tranche_id: ptx.tranche_id,
            amount_base: ptx.amount_base,
            shares: ptx.amount_shares,
        });
        let _ = now;
        self.bump_seq();
        Ok(())
    }

    pub fn withdraw(
        &mut self,
        user: Pubkey,
        tranche_id: u8,
        shares_to_burn: u64,
        gas_budget: u64,
        now: i64,
    ) -> Result<u64, VaultError> {
        if self.state.is_paused() {
            return Err(VaultError::Paused);
        }
        if shares_to_burn == 0 {
            return Err(VaultError::ZeroAmount);
        }
        if gas_budget < self.config.min_withdraw_gas {
            return Err(VaultError::InsufficientGas);
        }
        let idx = tranche_index(tranche_id).ok_or(VaultError::InvalidTranche)?;

        let balance = self.depositors.get(&(user, tranche_id)).map(|e| e.balance).unwrap_or(0);
        if balance < shares_to_burn {
            return Err(VaultError::InsufficientBalance);
        }

        let tx_id = self.next_tx_id;
        locks::acquire(&mut self.locks[idx], tx_id, now, self.config.lock_duration_secs)?;

        let elapsed = self.elapsed(now);
        let payout = match self.tranches[idx].calc_base_for_withdraw(shares_to_burn, elapsed) {
            Some(p) => p,
            None => {
                locks::release(&mut self.locks[idx], tx_id);
                return Err(VaultError::ArithmeticOverflow);
            }
        };
        let basis_reduction = match math::calc_basis_reduction(
            self.tranches[idx].capital_basis,
            self.tranches[idx].total_shares,
            shares_to_burn,
        ) {
            Some(r) => r,
            None => {
                locks::release(&mut self.locks[idx], tx_id);
                return Err(VaultError::ArithmeticOverflow);
            }
        };

        // `payout` is priced off `pool_value` (capital + accumulated_yield), so
        // it must be drawn from both buckets: realize yield first, then fall
        // back to capital for the remainder.
        let yield_drawn = payout.min(self.tranches[idx].accumulated_yield);
        let capital_drawn = payout - yield_drawn;

        {
            let tranche = &mut self.tranches[idx];
            tranche.accumulated_yield -= yield_drawn;
            tranche.capital =
                tranche.capital.checked_sub(capital_drawn).ok_or(VaultError::ArithmeticOverflow)?;
            tranche.capital_basis =
                tranche.capital_basis.checked_sub(basis_reduction).ok_or(VaultError::ArithmeticOverflow)?;
            tranche.total_shares =
                tranche.total_shares.checked_sub(shares_to_burn).ok_or(VaultError::ArithmeticOverflow)?;
        }
        self.state.total_capital =
            self.state.total_capital.checked_sub(capital_drawn).ok_or(VaultError::ArithmeticOverflow)?;

        let key = (user, tranche_id);
        let entry = self.depositors.get_mut(&key).unwrap();
        entry.balance -= shares_to_burn;
        if entry.is_empty() {
            self.depositors.remove(&key);
        }

        self.pending.insert(
            tx_id,
            PendingTx {
                tx_id,
                op_kind: OpKind::Withdraw,
                user,
                tranche_id,
                amount_base: payout,
                amount_shares: shares_to_burn,
                status: TxStatus::Pending,
                retry_count: 0,
                next_retry_ts: 0,
                created_ts: now,
                basis_reduction,
                yield_drawn,
            },
        );
        self.next_tx_id += 1;

        self.gateway.dispatch_burn(tranche_id, &user, shares_to_burn, tx_id);
        Ok(tx_id)
    }

    pub fn ack_burn(&mut self, tx_id: u64, caller: &Pubkey, now: i64) -> Result<(), VaultError> {
        let ptx = self.pending.get(&tx_id).copied().ok_or(VaultError::PendingTxNotFound)?;
        if ptx.op_kind != OpKind::Withdraw {
            return Err(VaultError::PendingTxNotFound);
        }
        if ptx.status != TxStatus::Pending {
            return Err(VaultError::PendingTxAlreadyResolved);
        }
        let idx = tranche_index(ptx.tranche_id).ok_or(VaultError::InvalidTranche)?;
        let expected = self.tranches[idx].lp_token_ref_pubkey().ok_or(VaultError::Unauthorized)?;
        if expected != *caller {
            return Err(VaultError::Unauthorized);
        }

        self.pending.get_mut(&tx_id).unwrap().status = TxStatus::AwaitingPayout;
        locks::release(&mut self.locks[idx], tx_id);
        self.gateway.dispatch_payout(&ptx.user, ptx.amount_base, tx_id);
        self.emit(VaultEvent::WithdrawCompleted {
            tx_id,
            user: ptx.user,
            tranche_id: ptx.tranche_id,
            amount_base: ptx.amount_base,
            shares: ptx.amount_shares,
        });
        let _ = now;
        self.bump_seq();
        Ok(())
    }

    /// The outbound payout itself bounced (or may have — there is no
    /// synchronous confirmation), so the depositor re-requests it. Succeeds
    /// exactly once per `tx_id`; a second call sees `Paid` and fails with
    /// `AlreadyPaid`.
    pub fn retry_payout(&mut self, tx_id: u64, caller: &Pubkey, now: i64) -> Result<(), VaultError> {
        let ptx = self.pending.get(&tx_id).copied().ok_or(VaultError::PendingTxNotFound)?;
        if ptx.user != *caller {
            return Err(VaultError::Unauthorized);
        }
        match ptx.status {
            TxStatus::AwaitingPayout => {
                self.pending.get_mut(&tx_id).unwrap().status = TxStatus::Paid;
                self.gateway.dispatch_payout(&ptx.user, ptx.amount_base, tx_id);
                self.emit(VaultEvent::RetryPayoutSucceeded {
                    tx_id,
                    user: ptx.user,
                    amount_base: ptx.amount_base,
                });
                let _ = now;
                Ok(())
            }
            TxStatus::Paid => Err(VaultError::AlreadyPaid),
            _ => Err(VaultError::PendingTxAlreadyResolved),
        }
    }

    /// A mint or burn dispatch bounced. Retries up to `math::MAX_RETRIES`
    /// times with exponential backoff; on exhaustion rolls the `PendingTx`
    /// back entirely. No-op if `tx_id` isn't pending (already resolved, or
    /// this bounce arrived for a retry superseded by an ack).
    pub fn on_bounce(&mut self, tx_id: u64, now: i64) {
        let Some(ptx) = self.pending.get(&tx_id).copied() else { return };
        if ptx.status != TxStatus::Pending {
            return;
        }
        let Some(idx) = tranche_index(ptx.tranche_id) else { return };

        if ptx.retry_count < math::MAX_RETRIES {
            if let Some(delay) = math::retry_delay_secs(ptx.retry_count) {
                let new_count = ptx.retry_count + 1;
                let p = self.pending.get_mut(&tx_id).unwrap();
                p.retry_count = new_count;
                p.next_retry_ts = now + delay;
                self.emit(VaultEvent::BounceRetry { tx_id, retry_count: new_count });
            }
            return;
        }

        // retry schedule exhausted (retry_count == MAX_RETRIES) — roll back
        match ptx.op_kind {
            OpKind::Deposit => {
                let tranche = &mut self.tranches[idx];
                tranche.capital = tranche.capital.saturating_sub(ptx.amount_base);
                tranche.capital_basis = tranche.capital_basis.saturating_sub(ptx.amount_base);
                tranche.total_shares = tranche.total_shares.saturating_sub(ptx.amount_shares);
                self.state.total_capital = self.state.total_capital.saturating_sub(ptx.amount_base);

                let key = (ptx.user, ptx.tranche_id);
                if let Some(e) = self.depositors.get_mut(&key) {
                    e.balance = e.balance.saturating_sub(ptx.amount_shares);
                    if e.is_empty() {
                        self.depositors.remove(&key);
                    }
                }
                self.gateway.dispatch_payout(&ptx.user, ptx.amount_base, tx_id);
                self.emit(VaultEvent::DepositRolledBack {
                    tx_id,
                    user: ptx.user,
                    tranche_id: ptx.tranche_id,
                    amount_base: ptx.amount_base,
                });
            }
            OpKind::Withdraw => {
                let capital_drawn = ptx.amount_base.saturating_sub(ptx.yield_drawn);
                let tranche = &mut self.tranches[idx];
                tranche.accumulated_yield = tranche.accumulated_yield.saturating_add(ptx.yield_drawn);
                tranche.capital = tranche.capital.saturating_add(capital_drawn);
                tranche.capital_basis = tranche.capital_basis.saturating_add(ptx.basis_reduction);
                tranche.total_shares = tranche.total_shares.saturating_add(ptx.amount_shares);
                self.state.total_capital = self.state.total_capital.saturating_add(capital_drawn);

                let key = (ptx.user, ptx.tranche_id);
                let entry = self.depositors.entry(key).or_insert_with(|| DepositorEntry::new(0, now));
                entry.balance = entry.balance.saturating_add(ptx.amount_shares);
                self.emit(VaultEvent::WithdrawRolledBack {
                    tx_id,
                    user: ptx.user,
                    tranche_id: ptx.tranche_id,
                    shares: ptx.amount_shares,
                });
            }
        }

        self.pending.get_mut(&tx_id).unwrap().status = TxStatus::RolledBack;
        locks::release(&mut self.locks[idx], tx_id);
    }

    /// Drop terminal `PendingTx` entries (`Committed`, `Paid`, `RolledBack`)
    /// from the journal. Never called automatically — callers decide when
    /// the history is no longer worth keeping around.
    pub fn compact(&mut self) {
        self.pending.retain(|_, p| matches!(p.status, TxStatus::Pending | TxStatus::AwaitingPayout));
    }

    pub fn pending_tx(&self, tx_id: u64) -> Option<&PendingTx> {
        self.pending.get(&tx_id)
    }

    // ---- premium distribution ----

    pub fn distribute_premium(&mut self, caller: Pubkey, premium_amount: u64, now: i64) -> Result<(), VaultError> {
        if self.state.is_paused() {
            return Err(VaultError::Paused);
        }
        if premium_amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        if caller != self.state.factory_pubkey() {
            return Err(VaultError::Unauthorized);
        }

        locks::enter(&mut self.state)?;
        let result = self.distribute_premium_inner(premium_amount, now);
        locks::exit(&mut self.state);
        result
    }

    fn distribute_premium_inner(&mut self, premium_amount: u64, now: i64) -> Result<(), VaultError> {
        let allocations: [u16; 6] = core::array::from_fn(|i| self.tranches[i].allocation_bps);
        let shares = math::distribute_premium(allocations, premium_amount);

        for i in 0..6 {
            if self.tranches[i].id == TRANCHE_EQT {
                let elapsed = self.elapsed(now);
                let base_curve = curve::curve_nav_fp(self.tranches[i].curve(), self.tranches[i].apy_max_bps, elapsed)
                    .ok_or(VaultError::ArithmeticOverflow)?;
                let (credited, overflow) = math::eqt_overflow_split(
                    self.tranches[i].capital,
                    self.tranches[i].capital_basis,
                    self.tranches[i].accumulated_yield,
                    shares[i],
                    base_curve,
                    math::EQT_NAV_CAP_FP,
                )
                .ok_or(VaultError::ArithmeticOverflow)?;
                self.tranches[i].accumulated_yield =
                    self.tranches[i].accumulated_yield.checked_add(credited).ok_or(VaultError::ArithmeticOverflow)?;
                self.tranches[i].protocol_earned_overflow = self.tranches[i]
                    .protocol_earned_overflow
                    .checked_add(overflow)
                    .ok_or(VaultError::ArithmeticOverflow)?;
            } else {
                self.tranches[i].accumulated_yield = self.tranches[i]
                    .accumulated_yield
                    .checked_add(shares[i])
                    .ok_or(VaultError::ArithmeticOverflow)?;
            }
        }

        self.state.accumulated_premiums =
            self.state.accumulated_premiums.checked_add(premium_amount).ok_or(VaultError::ArithmeticOverflow)?;
        self.emit(VaultEvent::PremiumDistributed { premium_amount, per_tranche_shares: shares });
        self.bump_seq();
        Ok(())
    }

    // ---- loss waterfall ----

    /// Six-tranche equity-first loss waterfall. Applies the loss first, then
    /// checks the rolling circuit breaker — a loss that itself trips the
    /// breaker is still absorbed; it's the *next* `absorb_loss` call that
    /// gets rejected, since the breaker is already `tripped` by then. See
    /// DESIGN.md for why this ordering (rather than a pre-admission check)
    /// is what the worked example requires.
    pub fn absorb_loss(&mut self, caller: Pubkey, loss_amount: u64, now: i64) -> Result<(), VaultError> {
        if loss_amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        if caller != self.state.claims_processor_pubkey() {
            return Err(VaultError::Unauthorized);
        }

        circuit_breaker::roll_window(&mut self.breaker, now, self.state.total_capital);
        if circuit_breaker::is_tripped(&self.breaker) {
            return Err(VaultError::CircuitBreakerTripped);
        }
        if self.state.is_paused() {
            return Err(VaultError::Paused);
        }

        let tx_id = self.next_tx_id;
        self.next_tx_id += 1;
        locks::acquire_all(&mut self.locks, tx_id, now, self.config.lock_duration_secs)?;

        let capitals_in_order: [u64; 6] =
            core::array::from_fn(|i| self.tranches[tranche_index(WATERFALL_ORDER[i]).unwrap()].capital);
        let (absorbed_in_order, remainder) = math::distribute_loss_waterfall(capitals_in_order, loss_amount);

        let mut per_tranche_absorption = [0u64; 6];
        for i in 0..6 {
            let idx = tranche_index(WATERFALL_ORDER[i]).unwrap();
            let amt = absorbed_in_order[i];
            self.tranches[idx].capital -= amt;
            per_tranche_absorption[idx] = amt;
        }
        let absorbed_total = loss_amount - remainder;
        self.state.total_capital = self.state.total_capital.saturating_sub(absorbed_total);
        self.state.accumulated_losses =
            self.state.accumulated_losses.checked_add(absorbed_total).ok_or(VaultError::ArithmeticOverflow)?;

        locks::release_all(&mut self.locks, tx_id);
        self.emit(VaultEvent::LossAbsorbed { loss_amount, per_tranche_absorption });

        if remainder > 0 {
            self.state.paused = 1;
            self.emit(VaultEvent::Insolvent { loss_amount, unabsorbed: remainder });
        }

        if circuit_breaker::record_loss(&mut self.breaker, absorbed_total) {
            self.state.paused = 1;
            self.emit(VaultEvent::CircuitBreakerTripped { losses_in_window: self.breaker.losses_in_window });
        }

        self.bump_seq();
        Ok(())
    }

    // ---- admin ----

    pub fn pause(&mut self, caller: Pubkey) -> Result<(), VaultError> {
        if caller != self.state.admin_pubkey() {
            return Err(VaultError::Unauthorized);
        }
        self.state.paused = 1;
        self.emit(VaultEvent::Paused);
        Ok(())
    }

    pub fn unpause(&mut self, caller: Pubkey) -> Result<(), VaultError> {
        if caller != self.state.admin_pubkey() {
            return Err(VaultError::Unauthorized);
        }
        self.state.paused = 0;
        self.emit(VaultEvent::Unpaused);
        Ok(())
    }

    /// One-time per tranche; a second call is rejected rather than allowed
    /// to repoint a live tranche at a different LP-token contract.
    pub fn set_tranche_token(&mut self, caller: Pubkey, tranche_id: u8, address: Pubkey) -> Result<(), VaultError> {
        if caller != self.state.admin_pubkey() {
            return Err(VaultError::Unauthorized);
        }
        let idx = tranche_index(tranche_id).ok_or(VaultError::InvalidTranche)?;
        if self.tranches[idx].lp_token_ref_set == 1 {
            return Err(VaultError::Unauthorized);
        }
        self.tranches[idx].set_lp_token_ref(&address);
        Ok(())
    }

    pub fn set_tranche_params(
        &mut self,
        caller: Pubkey,
        tranche_id: u8,
        apy_min_bps: u16,
        apy_max_bps: u16,
        curve_id: u8,
        allocation_bps: u16,
    ) -> Result<(), VaultError> {
        if caller != self.state.admin_pubkey() {
            return Err(VaultError::Unauthorized);
        }
        let idx = tranche_index(tranche_id).ok_or(VaultError::InvalidTranche)?;
        CurveId::from_u8(curve_id).ok_or(VaultError::InvalidCurve)?;

        let mut total: u32 = allocation_bps as u32;
        for (i, t) in self.tranches.iter().enumerate() {
            if i != idx {
                total += t.allocation_bps as u32;
            }
        }
        if total != 10_000 {
            return Err(VaultError::InvalidAllocationSum);
        }

        let tranche = &mut self.tranches[idx];
        tranche.apy_min_bps = apy_min_bps;
        tranche.apy_max_bps = apy_max_bps;
        tranche.curve_id = curve_id;
        tranche.allocation_bps = allocation_bps;
        Ok(())
    }

    pub fn flush_eqt_overflow(&mut self, caller: Pubkey, target: Pubkey) -> Result<u64, VaultError> {
        if caller != self.state.admin_pubkey() {
            return Err(VaultError::Unauthorized);
        }
        let idx = tranche_index(TRANCHE_EQT).unwrap();
        let amount = self.tranches[idx].protocol_earned_overflow;
        if amount == 0 {
            return Ok(0);
        }
        self.tranches[idx].protocol_earned_overflow = 0;

        let tx_id = self.next_tx_id;
        self.next_tx_id += 1;
        self.gateway.dispatch_payout(&target, amount, tx_id);
        self.emit(VaultEvent::EqtOverflowFlushed { target, amount });
        Ok(amount)
    }

    // ---- read-only views ----

    pub fn total_capital(&self) -> u64 {
        self.state.total_capital
    }

    pub fn tranche_capital(&self, tranche_id: u8) -> Option<u64> {
        tranche_index(tranche_id).map(|i| self.tranches[i].capital)
    }

    pub fn tranche_nav(&self, tranche_id: u8, now: i64) -> Option<math::Fp> {
        let i = tranche_index(tranche_id)?;
        self.tranches[i].nav_per_share(self.elapsed(now))
    }

    pub fn tranche_apy_bps(&self, tranche_id: u8) -> Option<(u16, u16)> {
        let i = tranche_index(tranche_id)?;
        Some((self.tranches[i].apy_min_bps, self.tranches[i].apy_max_bps))
    }

    pub fn depositor_balance(&self, user: &Pubkey, tranche_id: u8) -> u64 {
        self.depositors.get(&(*user, tranche_id)).map(|e| e.balance).unwrap_or(0)
    }

    pub fn paused(&self) -> bool {
        self.state.is_paused()
    }

    pub fn accumulated_premiums(&self) -> u64 {
        self.state.accumulated_premiums
    }

    pub fn accumulated_losses(&self) -> u64 {
        self.state.accumulated_losses
    }

    pub fn circuit_breaker_status(&self) -> CircuitBreakerState {
        self.breaker
    }

    /// Blake3 digest over the header, the six tranches and the circuit
    /// breaker — the `BTreeMap` ledgers are deliberately excluded since they
    /// aren't part of the fixed account layout an upgrade migrates. Used to
    /// detect silent corruption across a `seq_no`-preserving migration.
    pub fn state_digest(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(bytemuck::bytes_of(&self.state));
        for t in &self.tranches {
            hasher.update(bytemuck::bytes_of(t));
        }
        hasher.update(bytemuck::bytes_of(&self.breaker));
        *hasher.finalize().as_bytes()
    }

    // ---- wire dispatch ----

    /// Apply a decoded `VaultOperation` on behalf of `caller`. Results are
    /// communicated back through state and event mutation rather than the
    /// return value — `tx_id`s and payout amounts end up in `self.events`
    /// and `self.pending`.
    pub fn process(&mut self, op: VaultOperation, caller: Pubkey, now: i64) -> Result<(), VaultError> {
        match op {
            VaultOperation::Deposit { tranche_id, amount_base } => {
                self.deposit(caller, tranche_id, amount_base, self.config.min_deposit_gas, now)?;
            }
            VaultOperation::Withdraw { tranche_id, shares_to_burn } => {
                self.withdraw(caller, tranche_id, shares_to_burn, self.config.min_withdraw_gas, now)?;
            }
            VaultOperation::MintAck { tx_id } => self.ack_mint(tx_id, &caller, now)?,
            VaultOperation::BurnAck { tx_id } => self.ack_burn(tx_id, &caller, now)?,
            VaultOperation::DistributePremium { premium_amount } => {
                self.distribute_premium(caller, premium_amount, now)?;
            }
            VaultOperation::AbsorbLoss { loss_amount } => self.absorb_loss(caller, loss_amount, now)?,
            VaultOperation::RetryPayout { tx_id } => self.retry_payout(tx_id, &caller, now)?,
            VaultOperation::Pause => self.pause(caller)?,
            VaultOperation::Unpause => self.unpause(caller)?,
            VaultOperation::SetTrancheToken { tranche_id, address } => {
                self.set_tranche_token(caller, tranche_id, address)?;
            }
            VaultOperation::SetTrancheParams { tranche_id, apy_min_bps, apy_max_bps, curve_id, allocation_bps } => {
                self.set_tranche_params(caller, tranche_id, apy_min_bps, apy_max_bps, curve_id, allocation_bps)?;
            }
            VaultOperation::FlushEqtOverflow { target } => {
                self.flush_eqt_overflow(caller, target)?;
            }
            VaultOperation::Bounce { tx_id, original_op: _ } => self.on_bounce(tx_id, now),
        }
        Ok(())
    }

    /// Decode raw instruction bytes and dispatch in one call — the top-level
    /// `process(program_id, accounts, instruction_data)` entry point.
    pub fn dispatch_bytes(&mut self, data: &[u8], caller: Pubkey, now: i64) -> ProgramResult {
        let op = VaultOperation::unpack(data)?;
        self.process(op, caller, now).map_err(Into::into)
    }
}
