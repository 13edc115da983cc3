use bytemuck::{Pod, Zeroable};
use solana_program::pubkey::Pubkey;

use crate::curve::CurveId;
use crate::math;

/// Tranche ids, fixed at six. `BTC` absorbs losses last, `EQT` first.
pub const TRANCHE_BTC: u8 = 1;
pub const TRANCHE_SNR: u8 = 2;
pub const TRANCHE_MEZZ: u8 = 3;
pub const TRANCHE_JNR: u8 = 4;
pub const TRANCHE_JNR_PLUS: u8 = 5;
pub const TRANCHE_EQT: u8 = 6;

/// Loss absorption order, equity-first. `absorb_loss` walks this slice.
pub const WATERFALL_ORDER: [u8; 6] = [
    TRANCHE_EQT,
    TRANCHE_JNR_PLUS,
    TRANCHE_JNR,
    TRANCHE_MEZZ,
    TRANCHE_SNR,
    TRANCHE_BTC,
];

pub fn tranche_index(id: u8) -> Option<usize> {
    if (1..=6).contains(&id) {
        Some((id - 1) as usize)
    } else {
        None
    }
}

/// One of the vault's six fixed risk tranches.
///
/// `capital` is the tranche's current, loss-adjusted capital. `capital_basis`
/// tracks net par contributions (deposits minus withdrawals at par, *not*
/// reduced by loss absorption) — the two diverge exactly when a loss or a
/// yield credit has occurred, which is what lets `nav_per_share` move away
/// from the bonding curve's nominal value. See DESIGN.md for why both fields
/// exist.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct Tranche {
    /// 1..=6, see `TRANCHE_*` constants.
    pub id: u8,
    /// Raw `CurveId` discriminant — kept as `u8` rather than the enum itself
    /// so this struct stays `Pod`.
    pub curve_id: u8,
    pub _padding0: [u8; 6],

    pub capital: u64,
    pub capital_basis: u64,
    pub total_shares: u64,
    pub accumulated_yield: u64,
    /// EQT only: premium overflow above the NAV cap, held for governance to
    /// sweep via `FLUSH_EQT_OVERFLOW`. Zero for every other tranche.
    pub protocol_earned_overflow: u64,

    pub apy_min_bps: u16,
    pub apy_max_bps: u16,
    pub allocation_bps: u16,
    pub _padding1: [u8; 2],

    pub lp_token_ref: [u8; 32],
    pub lp_token_ref_set: u8,
    pub _reserved: [u8; 31],
}

pub const TRANCHE_SIZE: usize = core::mem::size_of::<Tranche>();

impl Tranche {
    pub fn curve(&self) -> CurveId {
        CurveId::from_u8(self.curve_id).unwrap_or(CurveId::Flat)
    }

    pub fn lp_token_ref_pubkey(&self) -> Option<Pubkey> {
        if self.lp_token_ref_set == 1 {
            Some(Pubkey::new_from_array(self.lp_token_ref))
        } else {
            None
        }
    }

    pub fn set_lp_token_ref(&mut self, key: &Pubkey) {
        self.lp_token_ref = key.to_bytes();
        self.lp_token_ref_set = 1;
    }

    /// Value backing outstanding shares: capital plus yield not yet folded
    /// into `capital` by a loss event. See `math::nav_per_share`.
    pub fn pool_value(&self) -> Option<u64> {
        self.capital.checked_add(self.accumulated_yield)
    }

    /// Per-share NAV at `elapsed_secs` since the tranche's inception,
    /// blending the bonding curve with the capital/basis ratio. Delegates to
    /// `math` (Kani-mirrored) and `curve` (the transcendental piece).
    pub fn nav_per_share(&self, elapsed_secs: i64) -> Option<math::Fp> {
        math::nav_per_share(
            self.curve(),
            self.apy_max_bps,
            elapsed_secs,
            self.capital,
            self.accumulated_yield,
            self.capital_basis,
            self.id == TRANCHE_EQT,
        )
    }

    /// True first depositor (`total_shares == 0`) mints 1:1 against
    /// `capital_basis` — there is no well-defined NAV to divide by yet.
    /// Every subsequent depositor buys in at `nav_per_share`.
    pub fn calc_shares_for_deposit(&self, amount_base: u64, elapsed_secs: i64) -> Option<u64> {
        if self.total_shares == 0 {
            math::calc_shares_for_first_deposit(self.capital_basis, amount_base)
        } else {
            math::calc_shares_for_deposit(self.nav_per_share(elapsed_secs)?, amount_base)
        }
    }

    pub fn calc_base_for_withdraw(&self, shares: u64, elapsed_secs: i64) -> Option<u64> {
        math::calc_base_for_withdraw(self.nav_per_share(elapsed_secs)?, shares)
    }
}

/// Per-(user, tranche) ledger entry. Not `Pod` — held in a `BTreeMap` keyed
/// by `(Pubkey, u8)` since the set of depositors is unbounded, unlike the six
/// fixed tranches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositorEntry {
    pub balance: u64,
    pub first_deposit_ts: i64,
}

impl DepositorEntry {
    pub fn new(balance: u64, now: i64) -> Self {
        Self {
            balance,
            first_deposit_ts: now,
        }
    }

    /// `true` once a depositor entry has nothing left to track — the GC rule
    /// from the ledger's design: a zero-balance entry is removed from the
    /// map rather than kept as a tombstone.
    pub fn is_empty(&self) -> bool {
        self.balance == 0
    }
}

/// The operation a `PendingTx` is carrying through its two-phase lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Deposit,
    Withdraw,
}

/// Lifecycle status of a `PendingTx`. `Pending` is the only status a bounce
/// can still retry. A withdraw's burn-ack moves it to `AwaitingPayout` rather
/// than straight to a terminal state, since the payout leg has no ack of its
/// own; `retry_payout` is what finally moves it to `Paid`. `Committed`,
/// `Paid` and `RolledBack` are terminal and eligible for compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Committed,
    AwaitingPayout,
    Paid,
    RolledBack,
}

/// A two-phase transaction awaiting an external mint/burn acknowledgement.
/// Not `Pod` — the map of outstanding entries is unbounded and short-lived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTx {
    pub tx_id: u64,
    pub op_kind: OpKind,
    pub user: Pubkey,
    pub tranche_id: u8,
    pub amount_base: u64,
    pub amount_shares: u64,
    pub status: TxStatus,
    pub retry_count: u8,
    pub next_retry_ts: i64,
    pub created_ts: i64,
    /// Withdraw only: the `capital_basis` reduction applied at withdraw time,
    /// stashed here so a bounce-exhausted rollback can restore it exactly
    /// without recomputing against a `total_shares` that has since moved.
    pub basis_reduction: u64,
    /// Withdraw only: the portion of `amount_base` drawn down from
    /// `accumulated_yield` rather than `capital` at withdraw commit time.
    /// Stashed so a bounce-exhausted rollback restores each bucket exactly.
    pub yield_drawn: u64,
}

/// Per-tranche advisory lock. Auto-expires `LOCK_DURATION_SECS` after
/// acquisition so a stuck pending transaction cannot wedge a tranche
/// forever.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct TrancheLock {
    pub tranche_id: u8,
    pub _padding: [u8; 7],
    /// 0 means unheld.
    pub holder_tx_id: u64,
    pub acquired_ts: i64,
}

pub const TRANCHE_LOCK_SIZE: usize = core::mem::size_of::<TrancheLock>();

impl TrancheLock {
    pub fn is_held(&self) -> bool {
        self.holder_tx_id != 0
    }

    pub fn is_expired(&self, now: i64, lock_duration_secs: i64) -> bool {
        self.is_held() && now.saturating_sub(self.acquired_ts) >= lock_duration_secs
    }
}

/// Rolling 24h loss-rate circuit breaker (singleton).
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct CircuitBreakerState {
    pub window_start_ts: i64,
    pub losses_in_window: u64,
    /// Total vault capital observed at the start of the current window —
    /// the denominator for the 10% threshold, frozen for the window's
    /// duration so a loss can't dodge the breaker by shrinking capital
    /// first.
    pub capital_at_window_start: u64,
    pub tripped: u8,
    pub _padding: [u8; 7],
}

pub const CIRCUIT_BREAKER_STATE_SIZE: usize = core::mem::size_of::<CircuitBreakerState>();

/// Vault-wide singleton header.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct VaultState {
    pub total_capital: u64,
    pub total_coverage_sold: u64,
    pub accumulated_premiums: u64,
    pub accumulated_losses: u64,

    pub seq_no: u32,
    pub version: u16,
    pub paused: u8,
    pub reentrancy_guard: u8,

    pub admin: [u8; 32],
    pub claims_processor: [u8; 32],
    pub factory: [u8; 32],
    pub oracle: [u8; 32],

    pub _reserved: [u8; 32],
}

pub const VAULT_STATE_SIZE: usize = core::mem::size_of::<VaultState>();

impl VaultState {
    pub fn admin_pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.admin)
    }

    pub fn claims_processor_pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.claims_processor)
    }

    pub fn factory_pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.factory)
    }

    pub fn oracle_pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.oracle)
    }

    pub fn is_paused(&self) -> bool {
        self.paused == 1
    }

    pub fn is_reentered(&self) -> bool {
        self.reentrancy_guard == 1
    }
}

/// Derive the singleton vault-state PDA.
pub fn derive_vault_state_pda(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[b"vault_state"], program_id)
}

/// Derive a tranche record's PDA.
pub fn derive_tranche_pda(program_id: &Pubkey, tranche_id: u8) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[b"tranche", &[tranche_id]], program_id)
}

/// Derive a depositor ledger entry's PDA.
pub fn derive_depositor_pda(program_id: &Pubkey, user: &Pubkey, tranche_id: u8) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[b"depositor", user.as_ref(), &[tranche_id]], program_id)
}
