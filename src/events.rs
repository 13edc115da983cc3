//! Typed event log.
//!
//! A structured, appendable event log — this vault runs both inside a host
//! test harness and (via the `Gateway`-abstracted external calls) alongside
//! an on-chain deployment, so a plain text log isn't enough for a caller to
//! react to a committed state transition programmatically. Every event is
//! also mirrored to `tracing` at construction time (see `Vault::emit`) so
//! operators still get a readable text trail.

use solana_program::pubkey::Pubkey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultEvent {
    DepositCommitted {
        tx_id: u64,
        user: Pubkey,
        tranche_id: u8,
        amount_base: u64,
        shares: u64,
    },
    DepositRolledBack {
        tx_id: u64,
        user: Pubkey,
        tranche_id: u8,
        amount_base: u64,
    },
    WithdrawCompleted {
        tx_id: u64,
        user: Pubkey,
        tranche_id: u8,
        amount_base: u64,
        shares: u64,
    },
    WithdrawRolledBack {
        tx_id: u64,
        user: Pubkey,
        tranche_id: u8,
        shares: u64,
    },
    RetryPayoutSucceeded {
        tx_id: u64,
        user: Pubkey,
        amount_base: u64,
    },
    BounceRetry {
        tx_id: u64,
        retry_count: u8,
    },
    PremiumDistributed {
        premium_amount: u64,
        per_tranche_shares: [u64; 6],
    },
    LossAbsorbed {
        loss_amount: u64,
        per_tranche_absorption: [u64; 6],
    },
    CircuitBreakerTripped {
        losses_in_window: u64,
    },
    Insolvent {
        loss_amount: u64,
        unabsorbed: u64,
    },
    OverflowWarning {
        seq_no: u32,
    },
    RefundUnclaimed {
        tx_id: u64,
        amount: u64,
    },
    EqtOverflowFlushed {
        target: Pubkey,
        amount: u64,
    },
    Paused,
    Unpaused,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_equality_for_assertions() {
        let user = Pubkey::new_from_array([1u8; 32]);
        let a = VaultEvent::DepositCommitted {
            tx_id: 1,
            user,
            tranche_id: 3,
            amount_base: 100,
            shares: 100,
        };
        let b = a.clone();
        assert_eq!(a, b);
    }
}
