//! Multi-tranche parametric insurance vault.
//!
//! Six fixed risk tranches (BTC, SNR, MEZZ, JNR, JNR+, EQT) share one pool of
//! capital. Depositors buy tranche-specific LP shares against a bonding-curve
//! NAV; claims draw losses through an equity-first waterfall; premiums flow
//! back in by `allocation_bps` weight. Deposits and withdrawals are two-phase:
//! the vault commits its own ledger immediately but only finalizes once the
//! paired LP-token mint/burn is acknowledged by its external contract, with
//! exponential-backoff retry and rollback on exhaustion.
//!
//! `Vault<G: Gateway>` is the engine — one method per operation in the
//! external interface, all state held in plain structs rather than recovered
//! from `AccountInfo` on every call, since the depositor/pending-tx ledgers
//! are unbounded and don't fit a single PDA's static layout. `instruction.rs`
//! still decodes the same byte-tag-prefixed wire format the external
//! interface uses; `Vault::dispatch_bytes` is the entry point that plays the
//! role of a Solana program's `process`.

pub mod circuit_breaker;
pub mod curve;
pub mod error;
pub mod events;
pub mod gateway;
pub mod instruction;
pub mod locks;
pub mod math;
pub mod processor;
pub mod state;
