//! Tranche locks and the global reentrancy guard.
//!
//! Small, explicit guard functions returning a typed error on violation,
//! called at the top of every processor entry point that touches shared
//! state.

use crate::error::VaultError;
use crate::state::{TrancheLock, VaultState};

/// Acquire `lock` for `tx_id` at time `now`. Succeeds if the lock is unheld
/// or has expired; fails with `TrancheLocked` if another transaction
/// genuinely still holds it.
pub fn acquire(
    lock: &mut TrancheLock,
    tx_id: u64,
    now: i64,
    lock_duration_secs: i64,
) -> Result<(), VaultError> {
    if lock.is_held() && !lock.is_expired(now, lock_duration_secs) {
        return Err(VaultError::TrancheLocked);
    }
    lock.holder_tx_id = tx_id;
    lock.acquired_ts = now;
    Ok(())
}

/// Release `lock`, but only if `tx_id` is the current holder — releasing a
/// lock you don't hold (e.g. a race with an already-expired-and-reacquired
/// lock) is a silent no-op rather than an error, matching the advisory
/// nature of the lock.
pub fn release(lock: &mut TrancheLock, tx_id: u64) {
    if lock.holder_tx_id == tx_id {
        lock.holder_tx_id = 0;
        lock.acquired_ts = 0;
    }
}

/// Acquire all six tranche locks atomically for the waterfall, or none —
/// the waterfall takes every lock or aborts entirely rather than holding a
/// partial set.
pub fn acquire_all(
    locks: &mut [TrancheLock; 6],
    tx_id: u64,
    now: i64,
    lock_duration_secs: i64,
) -> Result<(), VaultError> {
    for lock in locks.iter() {
        if lock.is_held() && !lock.is_expired(now, lock_duration_secs) && lock.holder_tx_id != tx_id
        {
            return Err(VaultError::TrancheLocked);
        }
    }
    for lock in locks.iter_mut() {
        lock.holder_tx_id = tx_id;
        lock.acquired_ts = now;
    }
    Ok(())
}

pub fn release_all(locks: &mut [TrancheLock; 6], tx_id: u64) {
    for lock in locks.iter_mut() {
        release(lock, tx_id);
    }
}

/// Enter the reentrancy-guarded section (premium distribution / waterfall).
pub fn enter(state: &mut VaultState) -> Result<(), VaultError> {
    if state.is_reentered() {
        return Err(VaultError::Reentrancy);
    }
    state.reentrancy_guard = 1;
    Ok(())
}

pub fn exit(state: &mut VaultState) {
    state.reentrancy_guard = 0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::Zeroable;

    #[test]
    fn test_acquire_fresh_lock() {
        let mut lock = TrancheLock::zeroed();
        assert!(acquire(&mut lock, 1, 100, 60).is_ok());
        assert_eq!(lock.holder_tx_id, 1);
    }

    #[test]
    fn test_acquire_contended_lock_fails() {
        let mut lock = TrancheLock::zeroed();
        acquire(&mut lock, 1, 100, 60).unwrap();
        assert_eq!(acquire(&mut lock, 2, 110, 60), Err(VaultError::TrancheLocked));
    }

    #[test]
    fn test_acquire_expired_lock_succeeds() {
        let mut lock = TrancheLock::zeroed();
        acquire(&mut lock, 1, 100, 60).unwrap();
        assert!(acquire(&mut lock, 2, 200, 60).is_ok());
        assert_eq!(lock.holder_tx_id, 2);
    }

    #[test]
    fn test_release_only_by_holder() {
        let mut lock = TrancheLock::zeroed();
        acquire(&mut lock, 1, 100, 60).unwrap();
        release(&mut lock, 2);
        assert!(lock.is_held());
        release(&mut lock, 1);
        assert!(!lock.is_held());
    }

    #[test]
    fn test_acquire_all_or_nothing() {
        let mut locks = [TrancheLock::zeroed(); 6];
        acquire(&mut locks[3], 9, 100, 60).unwrap();
        let result = acquire_all(&mut locks, 10, 110, 60);
        assert_eq!(result, Err(VaultError::TrancheLocked));
        // none of the others should have been taken either
        assert_eq!(locks[0].holder_tx_id, 0);
    }

    #[test]
    fn test_acquire_all_succeeds_when_free() {
        let mut locks = [TrancheLock::zeroed(); 6];
        assert!(acquire_all(&mut locks, 10, 100, 60).is_ok());
        for lock in &locks {
            assert_eq!(lock.holder_tx_id, 10);
        }
    }

    #[test]
    fn test_reentrancy_guard() {
        let mut state = VaultState::zeroed();
        assert!(enter(&mut state).is_ok());
        assert_eq!(enter(&mut state), Err(VaultError::Reentrancy));
        exit(&mut state);
        assert!(enter(&mut state).is_ok());
    }
}
