//! Per-account refresh lock registry
//!
//! Serializes "re-check active + rotate" for one account inside this process.
//! Entries are created on demand and removed once nobody holds or waits on
//! them. There is no cross-process exclusion here; the store's conditional
//! revoke covers that case.

use std::sync::Arc;

use clinic_core::AccountId;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of async mutexes keyed by account id
#[derive(Debug, Default)]
pub struct AccountLockRegistry {
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
}

impl AccountLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to the account's refresh path
    ///
    /// Get-or-create runs under the map shard lock, so two callers always end
    /// up on the same mutex. Dropping the returned guard releases it.
    pub async fn acquire(&self, account_id: AccountId) -> AccountLockGuard<'_> {
        let mutex = self.locks.entry(account_id).or_default().clone();
        let guard = mutex.lock_owned().await;

        AccountLockGuard {
            registry: self,
            account_id,
            guard: Some(guard),
        }
    }

    /// Number of accounts with a live entry
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Drop entries nobody references, e.g. left by cancelled waiters
    pub fn prune(&self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
        before.saturating_sub(self.locks.len())
    }

    fn release(&self, account_id: AccountId) {
        // Only the map's own reference left: no holder, no waiter
        self.locks
            .remove_if(&account_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

/// Exclusive hold on one account's refresh path
#[derive(Debug)]
pub struct AccountLockGuard<'a> {
    registry: &'a AccountLockRegistry,
    account_id: AccountId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl AccountLockGuard<'_> {
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }
}

impl Drop for AccountLockGuard<'_> {
    fn drop(&mut self) {
        // Release the mutex first so its Arc no longer counts as a holder
        drop(self.guard.take());
        self.registry.release(self.account_id);
    }
}
