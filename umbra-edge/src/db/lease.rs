//! Drain lease (分布式租约)
//!
//! A lease row grants one coordinator instance the right to drain the
//! delivery queue. Acquire/renew/release are compare-and-set operations in a
//! single write transaction.

use redb::ReadableTable;
use serde::{Deserialize, Serialize};

use super::{LEASES_TABLE, ReportStorage, StorageResult};

/// Lease record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainLease {
    pub owner: String,
    pub acquired_at: i64,
    pub expires_at: i64,
}

impl ReportStorage {
    /// Acquire or renew the lease `name` for `owner`
    ///
    /// Succeeds when the lease is free, expired at `now`, or already held by
    /// `owner` (renewal keeps the original `acquired_at`).
    pub fn try_acquire_lease(
        &self,
        name: &str,
        owner: &str,
        ttl_ms: u64,
        now: i64,
    ) -> StorageResult<bool> {
        let ttl_ms = i64::try_from(ttl_ms).unwrap_or(i64::MAX);
        let txn = self.begin_write()?;
        let acquired = {
            let mut table = txn.open_table(LEASES_TABLE)?;

            let current = match table.get(name)? {
                Some(guard) => Some(serde_json::from_slice::<DrainLease>(guard.value())?),
                None => None,
            };

            let acquired_at = match &current {
                Some(lease) if lease.owner == owner => Some(lease.acquired_at),
                Some(lease) if lease.expires_at > now => None,
                _ => Some(now),
            };

            match acquired_at {
                Some(acquired_at) => {
                    let lease = DrainLease {
                        owner: owner.to_string(),
                        acquired_at,
                        expires_at: now.saturating_add(ttl_ms),
                    };
                    let value = serde_json::to_vec(&lease)?;
                    table.insert(name, value.as_slice())?;
                    true
                }
                None => false,
            }
        };
        txn.commit()?;
        Ok(acquired)
    }

    /// Release the lease if `owner` holds it
    pub fn release_lease(&self, name: &str, owner: &str) -> StorageResult<bool> {
        let txn = self.begin_write()?;
        let released = {
            let mut table = txn.open_table(LEASES_TABLE)?;
            let held = match table.get(name)? {
                Some(guard) => serde_json::from_slice::<DrainLease>(guard.value())?.owner == owner,
                None => false,
            };
            if held {
                table.remove(name)?;
            }
            held
        };
        txn.commit()?;
        Ok(released)
    }

    /// Current holder of a lease
    pub fn get_lease(&self, name: &str) -> StorageResult<Option<DrainLease>> {
        use redb::ReadableDatabase;

        let read_txn = self.database().begin_read()?;
        let table = read_txn.open_table(LEASES_TABLE)?;
        match table.get(name)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_is_exclusive_until_expiry() {
        let storage = ReportStorage::open_in_memory().unwrap();

        assert!(storage.try_acquire_lease("drain", "a", 1_000, 0).unwrap());
        assert!(!storage.try_acquire_lease("drain", "b", 1_000, 500).unwrap());
        // renewal by holder
        assert!(storage.try_acquire_lease("drain", "a", 1_000, 900).unwrap());
        assert!(!storage.try_acquire_lease("drain", "b", 1_000, 1_500).unwrap());
        // expired
        assert!(storage.try_acquire_lease("drain", "b", 1_000, 2_000).unwrap());
        assert_eq!(storage.get_lease("drain").unwrap().unwrap().owner, "b");
    }

    #[test]
    fn test_release_only_by_holder() {
        let storage = ReportStorage::open_in_memory().unwrap();
        assert!(storage.try_acquire_lease("drain", "a", 1_000, 0).unwrap());
        assert!(!storage.release_lease("drain", "b").unwrap());
        assert!(storage.release_lease("drain", "a").unwrap());
        assert!(storage.try_acquire_lease("drain", "b", 1_000, 10).unwrap());
    }

    #[test]
    fn test_unbounded_ttl_saturates() {
        let storage = ReportStorage::open_in_memory().unwrap();
        assert!(storage.try_acquire_lease("drain", "a", u64::MAX, 1_000).unwrap());
        let lease = storage.get_lease("drain").unwrap().unwrap();
        assert_eq!(lease.expires_at, i64::MAX);
        assert!(!storage.try_acquire_lease("drain", "b", 1_000, i64::MAX - 1).unwrap());
    }
}
