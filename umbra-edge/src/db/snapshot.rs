//! EOD snapshots and transaction history

use redb::{ReadableDatabase, ReadableTable};
use shared::models::{EodSnapshot, TransactionMark};

use super::{
    EOD_SNAPSHOTS_TABLE, ReportStorage, StorageError, StorageResult, TRANSACTIONS_TABLE, date_key,
};

impl ReportStorage {
    /// Store a closing snapshot; a second snapshot for the same store/date is rejected
    pub fn insert_snapshot(&self, snapshot: &EodSnapshot) -> StorageResult<()> {
        let date = date_key(snapshot.date);
        let value = serde_json::to_vec(snapshot)?;

        let txn = self.begin_write()?;
        {
            let mut table = txn.open_table(EOD_SNAPSHOTS_TABLE)?;
            if table
                .get((snapshot.store_code.as_str(), date.as_str()))?
                .is_some()
            {
                return Err(StorageError::Duplicate(format!(
                    "EOD snapshot {}/{}",
                    snapshot.store_code, date
                )));
            }
            table.insert((snapshot.store_code.as_str(), date.as_str()), value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Get the closing snapshot of a store/date
    pub fn get_snapshot(
        &self,
        store_code: &str,
        date: chrono::NaiveDate,
    ) -> StorageResult<Option<EodSnapshot>> {
        let date = date_key(date);
        let read_txn = self.database().begin_read()?;
        let table = read_txn.open_table(EOD_SNAPSHOTS_TABLE)?;

        match table.get((store_code, date.as_str()))? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Record issued invoices; re-recording an SI number overwrites it
    pub fn record_transactions(&self, marks: &[TransactionMark]) -> StorageResult<usize> {
        let txn = self.begin_write()?;
        {
            let mut table = txn.open_table(TRANSACTIONS_TABLE)?;
            for mark in marks {
                let value = serde_json::to_vec(mark)?;
                table.insert((mark.store_code.as_str(), mark.si_number), value.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(marks.len())
    }

    /// Transaction history of a store, chronological
    pub fn transactions_for_store(&self, store_code: &str) -> StorageResult<Vec<TransactionMark>> {
        let read_txn = self.database().begin_read()?;
        let table = read_txn.open_table(TRANSACTIONS_TABLE)?;

        let mut marks = Vec::new();
        for result in table.range((store_code, 0u64)..=(store_code, u64::MAX))? {
            let (_, guard) = result?;
            let mark: TransactionMark = serde_json::from_slice(guard.value())?;
            marks.push(mark);
        }

        marks.sort_by_key(|m| (m.occurred_at, m.si_number));
        Ok(marks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_snapshot;
    use chrono::NaiveDate;

    #[test]
    fn test_snapshot_insert_is_write_once() {
        let storage = ReportStorage::open_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let snapshot = sample_snapshot("STORE01", date);

        storage.insert_snapshot(&snapshot).unwrap();
        assert!(matches!(
            storage.insert_snapshot(&snapshot),
            Err(StorageError::Duplicate(_))
        ));

        let loaded = storage.get_snapshot("STORE01", date).unwrap().unwrap();
        assert_eq!(loaded, snapshot);
        assert!(storage.get_snapshot("STORE02", date).unwrap().is_none());
    }

    #[test]
    fn test_transactions_sorted_by_time() {
        let storage = ReportStorage::open_in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let marks = vec![
            TransactionMark {
                store_code: "STORE01".into(),
                occurred_at: date.and_hms_opt(10, 5, 0).unwrap(),
                si_number: 7,
            },
            TransactionMark {
                store_code: "STORE01".into(),
                occurred_at: date.and_hms_opt(9, 0, 0).unwrap(),
                si_number: 9,
            },
            TransactionMark {
                store_code: "OTHER".into(),
                occurred_at: date.and_hms_opt(8, 0, 0).unwrap(),
                si_number: 1,
            },
        ];
        storage.record_transactions(&marks).unwrap();

        let loaded = storage.transactions_for_store("STORE01").unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].si_number, 9);
        assert_eq!(loaded[1].si_number, 7);
    }
}
