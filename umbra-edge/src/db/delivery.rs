//! Delivery log and contribution markers

use redb::{ReadableDatabase, ReadableTable};
use shared::models::DeliveryRecord;

use super::{
    CONTRIBUTIONS_TABLE, COUNTERS_TABLE, DELIVERIES_TABLE, ReportStorage, StorageError,
    StorageResult, UNSENT_DELIVERIES_TABLE,
};

const DELIVERY_ID_KEY: &str = "delivery_id";

/// Where a contribution marker applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContributionLocation {
    Local,
    Remote,
}

impl ContributionLocation {
    fn as_str(&self) -> &'static str {
        match self {
            ContributionLocation::Local => "local",
            ContributionLocation::Remote => "remote",
        }
    }
}

impl ReportStorage {
    // ========== Delivery Records ==========

    /// Append one delivery attempt
    ///
    /// The id is taken from a counter in the same write transaction; whatever
    /// `record.id` held is replaced. Returns the stored record.
    pub fn append_delivery(&self, mut record: DeliveryRecord) -> StorageResult<DeliveryRecord> {
        let txn = self.begin_write()?;
        {
            let mut counters = txn.open_table(COUNTERS_TABLE)?;
            let last = counters
                .get(DELIVERY_ID_KEY)?
                .map(|guard| guard.value())
                .unwrap_or(0);
            record.id = last + 1;
            counters.insert(DELIVERY_ID_KEY, record.id)?;

            let mut table = txn.open_table(DELIVERIES_TABLE)?;
            if table.get(record.id)?.is_some() {
                return Err(StorageError::Duplicate(format!("delivery {}", record.id)));
            }
            let value = serde_json::to_vec(&record)?;
            table.insert(record.id, value.as_slice())?;

            if !record.sent {
                let mut idx_table = txn.open_table(UNSENT_DELIVERIES_TABLE)?;
                idx_table.insert(record.id, ())?;
            }
        }
        txn.commit()?;
        Ok(record)
    }

    /// All records with `sent = false`, oldest first
    pub fn unsent_deliveries(&self) -> StorageResult<Vec<DeliveryRecord>> {
        let read_txn = self.database().begin_read()?;
        let idx_table = read_txn.open_table(UNSENT_DELIVERIES_TABLE)?;
        let data_table = read_txn.open_table(DELIVERIES_TABLE)?;

        let mut records = Vec::new();
        for result in idx_table.iter()? {
            let (key, _) = result?;
            if let Some(guard) = data_table.get(key.value())? {
                let record: DeliveryRecord = serde_json::from_slice(guard.value())?;
                records.push(record);
            }
        }

        records.sort_by_key(|r| (r.attempted_at, r.id));
        Ok(records)
    }

    /// Delivery log page, newest first
    pub fn list_deliveries(
        &self,
        sent: Option<bool>,
        offset: usize,
        limit: usize,
    ) -> StorageResult<Vec<DeliveryRecord>> {
        let read_txn = self.database().begin_read()?;
        let table = read_txn.open_table(DELIVERIES_TABLE)?;

        let mut records: Vec<DeliveryRecord> = Vec::new();
        for result in table.iter()? {
            let (_, guard) = result?;
            let record: DeliveryRecord = serde_json::from_slice(guard.value())?;
            if sent.is_none_or(|s| s == record.sent) {
                records.push(record);
            }
        }

        records.sort_by_key(|r| std::cmp::Reverse((r.attempted_at, r.id)));
        Ok(records.into_iter().skip(offset).take(limit).collect())
    }

    /// Flip records to `sent = true`; returns how many changed
    pub fn mark_delivered(&self, ids: &[i64]) -> StorageResult<usize> {
        let txn = self.begin_write()?;
        let mut changed = 0;
        {
            let mut table = txn.open_table(DELIVERIES_TABLE)?;
            let mut idx_table = txn.open_table(UNSENT_DELIVERIES_TABLE)?;

            for id in ids {
                let bytes = match table.get(*id)? {
                    Some(guard) => guard.value().to_vec(),
                    None => continue,
                };
                let mut record: DeliveryRecord = serde_json::from_slice(&bytes)?;
                if record.sent {
                    continue;
                }
                record.sent = true;
                let value = serde_json::to_vec(&record)?;
                table.insert(*id, value.as_slice())?;
                idx_table.remove(*id)?;
                changed += 1;
            }
        }
        txn.commit()?;
        Ok(changed)
    }

    // ========== Contribution Markers ==========

    /// Whether `terminal` is recorded as contributor of `artifact`
    pub fn has_contribution(
        &self,
        artifact: &str,
        location: ContributionLocation,
        terminal: u16,
    ) -> StorageResult<bool> {
        let read_txn = self.database().begin_read()?;
        let table = read_txn.open_table(CONTRIBUTIONS_TABLE)?;
        Ok(table.get((artifact, location.as_str(), terminal))?.is_some())
    }

    /// Record that `terminal` contributed to `artifact`
    pub fn record_contribution(
        &self,
        artifact: &str,
        location: ContributionLocation,
        terminal: u16,
    ) -> StorageResult<()> {
        let txn = self.begin_write()?;
        {
            let mut table = txn.open_table(CONTRIBUTIONS_TABLE)?;
            table.insert(
                (artifact, location.as_str(), terminal),
                shared::util::now_millis(),
            )?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Forget a marker (the artifact it points to is gone)
    pub fn clear_contribution(
        &self,
        artifact: &str,
        location: ContributionLocation,
        terminal: u16,
    ) -> StorageResult<()> {
        let txn = self.begin_write()?;
        {
            let mut table = txn.open_table(CONTRIBUTIONS_TABLE)?;
            table.remove((artifact, location.as_str(), terminal))?;
        }
        txn.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared::models::ArtifactKind;

    fn record(id: i64, sent: bool) -> DeliveryRecord {
        record_for("AYALA/2024/existing/EOD001/C1230501H.txt", id, sent)
    }

    fn record_for(file_name: &str, id: i64, sent: bool) -> DeliveryRecord {
        DeliveryRecord {
            id,
            file_name: file_name.into(),
            kind: ArtifactKind::AyalaHourly,
            sent,
            transaction_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            store_code: "STORE01".into(),
            terminal: 1,
            attempted_at: id,
            error: (!sent).then(|| "ETIMEDOUT".to_string()),
        }
    }

    #[test]
    fn test_unsent_index_tracks_attempts() {
        let storage = ReportStorage::open_in_memory().unwrap();
        storage.append_delivery(record(1, false)).unwrap();
        storage.append_delivery(record(2, true)).unwrap();
        storage.append_delivery(record(3, false)).unwrap();

        let unsent = storage.unsent_deliveries().unwrap();
        assert_eq!(unsent.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 3]);

        assert_eq!(storage.mark_delivered(&[1, 2, 99]).unwrap(), 1);
        let unsent = storage.unsent_deliveries().unwrap();
        assert_eq!(unsent.len(), 1);
        assert_eq!(unsent[0].id, 3);

        // Audit trail keeps every attempt
        assert_eq!(storage.list_deliveries(None, 0, 10).unwrap().len(), 3);
        assert_eq!(storage.list_deliveries(Some(true), 0, 10).unwrap().len(), 2);
    }

    #[test]
    fn test_same_millisecond_attempts_keep_distinct_ids() {
        let storage = ReportStorage::open_in_memory().unwrap();
        // Caller-supplied ids collide; the log must still keep both
        let failed = storage
            .append_delivery(record_for("A.txt", 42, false))
            .unwrap();
        let sent = storage
            .append_delivery(record_for("B.txt", 42, true))
            .unwrap();
        assert_ne!(failed.id, sent.id);
        assert!(sent.id > failed.id);

        let unsent = storage.unsent_deliveries().unwrap();
        assert_eq!(unsent.len(), 1);
        assert_eq!(unsent[0].file_name, "A.txt");
        assert!(!unsent[0].sent);
        assert_eq!(storage.list_deliveries(None, 0, 10).unwrap().len(), 2);
    }

    #[test]
    fn test_contribution_markers() {
        let storage = ReportStorage::open_in_memory().unwrap();
        let artifact = "AYALA/2024/new requirements/EODCOC1050124.csv";

        assert!(!storage
            .has_contribution(artifact, ContributionLocation::Local, 2)
            .unwrap());
        storage
            .record_contribution(artifact, ContributionLocation::Local, 2)
            .unwrap();
        assert!(storage
            .has_contribution(artifact, ContributionLocation::Local, 2)
            .unwrap());
        assert!(!storage
            .has_contribution(artifact, ContributionLocation::Remote, 2)
            .unwrap());

        storage
            .clear_contribution(artifact, ContributionLocation::Local, 2)
            .unwrap();
        assert!(!storage
            .has_contribution(artifact, ContributionLocation::Local, 2)
            .unwrap());
    }
}
