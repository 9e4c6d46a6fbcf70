//! Sequence ledger: hour ranges and batch logs
//!
//! Every read-modify-write runs inside one redb write transaction, so two
//! allocations can never observe the same predecessor.

use chrono::NaiveDate;
use redb::{ReadableDatabase, ReadableTable};
use shared::models::{BatchLog, HourRange};

use super::{BATCH_LOGS_TABLE, HOUR_RANGES_TABLE, ReportStorage, StorageResult, date_key};

impl ReportStorage {
    /// Return the range of (store, date, hour) or create it from its predecessor
    ///
    /// `make` receives the range with the greatest (date, hour) key strictly
    /// before the requested one. Returns the range and whether it was created,
    /// or `None` (nothing written) when `make` declines.
    pub fn hour_range_or_insert_with<F>(
        &self,
        store_code: &str,
        date: NaiveDate,
        hour: u8,
        make: F,
    ) -> StorageResult<Option<(HourRange, bool)>>
    where
        F: FnOnce(Option<HourRange>) -> Option<HourRange>,
    {
        let date = date_key(date);
        let txn = self.begin_write()?;
        let result = {
            let mut table = txn.open_table(HOUR_RANGES_TABLE)?;

            let existing = match table.get((store_code, date.as_str(), hour))? {
                Some(guard) => Some(serde_json::from_slice::<HourRange>(guard.value())?),
                None => None,
            };

            match existing {
                Some(range) => Some((range, false)),
                None => {
                    let predecessor = {
                        let start: (&str, &str, u8) = (store_code, "", 0);
                        let end: (&str, &str, u8) = (store_code, date.as_str(), hour);
                        match table.range(start..end)?.next_back() {
                            Some(entry) => {
                                let (_, guard) = entry?;
                                Some(serde_json::from_slice::<HourRange>(guard.value())?)
                            }
                            None => None,
                        }
                    };

                    match make(predecessor) {
                        Some(range) => {
                            let value = serde_json::to_vec(&range)?;
                            table.insert((store_code, date.as_str(), hour), value.as_slice())?;
                            Some((range, true))
                        }
                        None => None,
                    }
                }
            }
        };
        txn.commit()?;
        Ok(result)
    }

    /// Hour ranges of one trading date, ordered by hour
    pub fn hour_ranges_for_date(
        &self,
        store_code: &str,
        date: NaiveDate,
    ) -> StorageResult<Vec<HourRange>> {
        let date = date_key(date);
        let read_txn = self.database().begin_read()?;
        let table = read_txn.open_table(HOUR_RANGES_TABLE)?;

        let start: (&str, &str, u8) = (store_code, date.as_str(), 0);
        let end: (&str, &str, u8) = (store_code, date.as_str(), u8::MAX);
        let mut ranges = Vec::new();
        for result in table.range(start..=end)? {
            let (_, guard) = result?;
            ranges.push(serde_json::from_slice(guard.value())?);
        }
        Ok(ranges)
    }

    /// Delete every range of a store and insert `ranges` in one transaction
    pub fn replace_hour_ranges(&self, store_code: &str, ranges: &[HourRange]) -> StorageResult<usize> {
        let txn = self.begin_write()?;
        let removed = {
            let mut table = txn.open_table(HOUR_RANGES_TABLE)?;

            let mut keys = Vec::new();
            let start: (&str, &str, u8) = (store_code, "", 0);
            let end: (&str, &str, u8) = (store_code, "\u{ffff}", u8::MAX);
            for result in table.range(start..=end)? {
                let (key, _) = result?;
                let (_, date, hour) = key.value();
                keys.push((date.to_string(), hour));
            }

            for (date, hour) in &keys {
                table.remove((store_code, date.as_str(), *hour))?;
            }

            for range in ranges {
                let date = date_key(range.date);
                let value = serde_json::to_vec(range)?;
                table.insert((store_code, date.as_str(), range.hour), value.as_slice())?;
            }
            keys.len()
        };
        txn.commit()?;
        Ok(removed)
    }

    /// Get the batch log of a store/date
    pub fn get_batch_log(&self, store_code: &str, date: NaiveDate) -> StorageResult<Option<BatchLog>> {
        let date = date_key(date);
        let read_txn = self.database().begin_read()?;
        let table = read_txn.open_table(BATCH_LOGS_TABLE)?;

        match table.get((store_code, date.as_str()))? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Mutate the batch log of a store/date, creating it (batch 1) if absent
    pub fn update_batch_log<F, R>(&self, store_code: &str, date: NaiveDate, f: F) -> StorageResult<R>
    where
        F: FnOnce(&mut BatchLog) -> R,
    {
        let key = date_key(date);
        let txn = self.begin_write()?;
        let result = {
            let mut table = txn.open_table(BATCH_LOGS_TABLE)?;

            let mut log = match table.get((store_code, key.as_str()))? {
                Some(guard) => serde_json::from_slice::<BatchLog>(guard.value())?,
                None => BatchLog::new(store_code, date),
            };

            let result = f(&mut log);
            let value = serde_json::to_vec(&log)?;
            table.insert((store_code, key.as_str()), value.as_slice())?;
            result
        };
        txn.commit()?;
        Ok(result)
    }
}
