use chrono::{NaiveDate, Timelike};
use shared::error::{AppError, AppResult};
use shared::models::{BatchLog, HourRange, ReprintEvent, TransactionMark};

use crate::db::ReportStorage;

/// Range following `predecessor` for `count` transactions
///
/// The first range of a ledger starts at 1. `None` when `count` is zero or
/// the range would run past `u64::MAX`.
pub fn next_range(
    predecessor: Option<&HourRange>,
    date: NaiveDate,
    hour: u8,
    count: u64,
) -> Option<HourRange> {
    let start = match predecessor {
        Some(p) => p.end.checked_add(1)?,
        None => 1,
    };
    let end = start.checked_add(count.checked_sub(1)?)?;
    Some(HourRange {
        date,
        hour,
        start,
        end,
    })
}

/// Recompute the whole ledger from transaction history
///
/// `marks` must be sorted chronologically; each (date, hour) with at least
/// one transaction gets a range sized by its transaction count.
pub fn rebuild_ranges(marks: &[TransactionMark]) -> Vec<HourRange> {
    let mut ranges: Vec<HourRange> = Vec::new();
    for mark in marks {
        let date = mark.occurred_at.date();
        let hour = mark.occurred_at.hour() as u8;
        if let Some(last) = ranges.last_mut()
            && last.date == date
            && last.hour == hour
        {
            last.end += 1;
            continue;
        }
        // bounded by marks.len()
        let start = ranges.last().map_or(1, |p| p.end + 1);
        ranges.push(HourRange {
            date,
            hour,
            start,
            end: start,
        });
    }
    ranges
}

/// Sequence allocator over the persisted ledger
#[derive(Debug, Clone)]
pub struct SequenceAllocator {
    storage: ReportStorage,
}

impl SequenceAllocator {
    pub fn new(storage: ReportStorage) -> Self {
        Self { storage }
    }

    /// Allocate (or re-read) the transaction-number range of one hour
    pub fn allocate_hour_range(
        &self,
        store_code: &str,
        date: NaiveDate,
        hour: u8,
        count: u64,
    ) -> AppResult<HourRange> {
        if hour > 23 {
            return Err(AppError::validation(format!("Invalid hour: {hour}")));
        }
        if count == 0 {
            return Err(AppError::validation("Range count must be at least 1"));
        }

        let (range, created) = self.storage.hour_range_or_insert_with(
            store_code,
            date,
            hour,
            |predecessor| next_range(predecessor.as_ref(), date, hour, count),
        )?
        .ok_or_else(|| {
            AppError::validation(format!("Range count {count} overflows the transaction counter"))
                .with_detail("hour", hour)
        })?;

        if created {
            tracing::debug!(
                store_code,
                %date,
                hour,
                start = range.start,
                end = range.end,
                "Allocated hour range"
            );
        }
        Ok(range)
    }

    /// Wipe and recompute every range of a store from its transaction history
    ///
    /// Destructive; only meant as a repair tool.
    pub fn rebuild_all_ledger(&self, store_code: &str) -> AppResult<Vec<HourRange>> {
        let marks = self.storage.transactions_for_store(store_code)?;
        let ranges = rebuild_ranges(&marks);
        let removed = self.storage.replace_hour_ranges(store_code, &ranges)?;

        tracing::warn!(
            store_code,
            removed,
            rebuilt = ranges.len(),
            transactions = marks.len(),
            "Hour range ledger rebuilt"
        );
        Ok(ranges)
    }

    /// Hour ranges of one trading date
    pub fn hour_ranges(&self, store_code: &str, date: NaiveDate) -> AppResult<Vec<HourRange>> {
        Ok(self.storage.hour_ranges_for_date(store_code, date)?)
    }

    /// Current batch number of a store/date, creating the log with 1
    pub fn allocate_batch_number(&self, store_code: &str, date: NaiveDate) -> AppResult<u32> {
        Ok(self
            .storage
            .update_batch_log(store_code, date, |log| log.batch_number)?)
    }

    /// Persist the increment after a successful generation; returns the next batch
    pub fn commit_generation(&self, store_code: &str, date: NaiveDate) -> AppResult<u32> {
        let next = self.storage.update_batch_log(store_code, date, |log| {
            log.batch_number += 1;
            log.batch_number
        })?;
        tracing::debug!(store_code, %date, next, "Batch number committed");
        Ok(next)
    }

    /// Increment only when the resent batch is the current one
    pub fn commit_resend(&self, store_code: &str, date: NaiveDate, batch: u32) -> AppResult<bool> {
        Ok(self.storage.update_batch_log(store_code, date, |log| {
            if log.batch_number == batch {
                log.batch_number += 1;
                true
            } else {
                false
            }
        })?)
    }

    /// Append a reprint event to the batch log
    pub fn record_reprint(
        &self,
        store_code: &str,
        date: NaiveDate,
        event: ReprintEvent,
    ) -> AppResult<BatchLog> {
        Ok(self.storage.update_batch_log(store_code, date, |log| {
            log.reprints.push(event);
            log.clone()
        })?)
    }

    /// Read the batch log without creating it
    pub fn batch_log(&self, store_code: &str, date: NaiveDate) -> AppResult<Option<BatchLog>> {
        Ok(self.storage.get_batch_log(store_code, date)?)
    }
}
