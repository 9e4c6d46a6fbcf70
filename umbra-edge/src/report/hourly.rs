//! Hourly sales rows (Ayala `H` file)
//!
//! A trading day runs 06:00 to 05:59 of the next calendar date, so the file
//! always carries exactly 24 rows in that order.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use shared::models::{EodSnapshot, StoreSettings};

use super::money::format_money;

pub const HOURLY_HEADER: [&str; 6] = ["TRANDATE", "HOUR", "SALES", "TRANCNT", "TENTNAME", "TERMNUM"];

/// First clock hour of a trading day
const DAY_START_HOUR: u8 = 6;

/// The 24 (calendar date, hour) slots of a trading date, in file order
pub fn hourly_slots(date: NaiveDate) -> Vec<(NaiveDate, u8)> {
    let next = date.checked_add_days(Days::new(1)).unwrap_or(date);
    (DAY_START_HOUR..24)
        .map(|h| (date, h))
        .chain((0..DAY_START_HOUR).map(|h| (next, h)))
        .collect()
}

/// Build the 24 hourly records; hours without sales render as zero
///
/// `TRANDATE` is the calendar date of the row, so 00..05 carry the next day.
pub fn hourly_records(snapshot: &EodSnapshot, settings: &StoreSettings) -> Vec<Vec<String>> {
    let terminal = settings.ayala_terminal();
    hourly_slots(snapshot.date)
        .into_iter()
        .map(|(date, hour)| {
            let (sales, count) = snapshot
                .hour_bucket(date, hour)
                .map(|b| (b.sales, b.transaction_count))
                .unwrap_or((Decimal::ZERO, 0));
            vec![
                date.format("%m/%d/%Y").to_string(),
                format!("{hour:02}"),
                format_money(sales),
                count.to_string(),
                settings.tenant_name.clone(),
                terminal.clone(),
            ]
        })
        .collect()
}
