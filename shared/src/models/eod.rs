//! EOD Snapshot Model (日结快照)
//!
//! Produced by the closing (Z-read) run of the checkout subsystem. Totals
//! arrive already computed; report builders only format them.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Sales bucket for one clock hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlySales {
    /// Calendar date of the bucket (may be the day after the trading date)
    pub date: NaiveDate,
    /// Hour of day, 0..=23
    pub hour: u8,
    pub sales: Decimal,
    pub transaction_count: u32,
}

/// End-of-day closing snapshot, immutable per (store_code, date)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EodSnapshot {
    pub store_code: String,
    /// Trading date
    pub date: NaiveDate,
    /// Terminal that ran the closing
    pub terminal: u16,
    /// Z-read counter (number of closings ever run on this terminal)
    pub z_count: u32,

    pub old_grand_total: Decimal,
    pub new_grand_total: Decimal,

    /// Gross sales before discounts, voids and refunds
    pub gross_sales: Decimal,
    pub vatable_sales: Decimal,
    pub vat_amount: Decimal,
    pub vat_exempt_sales: Decimal,
    #[serde(default)]
    pub zero_rated_sales: Decimal,
    #[serde(default)]
    pub non_vat_sales: Decimal,

    // -- Discounts --
    #[serde(default)]
    pub regular_discount: Decimal,
    #[serde(default)]
    pub senior_discount: Decimal,
    #[serde(default)]
    pub senior_count: u32,
    #[serde(default)]
    pub pwd_discount: Decimal,
    #[serde(default)]
    pub pwd_count: u32,
    #[serde(default)]
    pub employee_discount: Decimal,
    #[serde(default)]
    pub other_discount: Decimal,
    #[serde(default)]
    pub discount_count: u32,

    // -- Voids / refunds --
    #[serde(default)]
    pub void_amount: Decimal,
    #[serde(default)]
    pub void_count: u32,
    #[serde(default)]
    pub refund_amount: Decimal,
    #[serde(default)]
    pub refund_count: u32,

    #[serde(default)]
    pub service_charge: Decimal,

    // -- Tenders --
    #[serde(default)]
    pub cash_sales: Decimal,
    #[serde(default)]
    pub card_sales: Decimal,
    #[serde(default)]
    pub epay_sales: Decimal,
    #[serde(default)]
    pub other_sales: Decimal,

    /// First / last sales invoice number of the day
    pub first_si: u64,
    pub last_si: u64,
    pub transaction_count: u32,
    #[serde(default)]
    pub customer_count: u32,

    #[serde(default)]
    pub hourly: Vec<HourlySales>,
}

impl EodSnapshot {
    /// Total of every discount bucket
    pub fn total_discount(&self) -> Decimal {
        self.regular_discount
            + self.senior_discount
            + self.pwd_discount
            + self.employee_discount
            + self.other_discount
    }

    /// Net sales: gross less discounts, voids and refunds
    pub fn net_sales(&self) -> Decimal {
        self.gross_sales - self.total_discount() - self.void_amount - self.refund_amount
    }

    /// Raw gross: net sales plus VAT and service charge as rung up
    pub fn raw_gross(&self) -> Decimal {
        self.net_sales() + self.vat_amount + self.service_charge
    }

    /// Look up the sales bucket for a calendar (date, hour)
    pub fn hour_bucket(&self, date: NaiveDate, hour: u8) -> Option<&HourlySales> {
        self.hourly.iter().find(|h| h.date == date && h.hour == hour)
    }
}

/// One issued sales invoice, used to rebuild the hour-range ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMark {
    pub store_code: String,
    /// Local wall-clock time the invoice was issued
    pub occurred_at: NaiveDateTime,
    pub si_number: u64,
}
