//! Wide "new requirements" sheet (Ayala)
//!
//! Label/value layout shared by every terminal of a store:
//!
//! ```text
//! TER_NO,001,002
//! CCCODE,C123,C123
//! GROSS_SLS,1000.00,250.00
//! ...
//! ```
//!
//! Column 1 holds labels; each terminal owns one value column.

use rust_decimal::Decimal;
use shared::models::{EodSnapshot, StoreSettings};

use super::money::format_money;

/// Label of the header row holding terminal numbers
pub const TERMINAL_ROW_LABEL: &str = "TER_NO";

/// Row labels below the `TER_NO` row, in file order
pub const SHEET_LABELS: [&str; 35] = [
    "CCCODE",
    "MERCHANT_NAME",
    "TRN_DATE",
    "NO_TRN",
    "CUST_CNT",
    "GROSS_SLS",
    "VAT_AMNT",
    "VATABLE_SLS",
    "NONVAT_SLS",
    "VATEXEMPT_SLS",
    "ZERORATED_SLS",
    "LOCAL_TAX",
    "PWD_DISC",
    "SNRCIT_DISC",
    "EMPLO_DISC",
    "REG_DISC",
    "OTHER_DISC",
    "REFUND_AMT",
    "VOID_AMNT",
    "SERVICE_CHARGE",
    "NET_SALES",
    "OLD_GRNTOT",
    "NEW_GRNTOT",
    "VOIDCNT",
    "DISCOUNT_CNT",
    "REFUND_CNT",
    "SNRCIT_CNT",
    "PWD_CNT",
    "CASH_SLS",
    "CARD_SLS",
    "EPAY_SLS",
    "OTHER_SLS",
    "FIRST_SI",
    "LAST_SI",
    "Z_COUNT",
];

/// One terminal's value column, aligned with [`SHEET_LABELS`]
pub fn sheet_column(snapshot: &EodSnapshot, settings: &StoreSettings) -> Vec<String> {
    let money = format_money;
    vec![
        settings.contract_number.clone(),
        settings.tenant_name.clone(),
        snapshot.date.format("%m/%d/%Y").to_string(),
        snapshot.transaction_count.to_string(),
        snapshot.customer_count.to_string(),
        money(snapshot.gross_sales),
        money(snapshot.vat_amount),
        money(snapshot.vatable_sales),
        money(snapshot.non_vat_sales),
        money(snapshot.vat_exempt_sales),
        money(snapshot.zero_rated_sales),
        money(Decimal::ZERO),
        money(snapshot.pwd_discount),
        money(snapshot.senior_discount),
        money(snapshot.employee_discount),
        money(snapshot.regular_discount),
        money(snapshot.other_discount),
        money(snapshot.refund_amount),
        money(snapshot.void_amount),
        money(snapshot.service_charge),
        money(snapshot.net_sales()),
        money(snapshot.old_grand_total),
        money(snapshot.new_grand_total),
        snapshot.void_count.to_string(),
        snapshot.discount_count.to_string(),
        snapshot.refund_count.to_string(),
        snapshot.senior_count.to_string(),
        snapshot.pwd_count.to_string(),
        money(snapshot.cash_sales),
        money(snapshot.card_sales),
        money(snapshot.epay_sales),
        money(snapshot.other_sales),
        snapshot.first_si.to_string(),
        snapshot.last_si.to_string(),
        snapshot.z_count.to_string(),
    ]
}
