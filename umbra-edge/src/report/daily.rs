//! Daily consolidated row (Ayala daily file)

use shared::models::{EodSnapshot, StoreSettings};

use super::money::format_money;

pub const DAILY_HEADER: [&str; 21] = [
    "CCCODE",
    "TRANDATE",
    "OLDGT",
    "NEWGT",
    "DLYSALE",
    "TOTDISC",
    "TOTREF",
    "TOTCAN",
    "VAT",
    "TENTNAME",
    "BEGINV",
    "ENDINV",
    "TRANCNT",
    "VATEXSALE",
    "ZERORATED",
    "SCDISC",
    "PWDDISC",
    "SRVCHRG",
    "RAWGROSS",
    "ZCOUNT",
    "TERMNUM",
];

/// One row per store/date; the trailing column is the terminal number
pub fn daily_record(snapshot: &EodSnapshot, settings: &StoreSettings) -> Vec<String> {
    vec![
        settings.contract_number.clone(),
        snapshot.date.format("%m/%d/%Y").to_string(),
        format_money(snapshot.old_grand_total),
        format_money(snapshot.new_grand_total),
        format_money(snapshot.net_sales()),
        format_money(snapshot.total_discount()),
        format_money(snapshot.refund_amount),
        format_money(snapshot.void_amount),
        format_money(snapshot.vat_amount),
        settings.tenant_name.clone(),
        snapshot.first_si.to_string(),
        snapshot.last_si.to_string(),
        snapshot.transaction_count.to_string(),
        format_money(snapshot.vat_exempt_sales),
        format_money(snapshot.zero_rated_sales),
        format_money(snapshot.senior_discount),
        format_money(snapshot.pwd_discount),
        format_money(snapshot.service_charge),
        format_money(snapshot.raw_gross()),
        snapshot.z_count.to_string(),
        settings.ayala_terminal(),
    ]
}
