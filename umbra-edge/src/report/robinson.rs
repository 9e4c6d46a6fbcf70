//! Robinson batch file
//!
//! 30 newline-delimited lines, each a 2-digit field number followed by a
//! 16-character zero-padded value.

use shared::models::{EodSnapshot, StoreSettings};

use super::money::format_money;
use super::{ReportError, ReportResult};

/// Width of every value
pub const FIELD_WIDTH: usize = 16;

/// Number of fields in a batch file
pub const FIELD_COUNT: usize = 30;

/// Pad a value to [`FIELD_WIDTH`]; a leading minus sign stays in front
fn pad_field(field: u8, value: &str) -> ReportResult<String> {
    if value.len() > FIELD_WIDTH {
        return Err(ReportError::FieldOverflow {
            field,
            value: value.to_string(),
            width: FIELD_WIDTH,
        });
    }
    Ok(match value.strip_prefix('-') {
        Some(digits) => format!("-{:0>width$}", digits, width = FIELD_WIDTH - 1),
        None => format!("{:0>width$}", value, width = FIELD_WIDTH),
    })
}

/// Field values in file order, unpadded
pub fn robinson_fields(snapshot: &EodSnapshot, settings: &StoreSettings) -> Vec<String> {
    let money = format_money;
    vec![
        settings.robinson_tenant_code.clone(),
        settings.robinson_terminal(),
        money(snapshot.gross_sales),
        money(snapshot.vat_amount),
        money(snapshot.void_amount),
        snapshot.void_count.to_string(),
        money(snapshot.total_discount()),
        snapshot.discount_count.to_string(),
        money(snapshot.refund_amount),
        snapshot.refund_count.to_string(),
        money(snapshot.senior_discount),
        snapshot.senior_count.to_string(),
        money(snapshot.pwd_discount),
        snapshot.pwd_count.to_string(),
        money(snapshot.service_charge),
        snapshot.z_count.to_string(),
        money(snapshot.old_grand_total),
        money(snapshot.new_grand_total),
        snapshot.date.format("%m%d%Y").to_string(),
        money(snapshot.cash_sales),
        money(snapshot.card_sales),
        money(snapshot.epay_sales),
        money(snapshot.other_sales),
        money(snapshot.vat_exempt_sales),
        money(snapshot.zero_rated_sales),
        money(snapshot.vatable_sales),
        money(snapshot.net_sales()),
        snapshot.transaction_count.to_string(),
        snapshot.first_si.to_string(),
        snapshot.last_si.to_string(),
    ]
}

/// Render the whole batch file
pub fn build_robinson(snapshot: &EodSnapshot, settings: &StoreSettings) -> ReportResult<String> {
    let mut out = String::with_capacity(FIELD_COUNT * (FIELD_WIDTH + 3));
    for (index, value) in robinson_fields(snapshot, settings).iter().enumerate() {
        let field = (index + 1) as u8;
        out.push_str(&format!("{field:02}{}\n", pad_field(field, value)?));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_settings, sample_snapshot};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn test_thirty_fixed_width_lines() {
        let text = build_robinson(&sample_snapshot("STORE01", date()), &sample_settings()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), FIELD_COUNT);
        assert!(lines.iter().all(|l| l.len() == 2 + FIELD_WIDTH));
        assert_eq!(lines[0], "0100000000TEN12345");
        assert_eq!(lines[1], "020000000000000001");
        assert_eq!(lines[2], "030000000001000.00");
        assert_eq!(lines[18], "190000000005012024");
        assert_eq!(lines[29], "300000000000000003");
    }

    #[test]
    fn test_negative_value_keeps_sign_in_front() {
        assert_eq!(pad_field(4, "-12.50").unwrap(), "-000000000012.50");
    }

    #[test]
    fn test_overflow_is_format_error() {
        let mut snapshot = sample_snapshot("STORE01", date());
        snapshot.new_grand_total = Decimal::new(123_456_789_012_345_678, 2);
        let err = build_robinson(&snapshot, &sample_settings()).unwrap_err();
        assert!(matches!(err, ReportError::FieldOverflow { field: 18, .. }));
    }
}
