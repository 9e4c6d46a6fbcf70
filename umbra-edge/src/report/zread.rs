//! Consolidated Z-read text (Ayala `Z` file)

use shared::models::{EodSnapshot, HourRange, StoreSettings};

use super::money::format_money;

fn line(out: &mut String, label: &str, value: impl AsRef<str>) {
    out.push_str(&format!("{label:<28}{:>18}\n", value.as_ref()));
}

/// Render the Z-read; `ranges` are the trading date's ledger ranges
pub fn build_zread(snapshot: &EodSnapshot, settings: &StoreSettings, ranges: &[HourRange]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", settings.tenant_name));
    out.push_str(&format!("CONTRACT NO. {}\n", settings.contract_number));
    out.push_str("Z-READING\n");
    line(&mut out, "DATE", snapshot.date.format("%m/%d/%Y").to_string());
    line(&mut out, "TERMINAL", settings.ayala_terminal());
    line(&mut out, "Z-COUNTER", snapshot.z_count.to_string());
    out.push('\n');

    line(&mut out, "GROSS SALES", format_money(snapshot.gross_sales));
    line(&mut out, "REGULAR DISCOUNT", format_money(snapshot.regular_discount));
    line(&mut out, "SENIOR CITIZEN DISCOUNT", format_money(snapshot.senior_discount));
    line(&mut out, "PWD DISCOUNT", format_money(snapshot.pwd_discount));
    line(&mut out, "EMPLOYEE DISCOUNT", format_money(snapshot.employee_discount));
    line(&mut out, "OTHER DISCOUNT", format_money(snapshot.other_discount));
    line(&mut out, "TOTAL DISCOUNT", format_money(snapshot.total_discount()));
    line(&mut out, "VOID", format_money(snapshot.void_amount));
    line(&mut out, "VOID COUNT", snapshot.void_count.to_string());
    line(&mut out, "REFUND", format_money(snapshot.refund_amount));
    line(&mut out, "REFUND COUNT", snapshot.refund_count.to_string());
    line(&mut out, "NET SALES", format_money(snapshot.net_sales()));
    out.push('\n');

    line(&mut out, "VATABLE SALES", format_money(snapshot.vatable_sales));
    line(&mut out, "VAT AMOUNT", format_money(snapshot.vat_amount));
    line(&mut out, "VAT-EXEMPT SALES", format_money(snapshot.vat_exempt_sales));
    line(&mut out, "ZERO-RATED SALES", format_money(snapshot.zero_rated_sales));
    line(&mut out, "NON-VAT SALES", format_money(snapshot.non_vat_sales));
    line(&mut out, "SERVICE CHARGE", format_money(snapshot.service_charge));
    line(&mut out, "RAW GROSS", format_money(snapshot.raw_gross()));
    out.push('\n');

    line(&mut out, "OLD GRAND TOTAL", format_money(snapshot.old_grand_total));
    line(&mut out, "NEW GRAND TOTAL", format_money(snapshot.new_grand_total));
    line(&mut out, "BEGINNING SI", snapshot.first_si.to_string());
    line(&mut out, "ENDING SI", snapshot.last_si.to_string());
    line(&mut out, "TRANSACTION COUNT", snapshot.transaction_count.to_string());
    line(&mut out, "CUSTOMER COUNT", snapshot.customer_count.to_string());

    let first = ranges.iter().map(|r| r.start).min();
    let last = ranges.iter().map(|r| r.end).max();
    match (first, last) {
        (Some(first), Some(last)) => {
            line(&mut out, "BEGINNING TRANSACTION NO.", first.to_string());
            line(&mut out, "ENDING TRANSACTION NO.", last.to_string());
        }
        _ => {
            line(&mut out, "BEGINNING TRANSACTION NO.", "0");
            line(&mut out, "ENDING TRANSACTION NO.", "0");
        }
    }
    out
}
