//! Money rule shared by every accreditation format
//!
//! Two-stage rounding: 3 decimals then 2 decimals, both midpoint away from
//! zero. Rendering always carries exactly two decimals.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round a monetary value for reporting
pub fn round_money(value: Decimal) -> Decimal {
    value
        .round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Render a monetary value, e.g. `1234.50`
///
/// Anything that rounds to zero renders `0.00`, never `-0.00`.
pub fn format_money(value: Decimal) -> String {
    let rounded = round_money(value);
    if rounded.is_zero() {
        return "0.00".to_string();
    }
    format!("{:.2}", rounded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_two_stage_rounding() {
        assert_eq!(format_money(d("10.005")), "10.01");
        assert_eq!(format_money(d("10.0049")), "10.01"); // 10.005 after the first stage
        assert_eq!(format_money(d("10.0044")), "10.00");
        assert_eq!(format_money(d("-2.345")), "-2.35");
        assert_eq!(format_money(d("7")), "7.00");
        assert_eq!(format_money(d("1234.5")), "1234.50");
    }

    #[test]
    fn test_zero_never_negative() {
        assert_eq!(format_money(Decimal::ZERO), "0.00");
        assert_eq!(format_money(d("-0.001")), "0.00");
        assert_eq!(format_money(d("-0.004")), "0.00");
    }

    #[test]
    fn test_rounding_is_idempotent() {
        for s in ["0", "0.005", "1.0049", "-3.3355", "99999.9951", "12.344999"] {
            let once = round_money(d(s));
            assert_eq!(round_money(once), once, "input {s}");
            assert_eq!(format_money(once), format_money(d(s)));
        }
    }
}
