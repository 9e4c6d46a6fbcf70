/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// 解析 `YYYY-MM-DD` 格式的交易日期
pub fn parse_date(date: &str) -> Result<chrono::NaiveDate, crate::error::AppError> {
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
        crate::error::AppError::validation(format!("Invalid date format: {date}"))
            .with_detail("expected", "YYYY-MM-DD")
    })
}
