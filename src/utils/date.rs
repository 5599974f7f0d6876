use crate::error::{AppError, AppResult};
use chrono::{DateTime, Duration, NaiveDate, Utc};

fn parse_day(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::ValidationError(format!("Invalid date: {raw}, expected YYYY-MM-DD")))
}

/// 查询日期区间 `[start 00:00, end+1 00:00)`（UTC）
pub fn parse_date_range(
    start: Option<&str>,
    end: Option<&str>,
) -> AppResult<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
    let start = start
        .filter(|s| !s.trim().is_empty())
        .map(parse_day)
        .transpose()?
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc());
    let end = end
        .filter(|s| !s.trim().is_empty())
        .map(parse_day)
        .transpose()?
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc() + Duration::days(1));

    if let (Some(s), Some(e)) = (start, end)
        && s >= e
    {
        return Err(AppError::ValidationError(
            "start_date must not be after end_date".to_string(),
        ));
    }
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_range() {
        let (s, e) = parse_date_range(Some("2026-10-01"), Some("2026-10-01")).unwrap();
        assert_eq!(e.unwrap() - s.unwrap(), Duration::days(1));
        assert_eq!(parse_date_range(None, Some("")).unwrap(), (None, None));
        assert!(parse_date_range(Some("01/10/2026"), None).is_err());
        assert!(parse_date_range(Some("2026-10-02"), Some("2026-10-01")).is_err());
    }
}
