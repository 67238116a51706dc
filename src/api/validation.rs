use chrono::{NaiveDate, Utc};

use super::ApiError;
use crate::constants::limits::{DEFAULT_AUDIT_LIMIT, MAX_AUDIT_LIMIT};
use crate::models::ReportRange;

/// Audit page size. Absent means the default, oversized requests are capped.
pub fn validate_limit(limit: Option<u64>) -> Result<u64, ApiError> {
    match limit {
        None => Ok(DEFAULT_AUDIT_LIMIT),
        Some(0) => Err(ApiError::validation(
            "invalid_value",
            "Invalid limit: 0. Limit must be a positive integer",
        )),
        Some(limit) => Ok(limit.min(MAX_AUDIT_LIMIT)),
    }
}

/// A public ID such as `C-12`: a prefix, a dash and a positive number.
pub fn validate_public_id(public_id: &str) -> Result<&str, ApiError> {
    match crate::domain::parse_public_id(public_id) {
        Some((_, n)) if n > 0 => Ok(public_id),
        _ => Err(ApiError::validation(
            "invalid_value",
            format!("Invalid public id: {public_id}"),
        )),
    }
}

/// A `YYYY-MM-DD` date. Blank means absent.
pub fn validate_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                ApiError::validation(
                    "invalid_date",
                    format!("Invalid {field}: {raw}. Expected YYYY-MM-DD"),
                )
            }),
    }
}

/// Report window. Missing bounds fall back to the current calendar month.
pub fn validate_report_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<ReportRange, ApiError> {
    let month = ReportRange::month_of(Utc::now().date_naive());
    let range = ReportRange {
        start: validate_date("start_date", start)?.unwrap_or(month.start),
        end: validate_date("end_date", end)?.unwrap_or(month.end),
    };
    if range.start > range.end {
        return Err(ApiError::validation(
            "invalid_range",
            "start_date must not be after end_date",
        ));
    }
    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_caps() {
        assert_eq!(validate_limit(None).unwrap(), DEFAULT_AUDIT_LIMIT);
        assert_eq!(validate_limit(Some(20)).unwrap(), 20);
        assert_eq!(validate_limit(Some(10_000)).unwrap(), MAX_AUDIT_LIMIT);
        assert!(validate_limit(Some(0)).is_err());
    }

    #[test]
    fn public_ids() {
        assert!(validate_public_id("ADM-1").is_ok());
        assert!(validate_public_id("C-0").is_err());
        assert!(validate_public_id("nope").is_err());
    }

    #[test]
    fn report_dates() {
        let range = validate_report_range(Some("2026-10-01"), Some(" 2026-10-31 ")).unwrap();
        assert_eq!(range.start.to_string(), "2026-10-01");
        assert_eq!(range.end.to_string(), "2026-10-31");

        let defaulted = validate_report_range(None, Some("")).unwrap();
        assert!(defaulted.start <= defaulted.end);

        let err = validate_report_range(Some("10/01/2026"), None).unwrap_err();
        assert_eq!(err.code(), "invalid_date");

        let err = validate_report_range(Some("2026-11-01"), Some("2026-10-01")).unwrap_err();
        assert_eq!(err.code(), "invalid_range");
    }
}
