use chrono::NaiveDateTime;
use rusqlite::Row;
use rusqlite::types::Type;

// Fixed-width so that lexical order in SQL equals chronological order
const STORED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
const ACCEPTED_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

pub(crate) fn ts_to_sql(ts: &NaiveDateTime) -> String {
    ts.format(STORED_FORMAT).to_string()
}

pub(crate) fn opt_ts_to_sql(ts: Option<&NaiveDateTime>) -> Option<String> {
    ts.map(ts_to_sql)
}

fn parse_stored(value: &str) -> Option<NaiveDateTime> {
    ACCEPTED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

pub(crate) fn ts_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    parse_stored(&raw).ok_or_else(|| conversion_error(idx, &raw))
}

pub(crate) fn opt_ts_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => parse_stored(&raw)
            .map(Some)
            .ok_or_else(|| conversion_error(idx, &raw)),
        None => Ok(None),
    }
}

pub(crate) fn conversion_error(idx: usize, raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("unrecognized stored value: {}", raw).into(),
    )
}

/// `LIKE` pattern for substring filters.
pub(crate) fn contains_pattern(needle: &str) -> String {
    format!("%{}%", needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_stored_format_orders_lexically() {
        let early = NaiveDate::from_ymd_opt(2025, 1, 9)
            .unwrap()
            .and_hms_micro_opt(9, 5, 0, 0)
            .unwrap();
        let late = NaiveDate::from_ymd_opt(2025, 1, 10)
            .unwrap()
            .and_hms_micro_opt(10, 0, 0, 120)
            .unwrap();

        let (a, b) = (ts_to_sql(&early), ts_to_sql(&late));
        assert_eq!(a, "2025-01-09T09:05:00.000000");
        assert!(a < b);
        assert_eq!(parse_stored(&b), Some(late));
    }

    #[test]
    fn test_parse_accepts_space_separator() {
        assert!(parse_stored("2025-01-09 09:05:00").is_some());
        assert!(parse_stored("yesterday").is_none());
    }
}
