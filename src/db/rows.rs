//! Column decoding helpers shared by the repositories.

use super::DbError;
use chrono::{DateTime, Utc};
use sanction_proto::ProtoError;
use std::str::FromStr;
use uuid::Uuid;

pub(super) fn uuid(column: &str, value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Corrupt(format!("{column}: {e}")))
}

pub(super) fn opt_uuid(column: &str, value: Option<&str>) -> Result<Option<Uuid>, DbError> {
    value.map(|v| uuid(column, v)).transpose()
}

pub(super) fn ts(column: &str, secs: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| DbError::Corrupt(format!("{column}: timestamp {secs} out of range")))
}

pub(super) fn opt_ts(column: &str, secs: Option<i64>) -> Result<Option<DateTime<Utc>>, DbError> {
    secs.map(|s| ts(column, s)).transpose()
}

pub(super) fn parse<T>(column: &str, value: &str) -> Result<T, DbError>
where
    T: FromStr<Err = ProtoError>,
{
    value
        .parse()
        .map_err(|e: ProtoError| DbError::Corrupt(format!("{column}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sanction_proto::Severity;

    #[test]
    fn bad_uuid_is_corrupt() {
        assert!(matches!(uuid("id", "nope"), Err(DbError::Corrupt(_))));
    }

    #[test]
    fn enum_columns_parse() {
        let s: Severity = parse("severity_level", "high").unwrap();
        assert_eq!(s, Severity::High);
        assert!(parse::<Severity>("severity_level", "extreme").is_err());
    }

    #[test]
    fn timestamps_round_trip_seconds() {
        let at = ts("created_at", 1_700_000_000).unwrap();
        assert_eq!(at.timestamp(), 1_700_000_000);
        assert_eq!(opt_ts("reviewed_at", None).unwrap(), None);
    }
}
