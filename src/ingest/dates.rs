// src/ingest/dates.rs
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

/// Parse the date formats seen in paper feeds to unix seconds (0 = unknown).
/// Accepts RFC 3339 (Atom), RFC 2822 (RSS) and plain `YYYY-MM-DD`.
pub fn parse_feed_date(ts: &str) -> u64 {
    let ts = ts.trim();
    if ts.is_empty() {
        return 0;
    }
    OffsetDateTime::parse(ts, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(ts, &Rfc2822))
        .ok()
        .or_else(|| {
            Date::parse(ts, format_description!("[year]-[month]-[day]"))
                .ok()
                .map(|d| d.midnight().assume_utc())
        })
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
        .unwrap_or(0)
}
