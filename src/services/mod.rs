pub mod analysis;
pub mod nutrition;
pub mod upload;

use time::OffsetDateTime;
use time::format_description::FormatItem;
use time::macros::format_description;

const ISO_MILLIS: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
);

/// RFC 3339 UTC timestamp with exactly three fractional digits (`2024-05-01T12:00:00.123Z`).
#[must_use]
pub fn iso_timestamp(at: OffsetDateTime) -> String {
    at.to_offset(time::UtcOffset::UTC).format(ISO_MILLIS).unwrap_or_default()
}

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn epoch_millis(at: OffsetDateTime) -> i64 {
    i64::try_from(at.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
