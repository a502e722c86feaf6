use super::*;
use time::macros::datetime;

#[test]
fn iso_timestamp_keeps_milliseconds() {
    let at = datetime!(2024-05-01 12:30:15.123_456_789 UTC);
    assert_eq!(iso_timestamp(at), "2024-05-01T12:30:15.123Z");
}

#[test]
fn iso_timestamp_normalizes_offset_to_utc() {
    let at = datetime!(2024-05-01 14:00:00.5 +02:00);
    assert_eq!(iso_timestamp(at), "2024-05-01T12:00:00.500Z");
}

#[test]
fn iso_timestamp_pads_whole_seconds() {
    let at = datetime!(2024-05-01 12:00:00 UTC);
    assert_eq!(iso_timestamp(at), "2024-05-01T12:00:00.000Z");
}

#[test]
fn iso_timestamp_keeps_trailing_zero_millis() {
    let at = datetime!(2024-05-01 12:00:00.12 UTC);
    assert_eq!(iso_timestamp(at), "2024-05-01T12:00:00.120Z");
}

#[test]
fn epoch_millis_truncates_nanoseconds() {
    let at = datetime!(1970-01-01 00:00:01.999_999 UTC);
    assert_eq!(epoch_millis(at), 1999);
}
