//! Card timestamp interpretation.
//!
//! Cards do not agree on a time encoding. Values are classified by
//! magnitude, and anything that fits no known range falls back to the
//! session read time. The chosen interpretation travels with the transaction
//! as a [`TimestampSource`].

use chrono::{DateTime, Utc};
use farecard_core::TimestampSource;
use farecard_core::constants::{EPOCH_MILLIS_MIN, EPOCH_SECONDS_MAX, EPOCH_SECONDS_MIN};

/// Interpret a 64-bit card value as seconds or milliseconds since the epoch.
///
/// - `1e9 < value < 1e10`: Unix seconds
/// - `value > 1e12`: Unix milliseconds
/// - anything else: `read_at`
///
/// ```
/// use chrono::{DateTime, Utc};
/// use farecard_core::TimestampSource;
/// use farecard_protocol::timestamp::interpret_epoch;
///
/// let read_at = DateTime::<Utc>::UNIX_EPOCH;
/// let (at, source) = interpret_epoch(1_700_000_000, read_at);
/// assert_eq!(at.timestamp(), 1_700_000_000);
/// assert_eq!(source, TimestampSource::CardSeconds);
///
/// let (at, source) = interpret_epoch(42, read_at);
/// assert_eq!(at, read_at);
/// assert_eq!(source, TimestampSource::ReadTime);
/// ```
pub fn interpret_epoch(value: u64, read_at: DateTime<Utc>) -> (DateTime<Utc>, TimestampSource) {
    let decoded = if value > EPOCH_SECONDS_MIN && value < EPOCH_SECONDS_MAX {
        i64::try_from(value)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|at| (at, TimestampSource::CardSeconds))
    } else if value > EPOCH_MILLIS_MIN {
        i64::try_from(value)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .map(|at| (at, TimestampSource::CardMillis))
    } else {
        None
    };

    decoded.unwrap_or((read_at, TimestampSource::ReadTime))
}

/// Interpret a 32-bit card value as Unix seconds, zero meaning "not set".
pub fn interpret_seconds(value: u32, read_at: DateTime<Utc>) -> (DateTime<Utc>, TimestampSource) {
    if value == 0 {
        return (read_at, TimestampSource::ReadTime);
    }
    DateTime::from_timestamp(i64::from(value), 0)
        .map(|at| (at, TimestampSource::CardSeconds))
        .unwrap_or((read_at, TimestampSource::ReadTime))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn read_at() -> DateTime<Utc> {
        DateTime::from_timestamp(1_750_000_000, 0).unwrap()
    }

    #[rstest]
    #[case(1_000_000_001, TimestampSource::CardSeconds)]
    #[case(9_999_999_998, TimestampSource::CardSeconds)]
    #[case(1_000_000_000, TimestampSource::ReadTime)]
    #[case(9_999_999_999, TimestampSource::ReadTime)]
    #[case(500_000_000_000, TimestampSource::ReadTime)]
    #[case(1_000_000_000_000, TimestampSource::ReadTime)]
    #[case(1_700_000_000_123, TimestampSource::CardMillis)]
    #[case(0, TimestampSource::ReadTime)]
    #[case(u64::MAX, TimestampSource::ReadTime)]
    fn test_interpret_epoch_ranges(#[case] value: u64, #[case] expected: TimestampSource) {
        let (_, source) = interpret_epoch(value, read_at());
        assert_eq!(source, expected);
    }

    #[test]
    fn test_interpret_epoch_millis_value() {
        let (at, _) = interpret_epoch(1_700_000_000_123, read_at());
        assert_eq!(at.timestamp_millis(), 1_700_000_000_123);
    }

    #[test]
    fn test_interpret_epoch_fallback_is_read_time() {
        let (at, _) = interpret_epoch(12, read_at());
        assert_eq!(at, read_at());
    }

    #[test]
    fn test_interpret_seconds() {
        assert_eq!(
            interpret_seconds(0, read_at()),
            (read_at(), TimestampSource::ReadTime)
        );
        let (at, source) = interpret_seconds(1_600_000_000, read_at());
        assert_eq!(at.timestamp(), 1_600_000_000);
        assert_eq!(source, TimestampSource::CardSeconds);
    }
}
