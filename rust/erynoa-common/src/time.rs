use chrono::{DateTime, SubsecRound, Utc};

/// The current wall-clock time in UTC, at millisecond precision.
///
/// Timestamps are persisted as Unix milliseconds, so truncating here keeps a
/// value equal to itself after a storage round trip.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// The current wall-clock time as milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_truncates_to_milliseconds() {
        let at = now();
        assert_eq!(at.timestamp_subsec_nanos() % 1_000_000, 0);
        assert_eq!(DateTime::from_timestamp_millis(at.timestamp_millis()), Some(at));
    }
}
