//! Time helpers.

use chrono::Duration;

/// Largest whole-second span `chrono::Duration` accepts.
const MAX_SECONDS: u64 = (i64::MAX / 1000) as u64;

/// Config seconds as a signed duration, saturating instead of panicking.
#[must_use]
pub fn seconds(secs: u64) -> Duration {
    #[allow(clippy::cast_possible_wrap)]
    Duration::seconds(secs.min(MAX_SECONDS) as i64)
}

/// Config milliseconds as a signed duration, saturating.
#[must_use]
pub fn millis(ms: u64) -> Duration {
    #[allow(clippy::cast_possible_wrap)]
    Duration::milliseconds(ms.min(i64::MAX as u64) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturates_huge_values() {
        assert_eq!(seconds(30), Duration::seconds(30));
        assert!(seconds(u64::MAX) > Duration::days(365 * 1000));
        assert_eq!(millis(1500), Duration::milliseconds(1500));
    }
}
