use std::time::Duration;

use chrono::{DateTime, Local};

/// Monotonic time elapsed since the access loop started.
///
/// All decision timing (hold expiry, alert cooldown) is expressed in this
/// clock so the engine never reads the wall clock itself.
pub type Timestamp = Duration;

/// Converts fractional seconds to a [`Timestamp`], or `None` if `secs` is
/// negative, not a number, or too large to represent.
pub fn try_from_secs(secs: f64) -> Option<Timestamp> {
    Duration::try_from_secs_f64(secs).ok()
}

/// Like [`try_from_secs`], but clamps negatives and NaN to zero and
/// saturates values past the representable range.
pub fn from_secs(secs: f64) -> Timestamp {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    try_from_secs(secs).unwrap_or(Duration::MAX)
}

/// Wall-clock instant at which the loop started.
///
/// Sinks use it to turn a [`Timestamp`] into a local date for log lines and
/// snapshot filenames.
#[derive(Clone, Copy, Debug)]
pub struct ClockAnchor {
    started_at: DateTime<Local>,
}

impl ClockAnchor {
    pub fn now() -> Self {
        Self::at(Local::now())
    }

    pub fn at(started_at: DateTime<Local>) -> Self {
        Self { started_at }
    }

    /// Wall time `at` past the anchor. Offsets beyond chrono's range fall
    /// back to the anchor itself.
    pub fn wall_time(&self, at: Timestamp) -> DateTime<Local> {
        chrono::Duration::from_std(at)
            .ok()
            .and_then(|offset| self.started_at.checked_add_signed(offset))
            .unwrap_or(self.started_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[test]
    fn test_from_secs_fractional() {
        assert_eq!(from_secs(2.5), Duration::from_millis(2500));
    }

    #[rstest]
    #[case::negative(-1.0)]
    #[case::nan(f64::NAN)]
    fn test_from_secs_invalid_clamps_to_zero(#[case] secs: f64) {
        assert_eq!(from_secs(secs), Duration::ZERO);
    }

    #[rstest]
    #[case::huge(1e30)]
    #[case::infinite(f64::INFINITY)]
    fn test_from_secs_out_of_range_saturates(#[case] secs: f64) {
        assert_eq!(from_secs(secs), Duration::MAX);
    }

    #[rstest]
    #[case::negative(-0.5)]
    #[case::nan(f64::NAN)]
    #[case::huge(1e30)]
    fn test_try_from_secs_rejects_unrepresentable(#[case] secs: f64) {
        assert_eq!(try_from_secs(secs), None);
    }

    #[test]
    fn test_wall_time_offsets_anchor() {
        let start = Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let anchor = ClockAnchor::at(start);
        let wall = anchor.wall_time(Duration::from_secs(90));
        assert_eq!(wall.format("%H:%M:%S").to_string(), "12:01:30");
    }

    #[test]
    fn test_wall_time_out_of_range_falls_back_to_anchor() {
        let start = Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let anchor = ClockAnchor::at(start);
        assert_eq!(anchor.wall_time(Duration::MAX), start);
    }
}
