//! Shared value types for the generation domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! invariants (a poll interval is never zero, a resolution's area is bounded)
//! and participate in domain computations.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

/// Fixed delay between two status requests for an asynchronous task.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// The attempt budget for one asynchronous task.
///
/// `max_attempts` is `ceil(timeout / interval)`, computed once on construction
/// and never changed afterwards. A 180 s timeout at the default 5 s interval
/// yields 36 attempts; 121 s yields 25.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    interval: Duration,
    timeout: Duration,
    max_attempts: u32,
}

impl PollPolicy {
    /// Creates a policy with the default 5 second interval.
    ///
    /// Returns `None` if `timeout` is zero.
    #[must_use]
    pub fn new(timeout: Duration) -> Option<Self> {
        Self::with_interval(DEFAULT_POLL_INTERVAL, timeout)
    }

    /// Creates a policy with an explicit interval.
    ///
    /// Returns `None` if either duration is zero (or below one millisecond),
    /// or if the resulting attempt count does not fit in a `u32`.
    #[must_use]
    pub fn with_interval(interval: Duration, timeout: Duration) -> Option<Self> {
        let interval_ms = interval.as_millis();
        let timeout_ms = timeout.as_millis();
        if interval_ms == 0 || timeout_ms == 0 {
            return None;
        }
        let max_attempts = u32::try_from(timeout_ms.div_ceil(interval_ms)).ok()?;
        Some(Self {
            interval,
            timeout,
            max_attempts,
        })
    }

    /// Delay slept before every status request.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The configured timeout the attempt budget was derived from.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of status requests allowed before the task times out.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Smallest accepted output area (1024 × 1024) for size-constrained backends.
pub const MIN_RESOLUTION_AREA: u64 = 1024 * 1024;

/// Largest accepted output area (4096 × 4096) for size-constrained backends.
pub const MAX_RESOLUTION_AREA: u64 = 4096 * 4096;

/// An output image size whose area lies in
/// [`MIN_RESOLUTION_AREA`]`..=`[`MAX_RESOLUTION_AREA`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    width: u32,
    height: u32,
}

impl Resolution {
    /// Creates a [`Resolution`], returning `None` if the area is out of range.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Option<Self> {
        let area = u64::from(width) * u64::from(height);
        if (MIN_RESOLUTION_AREA..=MAX_RESOLUTION_AREA).contains(&area) {
            Some(Self { width, height })
        } else {
            None
        }
    }

    /// Parses a `"WIDTHxHEIGHT"` size string into raw dimensions.
    ///
    /// Only the syntax is checked; pass the result to [`Resolution::new`] for
    /// the area bounds.
    pub fn parse_dimensions(size: &str) -> Option<(u32, u32)> {
        let (w, h) = size.trim().split_once(['x', 'X'])?;
        Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
    }

    pub fn width(self) -> u32 {
        self.width
    }

    pub fn height(self) -> u32 {
        self.height
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly. Request signing takes a [`Timestamp`] as an argument instead of
/// reading the clock, which keeps signatures reproducible in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }

    /// ISO-8601 basic format with second precision: `YYYYMMDDTHHMMSSZ`.
    pub fn to_basic_iso8601(self) -> String {
        self.0.format("%Y%m%dT%H%M%SZ").to_string()
    }

    /// The 8-character calendar date: `YYYYMMDD`.
    pub fn to_date_stamp(self) -> String {
        self.0.format("%Y%m%d").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn attempt_budget_is_the_ceiling_of_timeout_over_interval() {
        let exact = PollPolicy::new(Duration::from_secs(180)).unwrap();
        assert_eq!(exact.max_attempts(), 36);

        let rounded_up = PollPolicy::new(Duration::from_secs(121)).unwrap();
        assert_eq!(rounded_up.max_attempts(), 25);

        let short = PollPolicy::new(Duration::from_secs(1)).unwrap();
        assert_eq!(short.max_attempts(), 1);
    }

    #[test]
    fn zero_durations_are_rejected() {
        assert!(PollPolicy::new(Duration::ZERO).is_none());
        assert!(PollPolicy::with_interval(Duration::ZERO, Duration::from_secs(10)).is_none());
        assert!(
            PollPolicy::with_interval(Duration::from_micros(10), Duration::from_secs(10)).is_none()
        );
    }

    #[test]
    fn custom_interval_uses_millisecond_ceiling() {
        let policy =
            PollPolicy::with_interval(Duration::from_millis(300), Duration::from_secs(1)).unwrap();
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.interval(), Duration::from_millis(300));
        assert_eq!(policy.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn resolution_bounds_are_inclusive_on_area() {
        assert!(Resolution::new(1024, 1023).is_none());
        assert!(Resolution::new(1024, 1024).is_some());
        assert!(Resolution::new(4096, 4096).is_some());
        assert!(Resolution::new(4096, 4097).is_none());
        // Area matters, not the individual sides.
        assert!(Resolution::new(512, 2048).is_some());
    }

    #[test]
    fn size_strings_parse_into_dimensions() {
        assert_eq!(Resolution::parse_dimensions("2048x2048"), Some((2048, 2048)));
        assert_eq!(Resolution::parse_dimensions(" 1024X1536 "), Some((1024, 1536)));
        assert_eq!(Resolution::parse_dimensions("2048"), None);
        assert_eq!(Resolution::parse_dimensions("axb"), None);
    }

    #[test]
    fn timestamp_formats_for_signing() {
        let ts = Timestamp::from_utc(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
        assert_eq!(ts.to_basic_iso8601(), "20240101T120000Z");
        assert_eq!(ts.to_date_stamp(), "20240101");
    }
}
