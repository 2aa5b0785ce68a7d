//! Wall-clock access for completion stamps.

use chrono::{DateTime, Utc};

/// Where timestamps come from. Services carry one by value so tests can pin time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    /// Reads the system clock on every call.
    #[default]
    System,
    /// Always answers the same instant.
    Pinned(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub const fn fixed(at: DateTime<Utc>) -> Self {
        Self::Pinned(at)
    }

    #[must_use]
    pub fn now(self) -> DateTime<Utc> {
        match self {
            Self::System => Utc::now(),
            Self::Pinned(at) => at,
        }
    }
}

/// Seconds since the epoch of the instant deterministic tests run at.
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// 2023-11-14T22:13:20Z.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::from_timestamp(FIXED_TEST_TIMESTAMP, 0).unwrap_or_default()
}

#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_clock_never_moves() {
        let clock = fixed_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2023-11-14T22:13:20+00:00");
    }

    #[test]
    fn system_clock_is_the_default() {
        assert_eq!(Clock::default(), Clock::System);
        assert!(Clock::System.now() > fixed_now());
    }
}
