// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Time source and timestamp format.
//!
//! Timestamps are persisted in ISO-8601 form, more precisely the RFC 3339
//! profile of it, e.g., `2020-05-01T12:30:00+00:00`.

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};

/// Source of the current time.
pub trait Clock {
    /// Current point in time.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock reading the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a given point in time.
#[derive(Debug, Clone, Copy)]
pub struct FrozenClock(DateTime<Utc>);

impl FrozenClock {
    /// Construct new clock stuck at target time.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(now)
    }
}

impl Clock for FrozenClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Format timestamp as ISO-8601.
pub fn format(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Parse ISO-8601 timestamp, keeping any offset it was written with.
///
/// # Errors
///
/// - Return [`chrono::ParseError`] if input is not a valid timestamp.
pub fn parse(input: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::<FixedOffset>::parse_from_rfc3339(input.trim()).map(|time| time.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn format_then_parse_keeps_instant() -> anyhow::Result<()> {
        let time = Utc.with_ymd_and_hms(2020, 5, 1, 12, 30, 0).unwrap();

        assert_eq!(format(time), "2020-05-01T12:30:00+00:00");
        assert_eq!(parse("2020-05-01T12:30:00+00:00")?, time);
        assert_eq!(parse("2020-05-01T14:30:00+02:00")?, time);

        Ok(())
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse("yesterday").is_err());
    }
}
