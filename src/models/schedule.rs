//! Daily Schedule Model
//!
//! Parses the "every day HH:MM" trigger syntax together with an IANA time
//! zone, and turns it into the six-field cron expression the job scheduler
//! understands.

use std::sync::OnceLock;

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;

/// Errors that can occur while building a schedule
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("Invalid schedule expression: {expression} (expected \"every day HH:MM\")")]
    InvalidExpression { expression: String },

    #[error("Invalid time of day: {hour:02}:{minute:02}")]
    InvalidTime { hour: u32, minute: u32 },

    #[error("Invalid timezone identifier: {timezone}")]
    InvalidTimezone { timezone: String },
}

fn every_day_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^\s*every\s+day\s+(\d{1,2}):(\d{2})\s*$").expect("static regex is valid")
    })
}

/// A wall-clock time that recurs every calendar day in a fixed time zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    hour: u32,
    minute: u32,
    timezone: Tz,
}

impl DailySchedule {
    /// Create a schedule firing at `hour:minute` local time in `timezone`
    pub fn new(hour: u32, minute: u32, timezone: Tz) -> Result<Self, ScheduleError> {
        if hour > 23 || minute > 59 {
            return Err(ScheduleError::InvalidTime { hour, minute });
        }
        Ok(Self {
            hour,
            minute,
            timezone,
        })
    }

    /// Parse an expression such as `"every day 20:00"` with a timezone such as `"Asia/Colombo"`
    pub fn parse(expression: &str, timezone: &str) -> Result<Self, ScheduleError> {
        let timezone: Tz = timezone
            .trim()
            .parse()
            .map_err(|_| ScheduleError::InvalidTimezone {
                timezone: timezone.to_string(),
            })?;

        let invalid = || ScheduleError::InvalidExpression {
            expression: expression.to_string(),
        };
        let captures = every_day_pattern().captures(expression).ok_or_else(invalid)?;
        let hour = captures[1].parse::<u32>().map_err(|_| invalid())?;
        let minute = captures[2].parse::<u32>().map_err(|_| invalid())?;

        Self::new(hour, minute, timezone)
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Cron expression with a leading seconds field, interpreted in [`Self::timezone`]
    pub fn cron_expression(&self) -> String {
        format!("0 {} {} * * *", self.minute, self.hour)
    }

    /// The first firing strictly after `instant`
    ///
    /// Days on which the local time does not exist (a DST gap) are skipped;
    /// on days where it occurs twice the earlier instant is used.
    pub fn next_run_after(&self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let time_of_day = NaiveTime::from_hms_opt(self.hour, self.minute, 0)?;
        let mut date = instant.with_timezone(&self.timezone).date_naive();

        // A gap can only swallow the same wall-clock time on isolated days
        for _ in 0..4 {
            let candidate = self
                .timezone
                .from_local_datetime(&date.and_time(time_of_day))
                .earliest()
                .map(|local| local.with_timezone(&Utc));

            if let Some(candidate) = candidate {
                if candidate > instant {
                    return Some(candidate);
                }
            }
            date = date.checked_add_signed(Duration::days(1))?;
        }

        None
    }
}

impl std::fmt::Display for DailySchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "every day {:02}:{:02} ({})",
            self.hour,
            self.minute,
            self.timezone.name()
        )
    }
}
