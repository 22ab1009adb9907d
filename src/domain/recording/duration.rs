//! Duration value object

use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use crate::domain::error::DurationParseError;

/// Default transcode (remux) timeout (60 seconds)
pub const DEFAULT_TRANSCODE_TIMEOUT_SECS: u64 = 60;

/// Value object representing a whole-second, strictly positive duration.
/// Immutable and validated on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration {
    seconds: u64,
}

impl Duration {
    /// Create a Duration from seconds, rejecting zero
    pub fn from_secs(secs: u64) -> Result<Self, DurationParseError> {
        if secs == 0 {
            return Err(DurationParseError {
                input: secs.to_string(),
            });
        }
        Ok(Self { seconds: secs })
    }

    /// Create a Duration from a signed wire value, rejecting zero and negatives
    pub fn from_signed_secs(secs: i64) -> Result<Self, DurationParseError> {
        if secs <= 0 {
            return Err(DurationParseError {
                input: secs.to_string(),
            });
        }
        Self::from_secs(secs as u64)
    }

    /// Default transcode timeout
    pub const fn default_transcode_timeout() -> Self {
        Self {
            seconds: DEFAULT_TRANSCODE_TIMEOUT_SECS,
        }
    }

    /// Get duration in seconds
    pub const fn as_secs(&self) -> u64 {
        self.seconds
    }

    /// Convert to std::time::Duration
    pub const fn as_std(&self) -> StdDuration {
        StdDuration::from_secs(self.seconds)
    }
}

impl FromStr for Duration {
    type Err = DurationParseError;

    /// Parse a duration string into a Duration value object.
    /// Supported formats: "10", "30s", "1m", "2m30s"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim().to_lowercase();
        let err = || DurationParseError {
            input: s.to_string(),
        };

        // Bare integers are seconds
        if !input.is_empty() && input.chars().all(|c| c.is_ascii_digit()) {
            let secs: u64 = input.parse().map_err(|_| err())?;
            return Self::from_secs(secs).map_err(|_| err());
        }

        let mut minutes: u64 = 0;
        let mut seconds: u64 = 0;
        let mut current_num = String::new();
        let mut found_any = false;

        for ch in input.chars() {
            if ch.is_ascii_digit() {
                current_num.push(ch);
            } else if ch == 'm' && !current_num.is_empty() {
                minutes = current_num.parse().map_err(|_| err())?;
                current_num.clear();
                found_any = true;
            } else if ch == 's' && !current_num.is_empty() {
                seconds = current_num.parse().map_err(|_| err())?;
                current_num.clear();
                found_any = true;
            } else {
                return Err(err());
            }
        }

        if !current_num.is_empty() || !found_any {
            return Err(err());
        }

        let total = minutes
            .checked_mul(60)
            .and_then(|m| m.checked_add(seconds))
            .ok_or_else(err)?;

        Self::from_secs(total).map_err(|_| err())
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let minutes = self.seconds / 60;
        let seconds = self.seconds % 60;

        if minutes == 0 {
            write!(f, "{}s", seconds)
        } else if seconds == 0 {
            write!(f, "{}m", minutes)
        } else {
            write!(f, "{}m{}s", minutes, seconds)
        }
    }
}
