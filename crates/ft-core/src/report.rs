//! Completed focus sessions, as sent to the collector.

use serde::{Deserialize, Serialize};

use crate::types::{TabId, TrackingMode, ValidationError};
use crate::domain::extract_domain;

/// Longest session the collector accepts: 31 days.
pub const MAX_SESSION_MS: i64 = 31 * 24 * 60 * 60 * 1000;

/// What a session is attributed to.
///
/// Serialized as a single `"domain"` or `"url"` field on the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportTarget {
    Domain(String),
    Url(String),
}

impl ReportTarget {
    /// Builds the target for `url` under the given tracking mode.
    pub fn for_mode(mode: TrackingMode, url: &str) -> Self {
        match mode {
            TrackingMode::Domain => Self::Domain(extract_domain(url)),
            TrackingMode::Url => Self::Url(url.to_string()),
        }
    }

    /// The domain or URL string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Domain(s) | Self::Url(s) => s,
        }
    }
}

/// A finished focus session.
///
/// Wire form: `{"tabId":1,"domain":"a.com","openTime":1000,"closeTime":9000,"activeDuration":8000}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub tab_id: TabId,
    #[serde(flatten)]
    pub target: ReportTarget,
    /// Session start, milliseconds since the Unix epoch.
    pub open_time: i64,
    /// Session end, milliseconds since the Unix epoch.
    pub close_time: i64,
    /// `close_time - open_time`.
    pub active_duration: i64,
}

impl SessionReport {
    /// Builds a report for the interval `[open_time, close_time]`.
    ///
    /// A `close_time` earlier than `open_time` (clock stepped backwards) is
    /// clamped to `open_time`, so the duration is never negative.
    pub fn new(tab_id: TabId, target: ReportTarget, open_time: i64, close_time: i64) -> Self {
        let close_time = close_time.max(open_time);
        Self {
            tab_id,
            target,
            open_time,
            close_time,
            active_duration: close_time - open_time,
        }
    }

    /// Checks a report received from outside the process.
    ///
    /// Accepted reports open at or after the epoch and last at most
    /// [`MAX_SESSION_MS`], so sums over many of them stay in range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let (open_time, close_time) = (self.open_time, self.close_time);
        if close_time < open_time {
            return Err(ValidationError::InvertedInterval {
                open_time,
                close_time,
            });
        }
        let expected = close_time
            .checked_sub(open_time)
            .ok_or(ValidationError::IntervalOverflow {
                open_time,
                close_time,
            })?;
        if open_time < 0 {
            return Err(ValidationError::OpenTimeBeforeEpoch { open_time });
        }
        if self.active_duration != expected {
            return Err(ValidationError::DurationMismatch {
                reported: self.active_duration,
                expected,
            });
        }
        if expected > MAX_SESSION_MS {
            return Err(ValidationError::SessionTooLong {
                duration: expected,
                max: MAX_SESSION_MS,
            });
        }
        Ok(())
    }
}
