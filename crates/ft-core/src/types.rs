//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid tracking mode value.
    #[error("invalid tracking mode: {value} (expected `domain` or `url`)")]
    InvalidTrackingMode { value: String },

    /// A session interval that closes before it opens.
    #[error("session closes before it opens: openTime {open_time}, closeTime {close_time}")]
    InvertedInterval { open_time: i64, close_time: i64 },

    /// The interval bounds are too far apart to subtract.
    #[error("session interval overflows: openTime {open_time}, closeTime {close_time}")]
    IntervalOverflow { open_time: i64, close_time: i64 },

    /// A session that starts before the Unix epoch.
    #[error("session opens before the Unix epoch: openTime {open_time}")]
    OpenTimeBeforeEpoch { open_time: i64 },

    /// A session longer than any real focus interval.
    #[error("session lasts {duration} ms, longer than the {max} ms limit")]
    SessionTooLong { duration: i64, max: i64 },

    /// The reported duration disagrees with the interval bounds.
    #[error("activeDuration {reported} does not match closeTime - openTime ({expected})")]
    DurationMismatch { reported: i64, expected: i64 },
}

/// How a session is keyed when it is reported.
///
/// `Domain` reduces URLs to their hostname and follows in-place navigation
/// across hosts; `Url` reports the raw URL and ignores navigation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingMode {
    /// Report the extracted hostname.
    #[default]
    Domain,
    /// Report the full URL.
    Url,
}

impl TrackingMode {
    /// String representation used in configuration.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Url => "url",
        }
    }
}

impl fmt::Display for TrackingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TrackingMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "domain" => Ok(Self::Domain),
            "url" => Ok(Self::Url),
            _ => Err(ValidationError::InvalidTrackingMode {
                value: s.to_string(),
            }),
        }
    }
}

/// Generates an integer ID newtype matching the browser's numeric identifiers.
macro_rules! define_int_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw browser identifier.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw identifier.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_int_id!(
    /// A browser tab identifier.
    TabId
);

define_int_id!(
    /// A browser window identifier.
    ///
    /// [`WindowId::NONE`] is the sentinel the browser sends when no window
    /// has focus.
    WindowId
);

impl WindowId {
    /// No browser window has focus.
    pub const NONE: Self = Self(-1);

    /// Returns true for the "no window focused" sentinel.
    #[must_use]
    pub const fn is_unfocused(self) -> bool {
        self.0 == Self::NONE.0
    }
}

/// Metadata for a browser tab, as returned by a tab lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: TabId,
    pub window_id: WindowId,
    pub url: String,
    /// Whether this is the selected tab in its window.
    #[serde(default)]
    pub active: bool,
}
