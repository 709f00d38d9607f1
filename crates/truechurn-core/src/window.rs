use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::ChurnError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Half-open analysis window `[after, before)` over commit time.
///
/// Bounds are calendar dates interpreted as midnight UTC. A missing bound
/// leaves that side of the window open.
///
/// # Examples
///
/// ```
/// use truechurn_core::Window;
///
/// let window = Window::parse(Some("2020-05-20"), Some("2020-05-30")).unwrap();
/// assert!(window.contains(1_590_000_000)); // 2020-05-20T18:40:00Z
/// assert!(window.contains(1_590_710_400)); // 2020-05-29T00:00:00Z
/// assert!(!window.contains(1_590_796_800)); // 2020-05-30T00:00:00Z
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    /// Inclusive lower bound.
    pub after: Option<NaiveDate>,
    /// Exclusive upper bound.
    pub before: Option<NaiveDate>,
}

impl Window {
    /// Build a window from two optional dates.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Config`] if `after` is not strictly earlier than
    /// `before`.
    pub fn new(after: Option<NaiveDate>, before: Option<NaiveDate>) -> Result<Self, ChurnError> {
        if let (Some(a), Some(b)) = (after, before) {
            if a >= b {
                return Err(ChurnError::Config(format!(
                    "window is empty: after ({a}) must be earlier than before ({b})"
                )));
            }
        }
        Ok(Self { after, before })
    }

    /// Build a window from `YYYY-MM-DD` strings.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Config`] for unparseable dates or an empty window.
    pub fn parse(after: Option<&str>, before: Option<&str>) -> Result<Self, ChurnError> {
        Self::new(
            after.map(parse_date).transpose()?,
            before.map(parse_date).transpose()?,
        )
    }

    /// Lower bound as a unix timestamp.
    pub fn after_timestamp(&self) -> Option<i64> {
        self.after.map(midnight_utc)
    }

    /// Upper bound as a unix timestamp.
    pub fn before_timestamp(&self) -> Option<i64> {
        self.before.map(midnight_utc)
    }

    /// Whether a unix timestamp falls inside the window.
    pub fn contains(&self, timestamp: i64) -> bool {
        let above = self.after_timestamp().map_or(true, |lo| timestamp >= lo);
        let below = self.before_timestamp().map_or(true, |hi| timestamp < hi);
        above && below
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.after, self.before) {
            (Some(a), Some(b)) => write!(f, "{a} to {b}"),
            (Some(a), None) => write!(f, "since {a}"),
            (None, Some(b)) => write!(f, "before {b}"),
            (None, None) => write!(f, "all history"),
        }
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, ChurnError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|e| ChurnError::Config(format!("invalid date '{raw}' (expected YYYY-MM-DD): {e}")))
}

fn midnight_utc(date: NaiveDate) -> i64 {
    NaiveDateTime::from(date).and_utc().timestamp()
}
