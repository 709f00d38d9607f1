//! Unified-diff hunk headers.

use std::fmt;
use std::iter;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use truechurn_core::ChurnError;

/// The two ranges named by a hunk header, `-R[,C] +R[,C]`.
///
/// A count omitted from the text defaults to 1. An explicit `0` is kept as 0.
///
/// # Examples
///
/// ```
/// use truechurn_difflens::HunkHeader;
///
/// let header: HunkHeader = "-13 +27,5".parse().unwrap();
/// assert_eq!(header.removed_start, 13);
/// assert_eq!(header.removed_count, 1);
/// assert_eq!(header.added_start, 27);
/// assert_eq!(header.added_count, 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HunkHeader {
    /// First line of the removed range.
    pub removed_start: u32,
    /// Number of removed lines.
    pub removed_count: u32,
    /// First line of the added range.
    pub added_start: u32,
    /// Number of added lines.
    pub added_count: u32,
}

impl HunkHeader {
    /// Parse the text between the `@@` markers of a hunk header line.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Parse`] when the text is not exactly two
    /// space-separated ranges, a range lacks its `-`/`+` sign, or a start or
    /// count is not a decimal number.
    ///
    /// # Examples
    ///
    /// ```
    /// use truechurn_difflens::HunkHeader;
    ///
    /// assert!(HunkHeader::parse("-1,2 +1,3").is_ok());
    /// assert!(HunkHeader::parse("1,2 +1,3").is_err());
    /// assert!(HunkHeader::parse("-a +1").is_err());
    /// ```
    pub fn parse(text: &str) -> Result<Self, ChurnError> {
        let (old, new) = text
            .split_once(' ')
            .ok_or_else(|| ChurnError::Parse(format!("invalid hunk header: {text:?}")))?;
        if new.contains(' ') {
            return Err(ChurnError::Parse(format!("invalid hunk header: {text:?}")));
        }

        let old = old
            .strip_prefix('-')
            .ok_or_else(|| ChurnError::Parse(format!("invalid removed range in hunk: {text:?}")))?;
        let new = new
            .strip_prefix('+')
            .ok_or_else(|| ChurnError::Parse(format!("invalid added range in hunk: {text:?}")))?;

        let (removed_start, removed_count) = parse_range(old, text)?;
        let (added_start, added_count) = parse_range(new, text)?;

        Ok(Self {
            removed_start,
            removed_count,
            added_start,
            added_count,
        })
    }

    /// The line-address touches this hunk attributes.
    ///
    /// When both ranges start at the same address the hunk rewrote that
    /// position in place and yields one touch of `added - removed`.
    /// Otherwise the removal and the addition are two separate touches.
    ///
    /// # Examples
    ///
    /// ```
    /// use truechurn_difflens::{HunkHeader, LineDelta};
    ///
    /// let header = HunkHeader::parse("-10,1 +10,3").unwrap();
    /// assert_eq!(header.line_delta(), LineDelta::InPlace { address: 10, magnitude: 2 });
    /// ```
    pub fn line_delta(&self) -> LineDelta {
        if self.removed_start == self.added_start {
            LineDelta::InPlace {
                address: self.added_start,
                magnitude: i64::from(self.added_count) - i64::from(self.removed_count),
            }
        } else {
            LineDelta::Split {
                removed: (self.removed_start, i64::from(self.removed_count)),
                added: (self.added_start, i64::from(self.added_count)),
            }
        }
    }
}

impl FromStr for HunkHeader {
    type Err = ChurnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for HunkHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "-{},{} +{},{}",
            self.removed_start, self.removed_count, self.added_start, self.added_count
        )
    }
}

/// Change mass a hunk attributes to one or two line addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineDelta {
    /// Removal and addition start at the same address.
    InPlace {
        /// The shared start line.
        address: u32,
        /// `added_count - removed_count`; may be negative.
        magnitude: i64,
    },
    /// Removal and addition start at different addresses.
    Split {
        /// `(removed_start, removed_count)`.
        removed: (u32, i64),
        /// `(added_start, added_count)`.
        added: (u32, i64),
    },
}

impl LineDelta {
    /// `(address, magnitude)` pairs in application order, removal first.
    pub fn touches(&self) -> impl Iterator<Item = (u32, i64)> {
        let (first, second) = match *self {
            LineDelta::InPlace { address, magnitude } => ((address, magnitude), None),
            LineDelta::Split { removed, added } => (removed, Some(added)),
        };
        iter::once(first).chain(second)
    }
}

fn parse_range(range: &str, context: &str) -> Result<(u32, u32), ChurnError> {
    match range.split_once(',') {
        Some((start, count)) => Ok((
            parse_number(start, "range start", context)?,
            parse_number(count, "range count", context)?,
        )),
        None => Ok((parse_number(range, "range start", context)?, 1)),
    }
}

// `u32::from_str` accepts a leading `+`, which is never valid here.
fn parse_number(digits: &str, what: &str, context: &str) -> Result<u32, ChurnError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ChurnError::Parse(format!("invalid {what} in hunk: {context:?}")));
    }
    digits
        .parse()
        .map_err(|_| ChurnError::Parse(format!("{what} out of range in hunk: {context:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_default_to_one() {
        let header = HunkHeader::parse("-13 +27").unwrap();
        assert_eq!(header.removed_count, 1);
        assert_eq!(header.added_count, 1);
    }

    #[test]
    fn explicit_zero_counts_are_literal() {
        let header = HunkHeader::parse("-5,0 +6,3").unwrap();
        assert_eq!(header.removed_count, 0);
        assert_eq!(header.added_count, 3);

        let header = HunkHeader::parse("-1,3 +0,0").unwrap();
        assert_eq!(header.added_start, 0);
        assert_eq!(header.added_count, 0);
    }

    #[test]
    fn missing_signs_are_rejected() {
        assert!(HunkHeader::parse("5,2 +8,1").is_err());
        assert!(HunkHeader::parse("-5,2 8,1").is_err());
        assert!(HunkHeader::parse("+5,2 -8,1").is_err());
    }

    #[test]
    fn non_numeric_fields_are_rejected() {
        assert!(HunkHeader::parse("-x +1").is_err());
        assert!(HunkHeader::parse("-1,y +1").is_err());
        assert!(HunkHeader::parse("-1, +1").is_err());
        assert!(HunkHeader::parse("-+1 +1").is_err());
        assert!(HunkHeader::parse("-99999999999 +1").is_err());
    }

    #[test]
    fn wrong_shape_is_rejected() {
        assert!(HunkHeader::parse("").is_err());
        assert!(HunkHeader::parse("-1").is_err());
        assert!(HunkHeader::parse("-1 +1 +2").is_err());
        assert!(HunkHeader::parse("-1  +1").is_err());
    }

    #[test]
    fn same_start_is_one_in_place_touch() {
        let delta = HunkHeader::parse("-10,1 +10,3").unwrap().line_delta();
        let touches: Vec<_> = delta.touches().collect();
        assert_eq!(touches, vec![(10, 2)]);
    }

    #[test]
    fn shrinking_in_place_rewrite_is_negative() {
        let delta = HunkHeader::parse("-4,5 +4,2").unwrap().line_delta();
        assert_eq!(
            delta,
            LineDelta::InPlace {
                address: 4,
                magnitude: -3
            }
        );
    }

    #[test]
    fn different_starts_are_two_touches() {
        let delta = HunkHeader::parse("-5,2 +8,1").unwrap().line_delta();
        let touches: Vec<_> = delta.touches().collect();
        assert_eq!(touches, vec![(5, 2), (8, 1)]);
    }

    #[test]
    fn display_always_spells_out_counts() {
        let header = HunkHeader::parse("-13 +27,5").unwrap();
        assert_eq!(header.to_string(), "-13,1 +27,5");
        assert_eq!(HunkHeader::parse(&header.to_string()).unwrap(), header);
    }
}
