//! Line-oriented scanning of one commit's diff text.
//!
//! Expects the output of `git show --format= --unified=0 --no-prefix`:
//! file markers carry bare paths and binary changes have no hunks.

use std::str::Lines;

use serde::{Deserialize, Serialize};
use truechurn_core::ChurnError;

use crate::hunk::HunkHeader;

const FILE_MARKER: &str = "+++ ";
const HUNK_MARKER: &str = "@@";
const HUNK_CLOSE: &str = " @@";

/// A hunk header together with the file it belongs to.
///
/// # Examples
///
/// ```
/// use truechurn_difflens::{HunkEvent, HunkHeader};
///
/// let event = HunkEvent {
///     path: "src/lib.rs".into(),
///     header: HunkHeader::parse("-3 +3,2").unwrap(),
/// };
/// assert_eq!(event.header.added_count, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HunkEvent {
    /// Path named by the most recent `+++ ` marker.
    pub path: String,
    /// Parsed hunk header.
    pub header: HunkHeader,
}

/// Iterator over the hunk events of one commit's diff text.
///
/// Carries two pieces of state across lines: the current file, replaced on
/// every `+++ ` marker, and the current hunk header text, replaced on every
/// `@@` line. An event is emitted only when the header text differs from the
/// previous one; content lines are skipped.
///
/// Stops yielding useful events after the first error, so callers normally
/// collect into a `Result`.
///
/// # Examples
///
/// ```
/// use truechurn_difflens::DiffScanner;
///
/// let diff = "diff --git a.rs a.rs\n--- a.rs\n+++ a.rs\n@@ -1 +1,2 @@\n-x\n+y\n+z\n";
/// let events: Vec<_> = DiffScanner::new(diff).collect::<Result<_, _>>().unwrap();
/// assert_eq!(events.len(), 1);
/// assert_eq!(events[0].path, "a.rs");
/// ```
pub struct DiffScanner<'a> {
    lines: Lines<'a>,
    current_file: &'a str,
    current_hunk: &'a str,
}

impl<'a> DiffScanner<'a> {
    /// Start scanning `diff` with no file and no hunk selected.
    pub fn new(diff: &'a str) -> Self {
        Self {
            lines: diff.lines(),
            current_file: "",
            current_hunk: "",
        }
    }
}

impl<'a> Iterator for DiffScanner<'a> {
    type Item = Result<HunkEvent, ChurnError>;

    fn next(&mut self) -> Option<Self::Item> {
        for line in self.lines.by_ref() {
            if line.starts_with(FILE_MARKER) {
                self.current_file = file_path(line);
                continue;
            }

            if !line.starts_with(HUNK_MARKER) {
                continue;
            }

            let text = match header_text(line) {
                Ok(text) => text,
                Err(e) => return Some(Err(e)),
            };
            if text == self.current_hunk {
                continue;
            }
            self.current_hunk = text;

            return Some(HunkHeader::parse(text).map(|header| HunkEvent {
                path: self.current_file.to_string(),
                header,
            }));
        }
        None
    }
}

/// Scan a whole commit diff into its hunk events.
///
/// # Errors
///
/// Returns [`ChurnError::Parse`] for the first malformed hunk header. No
/// events are returned in that case, so a commit is either fully accounted
/// or not at all.
///
/// # Examples
///
/// ```
/// use truechurn_difflens::scan_commit_diff;
///
/// assert!(scan_commit_diff("").unwrap().is_empty());
/// assert!(scan_commit_diff("+++ a.rs\n@@ -1 +x @@\n").is_err());
/// ```
pub fn scan_commit_diff(diff: &str) -> Result<Vec<HunkEvent>, ChurnError> {
    DiffScanner::new(diff).collect()
}

// Everything after the final space, so `+++ b/src/x.rs` and `+++ src/x.rs`
// differ; the diff is expected to be generated without prefixes.
fn file_path(line: &str) -> &str {
    line.rfind(' ').map_or(line, |idx| &line[idx + 1..])
}

fn header_text(line: &str) -> Result<&str, ChurnError> {
    let malformed = || ChurnError::Parse(format!("malformed hunk header line: {line:?}"));
    let (_, rest) = line.split_once(' ').ok_or_else(malformed)?;
    let end = rest.find(HUNK_CLOSE).ok_or_else(malformed)?;
    Ok(&rest[..end])
}
