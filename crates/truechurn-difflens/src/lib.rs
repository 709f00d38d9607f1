//! Hunk-header parsing and diff stream scanning.
//!
//! Churn accounting never looks at changed line text. It only needs to know
//! which file each hunk belongs to and the ranges named in the hunk header,
//! so this crate reduces a zero-context unified diff to a sequence of
//! `(path, HunkHeader)` events.

pub mod hunk;
pub mod scanner;

pub use hunk::{HunkHeader, LineDelta};
pub use scanner::{scan_commit_diff, DiffScanner, HunkEvent};
