//! Per-file, per-line change bookkeeping for one author and window.

use std::collections::HashMap;

use truechurn_core::{ChurnError, ChurnResult};
use truechurn_difflens::{scan_commit_diff, HunkHeader};

/// Line address → accumulated signed change mass, for one file.
pub type LineChangeMap = HashMap<u32, i64>;

/// File path → [`LineChangeMap`].
pub type FileChangeMap = HashMap<String, LineChangeMap>;

/// Record one hunk in `files` and classify its change mass.
///
/// Each touch of an address already present in the file's map adds its
/// absolute magnitude to churn; each touch of a new address adds it to
/// contribution. Entries accumulate the signed magnitude and are never
/// removed.
///
/// # Examples
///
/// ```
/// use truechurn_difflens::HunkHeader;
/// use truechurn_ledger::{ledger::apply, FileChangeMap};
///
/// let mut files = FileChangeMap::new();
/// let delta = apply(&mut files, "lib.rs", &HunkHeader::parse("-5,2 +8,1").unwrap());
/// assert_eq!(delta.contribution, 3);
/// assert_eq!(files["lib.rs"].len(), 2);
/// ```
pub fn apply(files: &mut FileChangeMap, path: &str, header: &HunkHeader) -> ChurnResult {
    let lines = files.entry(path.to_string()).or_default();

    let mut delta = ChurnResult::default();
    for (address, magnitude) in header.line_delta().touches() {
        match lines.get_mut(&address) {
            Some(total) => {
                *total += magnitude;
                delta.churn += magnitude.unsigned_abs();
            }
            None => {
                lines.insert(address, magnitude);
                delta.contribution += magnitude.unsigned_abs();
            }
        }
    }
    delta
}

/// Change history of one author inside one window of one repository.
///
/// Owns its [`FileChangeMap`] and the running totals. Commits must be fed
/// oldest first: whether a touch is contribution or churn depends on what
/// the ledger has already seen.
///
/// # Examples
///
/// ```
/// use truechurn_ledger::Ledger;
///
/// let mut ledger = Ledger::new();
/// ledger.apply_commit("+++ a.rs\n@@ -10 +10,3 @@\n").unwrap();
/// ledger.apply_commit("+++ a.rs\n@@ -10,3 +10 @@\n").unwrap();
/// assert_eq!(ledger.totals().contribution, 2);
/// assert_eq!(ledger.totals().churn, 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    files: FileChangeMap,
    totals: ChurnResult,
}

impl Ledger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a single hunk and return its classification.
    pub fn apply(&mut self, path: &str, header: &HunkHeader) -> ChurnResult {
        let delta = apply(&mut self.files, path, header);
        self.totals += delta;
        delta
    }

    /// Record every hunk of one commit's diff text.
    ///
    /// The diff is scanned completely before anything is recorded.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Parse`] if any hunk header is malformed; the
    /// ledger is left untouched in that case.
    pub fn apply_commit(&mut self, diff: &str) -> Result<ChurnResult, ChurnError> {
        let events = scan_commit_diff(diff)?;
        Ok(events
            .iter()
            .map(|event| self.apply(&event.path, &event.header))
            .sum())
    }

    /// Contribution and churn recorded so far.
    pub fn totals(&self) -> ChurnResult {
        self.totals
    }

    /// Per-file line history recorded so far.
    pub fn files(&self) -> &FileChangeMap {
        &self.files
    }

    /// Give up the ledger, keeping its per-file detail.
    pub fn into_files(self) -> FileChangeMap {
        self.files
    }
}
