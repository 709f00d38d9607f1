//! Replaying commits through a ledger and merging results across units.
//!
//! A *unit* is one raw author string (an alias) in one repository. Units are
//! independent: each replays its own commits through its own [`Ledger`], so
//! they can run in any order or in parallel. Their results are merged per
//! canonical author with plain addition.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use truechurn_core::{ChurnError, ChurnResult};

use crate::ledger::Ledger;

/// A commit that could not be accounted and was left out of the totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedCommit {
    /// Commit identifier.
    pub commit: String,
    /// Why the commit was skipped.
    pub reason: String,
}

/// An in-progress replay of one author's commits, oldest first.
///
/// # Examples
///
/// ```
/// use truechurn_ledger::ChurnRun;
///
/// let mut run = ChurnRun::new();
/// run.record("c1", "+++ a.rs\n@@ -3 +3,2 @@\n");
/// run.record("c2", "+++ a.rs\n@@ nonsense @@\n");
/// assert_eq!(run.result().contribution, 1);
/// assert_eq!(run.skipped().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChurnRun {
    ledger: Ledger,
    applied: usize,
    skipped: Vec<SkippedCommit>,
}

impl ChurnRun {
    /// Start a replay with an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Account one commit's diff text.
    ///
    /// A commit with a malformed hunk header is skipped as a whole and logged;
    /// it contributes nothing and leaves the ledger unchanged.
    pub fn record(&mut self, commit: &str, diff: &str) -> ChurnResult {
        match self.ledger.apply_commit(diff) {
            Ok(delta) => {
                self.applied += 1;
                debug!(commit, %delta, "commit accounted");
                delta
            }
            Err(e) => {
                warn!(commit, error = %e, "skipping commit with unparseable diff");
                self.skipped.push(SkippedCommit {
                    commit: commit.to_string(),
                    reason: e.to_string(),
                });
                ChurnResult::default()
            }
        }
    }

    /// Totals over every accounted commit.
    pub fn result(&self) -> ChurnResult {
        self.ledger.totals()
    }

    /// Number of commits accounted.
    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Commits left out because their diff could not be parsed.
    pub fn skipped(&self) -> &[SkippedCommit] {
        &self.skipped
    }

    /// The ledger built by this run.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Finish the run, keeping the ledger for per-file detail.
    pub fn into_ledger(self) -> Ledger {
        self.ledger
    }
}

/// Replay `(commit id, diff text)` pairs, oldest first, through one ledger.
///
/// Commits whose diff cannot be parsed are skipped; see [`ChurnRun::record`].
///
/// # Examples
///
/// ```
/// use truechurn_ledger::compute_churn;
///
/// let result = compute_churn([
///     ("a", "+++ f.rs\n@@ -10 +10,2 @@\n"),
///     ("b", "+++ f.rs\n@@ -10,2 +10,5 @@\n"),
/// ]);
/// assert_eq!(result.contribution, 1);
/// assert_eq!(result.churn, 3);
/// ```
pub fn compute_churn<I, C, D>(commits: I) -> ChurnResult
where
    I: IntoIterator<Item = (C, D)>,
    C: AsRef<str>,
    D: AsRef<str>,
{
    let mut run = ChurnRun::new();
    for (commit, diff) in commits {
        run.record(commit.as_ref(), diff.as_ref());
    }
    run.result()
}

/// One raw author string in one repository, credited to a canonical author.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    /// Name the results are reported under.
    pub canonical: String,
    /// Author string as it appears in the repository history.
    pub alias: String,
    /// Repository label.
    pub repository: String,
}

impl Unit {
    /// Build a unit.
    pub fn new(
        canonical: impl Into<String>,
        alias: impl Into<String>,
        repository: impl Into<String>,
    ) -> Self {
        Self {
            canonical: canonical.into(),
            alias: alias.into(),
            repository: repository.into(),
        }
    }

    /// Attach the outcome of processing this unit.
    pub fn finish(self, outcome: Result<ChurnResult, ChurnError>) -> UnitOutcome {
        UnitOutcome { unit: self, outcome }
    }
}

/// Expand an alias map over a list of repositories.
///
/// Produces one unit per distinct `(canonical, alias, repository)` triple, so
/// an alias listed twice under the same name is only counted once.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use truechurn_ledger::plan_units;
///
/// let mut aliases = BTreeMap::new();
/// aliases.insert("Jane".to_string(), vec!["jane".to_string(), "jdoe".to_string()]);
/// let units = plan_units(&aliases, &["repo-a".to_string(), "repo-b".to_string()]);
/// assert_eq!(units.len(), 4);
/// ```
pub fn plan_units(aliases: &BTreeMap<String, Vec<String>>, repositories: &[String]) -> Vec<Unit> {
    let mut units = BTreeSet::new();
    for repository in repositories {
        for (canonical, raws) in aliases {
            for alias in raws {
                units.insert(Unit::new(canonical, alias, repository));
            }
        }
    }
    units.into_iter().collect()
}

/// A finished unit: its result or the error that stopped it.
#[derive(Debug)]
pub struct UnitOutcome {
    /// The unit that was processed.
    pub unit: Unit,
    /// Its totals, or why they could not be computed.
    pub outcome: Result<ChurnResult, ChurnError>,
}

/// A unit that failed and was left out of the aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitFailure {
    /// Canonical author.
    pub canonical: String,
    /// Raw author string that failed.
    pub alias: String,
    /// Repository it failed in.
    pub repository: String,
    /// Error message.
    pub error: String,
}

/// Canonical author → summed totals, plus the units that failed.
///
/// Authors whose totals are exactly zero are never present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    /// Totals per canonical author, sorted by name.
    pub authors: BTreeMap<String, ChurnResult>,
    /// Units that could not be processed.
    pub failures: Vec<UnitFailure>,
}

impl AggregateResult {
    /// Fold another aggregate into this one.
    pub fn merge(mut self, other: AggregateResult) -> Self {
        for (author, result) in other.authors {
            *self.authors.entry(author).or_default() += result;
        }
        self.failures.extend(other.failures);
        self.suppress_zeros();
        self
    }

    /// Sum of every author's totals.
    pub fn total(&self) -> ChurnResult {
        self.authors.values().copied().sum()
    }

    /// `true` when no author showed any activity.
    pub fn is_empty(&self) -> bool {
        self.authors.is_empty()
    }

    fn suppress_zeros(&mut self) {
        self.authors.retain(|_, result| !result.is_zero());
    }
}

/// Merge finished units into per-author totals.
///
/// Successful units are summed fieldwise under their canonical name. Failed
/// units are logged and listed in [`AggregateResult::failures`] without
/// affecting any other unit. Authors whose sum is `(0, 0)` are omitted.
///
/// # Examples
///
/// ```
/// use truechurn_core::ChurnResult;
/// use truechurn_ledger::{aggregate, Unit};
///
/// let result = aggregate([
///     Unit::new("Jane", "jane", "repo").finish(Ok(ChurnResult::new(5, 1))),
///     Unit::new("Jane", "jdoe", "repo").finish(Ok(ChurnResult::new(2, 2))),
///     Unit::new("Bob", "bob", "repo").finish(Ok(ChurnResult::default())),
/// ]);
/// assert_eq!(result.authors["Jane"], ChurnResult::new(7, 3));
/// assert!(!result.authors.contains_key("Bob"));
/// ```
pub fn aggregate<I>(outcomes: I) -> AggregateResult
where
    I: IntoIterator<Item = UnitOutcome>,
{
    let mut result = AggregateResult::default();
    for UnitOutcome { unit, outcome } in outcomes {
        match outcome {
            Ok(totals) => {
                debug!(
                    author = %unit.canonical,
                    alias = %unit.alias,
                    repository = %unit.repository,
                    %totals,
                    "unit finished"
                );
                *result.authors.entry(unit.canonical).or_default() += totals;
            }
            Err(e) => {
                warn!(
                    alias = %unit.alias,
                    repository = %unit.repository,
                    error = %e,
                    "failed to calculate churn"
                );
                result.failures.push(UnitFailure {
                    canonical: unit.canonical,
                    alias: unit.alias,
                    repository: unit.repository,
                    error: e.to_string(),
                });
            }
        }
    }
    result.suppress_zeros();
    result
}
