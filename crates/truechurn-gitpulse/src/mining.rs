//! Commit enumeration and diff rendering via git2.
//!
//! Mirrors what `git log --fixed-strings --author=<a> --no-merges --reverse` and
//! `git show --format= --unified=0 --no-prefix <commit>` produce, without
//! shelling out.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use git2::{Commit, DiffFindOptions, DiffFormat, DiffOptions, Oid, Repository, Revwalk, Sort};
use regex::Regex;
use tracing::debug;
use truechurn_core::{ChurnError, Window};
use truechurn_ledger::ChurnRun;

/// A commit selected for accounting.
///
/// # Examples
///
/// ```
/// use truechurn_gitpulse::CommitRef;
///
/// let commit = CommitRef {
///     id: "9fceb02d0ae598e95dc970b74767f19372d61af8".into(),
///     author: "alice <alice@example.com>".into(),
///     timestamp: 1_590_000_000,
/// };
/// assert_eq!(commit.short_id(), "9fceb02d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRef {
    /// Full commit hash.
    pub id: String,
    /// Author as `Name <email>`.
    pub author: String,
    /// Commit time as a unix timestamp.
    pub timestamp: i64,
}

impl CommitRef {
    /// First eight characters of the hash.
    pub fn short_id(&self) -> &str {
        &self.id[..self.id.len().min(8)]
    }
}

/// Options for history mining.
///
/// # Examples
///
/// ```
/// use truechurn_gitpulse::MiningOptions;
///
/// let opts = MiningOptions::default();
/// assert!(opts.branch.is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MiningOptions {
    /// Branch to walk (default: HEAD).
    pub branch: Option<String>,
}

/// Author filter over `Name <email>` identities.
///
/// [`AuthorPattern::new`] takes a raw author string as it appears in the
/// logs and matches it literally anywhere in the identity, so names with
/// punctuation such as `Jane Doe (Acme)` match themselves.
/// [`AuthorPattern::regex`] opts into regular expression matching.
///
/// # Examples
///
/// ```
/// use truechurn_gitpulse::AuthorPattern;
///
/// let pattern = AuthorPattern::new("alice");
/// assert!(pattern.matches("Alice Liddell <alice@example.com>"));
/// assert!(!pattern.matches("Bob <bob@example.com>"));
///
/// let literal = AuthorPattern::new("Jane Doe (Acme)");
/// assert!(literal.matches("Jane Doe (Acme) <jane@acme.com>"));
///
/// let either = AuthorPattern::regex("^(alice|bob) ").unwrap();
/// assert!(either.matches("bob <bob@example.com>"));
/// ```
#[derive(Debug, Clone)]
pub struct AuthorPattern {
    matcher: Matcher,
}

#[derive(Debug, Clone)]
enum Matcher {
    Regex(Regex),
    Literal(String),
}

impl AuthorPattern {
    /// Match `author` as a plain substring of `Name <email>`.
    pub fn new(author: &str) -> Self {
        Self {
            matcher: Matcher::Literal(author.to_string()),
        }
    }

    /// Compile `pattern` as a regular expression searched for anywhere in
    /// `Name <email>`.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Config`] if `pattern` is not a valid regular
    /// expression.
    pub fn regex(pattern: &str) -> Result<Self, ChurnError> {
        let regex = Regex::new(pattern)
            .map_err(|e| ChurnError::Config(format!("invalid author pattern {pattern:?}: {e}")))?;
        Ok(Self {
            matcher: Matcher::Regex(regex),
        })
    }

    /// Match commits whose author name is exactly `name`.
    ///
    /// Used when authors come from the history itself, where `bob` must not
    /// also pick up `bobby`.
    pub fn exact_name(name: &str) -> Self {
        let matcher = match Regex::new(&format!("^{} <", regex::escape(name))) {
            Ok(regex) => Matcher::Regex(regex),
            Err(_) => Matcher::Literal(format!("{name} <")),
        };
        Self { matcher }
    }

    /// Whether `Name <email>` matches.
    pub fn matches(&self, identity: &str) -> bool {
        match &self.matcher {
            Matcher::Regex(regex) => regex.is_match(identity),
            Matcher::Literal(text) => identity.contains(text.as_str()),
        }
    }
}

impl fmt::Display for AuthorPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.matcher {
            Matcher::Regex(regex) => write!(f, "{}", regex.as_str()),
            Matcher::Literal(text) => write!(f, "{text}"),
        }
    }
}

/// Distinct author names across the history reachable from the walk start,
/// sorted.
///
/// # Errors
///
/// Returns [`ChurnError::Git`] if the repository cannot be opened or walked.
pub fn list_authors(repo_path: &Path, options: &MiningOptions) -> Result<Vec<String>, ChurnError> {
    let repo = open(repo_path)?;
    if is_empty(&repo)? {
        return Ok(Vec::new());
    }

    let mut names = BTreeSet::new();
    for oid in start_walk(&repo, options, Sort::TIME)? {
        let oid = oid.map_err(|e| ChurnError::Git(format!("revwalk error: {e}")))?;
        let commit = find_commit(&repo, oid)?;
        let author = commit.author();
        if let Some(name) = author.name() {
            names.insert(name.to_string());
        }
    }
    Ok(names.into_iter().collect())
}

/// Non-merge commits by `author` inside `window`, oldest first.
///
/// # Errors
///
/// Returns [`ChurnError::Git`] if the repository cannot be opened or walked.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use truechurn_core::Window;
/// use truechurn_gitpulse::{list_commits, AuthorPattern, MiningOptions};
///
/// let window = Window::parse(Some("2020-05-20"), Some("2020-05-30")).unwrap();
/// let commits = list_commits(
///     Path::new("."),
///     &AuthorPattern::new("alice"),
///     &window,
///     &MiningOptions::default(),
/// )
/// .unwrap();
/// for c in &commits {
///     println!("{} {}", c.short_id(), c.author);
/// }
/// ```
pub fn list_commits(
    repo_path: &Path,
    author: &AuthorPattern,
    window: &Window,
    options: &MiningOptions,
) -> Result<Vec<CommitRef>, ChurnError> {
    let repo = open(repo_path)?;
    select_commits(&repo, author, window, options)
}

/// Render one commit as zero-context unified diff text against its first
/// parent, with bare paths and without binary files.
///
/// # Errors
///
/// Returns [`ChurnError::Git`] if the diff cannot be computed, or
/// [`ChurnError::Decode`] if the rendered diff is not valid UTF-8.
pub fn commit_diff(repo: &Repository, commit: &Commit) -> Result<String, ChurnError> {
    let commit_tree = commit
        .tree()
        .map_err(|e| ChurnError::Git(format!("failed to get commit tree: {e}")))?;

    let parent_tree = if commit.parent_count() > 0 {
        let parent = commit
            .parent(0)
            .map_err(|e| ChurnError::Git(format!("failed to get parent: {e}")))?;
        Some(
            parent
                .tree()
                .map_err(|e| ChurnError::Git(format!("failed to get parent tree: {e}")))?,
        )
    } else {
        None
    };

    let mut diff_opts = DiffOptions::new();
    diff_opts.context_lines(0).old_prefix("").new_prefix("");
    let mut diff = repo
        .diff_tree_to_tree(
            parent_tree.as_ref(),
            Some(&commit_tree),
            Some(&mut diff_opts),
        )
        .map_err(|e| ChurnError::Git(format!("failed to compute diff: {e}")))?;

    // Enable rename detection
    let mut find_opts = DiffFindOptions::new();
    find_opts.renames(true);
    diff.find_similar(Some(&mut find_opts))
        .map_err(|e| ChurnError::Git(format!("failed to find renames: {e}")))?;

    let mut text = Vec::new();
    diff.print(DiffFormat::Patch, |delta, _hunk, line| {
        if delta.flags().is_binary() || line.origin() == 'B' {
            return true;
        }
        if matches!(line.origin(), '+' | '-' | ' ') {
            text.push(line.origin() as u8);
        }
        text.extend_from_slice(line.content());
        true
    })
    .map_err(|e| ChurnError::Git(format!("failed to render diff: {e}")))?;

    String::from_utf8(text).map_err(|e| ChurnError::Decode {
        commit: commit.id().to_string(),
        reason: e.to_string(),
    })
}

/// Replay every commit by `author` inside `window` through a fresh ledger.
///
/// Commits with unparseable diffs are skipped inside the run. An empty
/// history yields an empty run.
///
/// # Errors
///
/// Returns [`ChurnError::Git`] on repository failures and
/// [`ChurnError::Decode`] if any commit's diff is not valid UTF-8; in both
/// cases nothing is reported for this author and repository.
pub fn churn_for_author(
    repo_path: &Path,
    author: &AuthorPattern,
    window: &Window,
    options: &MiningOptions,
) -> Result<ChurnRun, ChurnError> {
    let repo = open(repo_path)?;
    let commits = select_commits(&repo, author, window, options)?;
    debug!(
        author = %author,
        repository = %repo_path.display(),
        commits = commits.len(),
        "replaying commits"
    );

    let mut run = ChurnRun::new();
    for commit_ref in &commits {
        let oid = Oid::from_str(&commit_ref.id)
            .map_err(|e| ChurnError::Git(format!("invalid commit id {}: {e}", commit_ref.id)))?;
        let commit = find_commit(&repo, oid)?;
        let diff = commit_diff(&repo, &commit)?;
        run.record(&commit_ref.id, &diff);
    }
    Ok(run)
}

fn select_commits(
    repo: &Repository,
    author: &AuthorPattern,
    window: &Window,
    options: &MiningOptions,
) -> Result<Vec<CommitRef>, ChurnError> {
    if is_empty(repo)? {
        return Ok(Vec::new());
    }

    let mut commits = Vec::new();
    for oid in start_walk(repo, options, Sort::TIME | Sort::REVERSE)? {
        let oid = oid.map_err(|e| ChurnError::Git(format!("revwalk error: {e}")))?;
        let commit = find_commit(repo, oid)?;

        if commit.parent_count() > 1 {
            continue;
        }

        let timestamp = commit.time().seconds();
        if !window.contains(timestamp) {
            continue;
        }

        let signature = commit.author();
        let identity = format!(
            "{} <{}>",
            signature.name().unwrap_or(""),
            signature.email().unwrap_or("")
        );
        if !author.matches(&identity) {
            continue;
        }

        commits.push(CommitRef {
            id: oid.to_string(),
            author: identity,
            timestamp,
        });
    }
    Ok(commits)
}

fn open(repo_path: &Path) -> Result<Repository, ChurnError> {
    Repository::discover(repo_path).map_err(|e| {
        ChurnError::Git(format!(
            "failed to open repository at {}: {e}",
            repo_path.display()
        ))
    })
}

fn is_empty(repo: &Repository) -> Result<bool, ChurnError> {
    repo.is_empty()
        .map_err(|e| ChurnError::Git(format!("failed to inspect repository: {e}")))
}

fn find_commit(repo: &Repository, oid: Oid) -> Result<Commit<'_>, ChurnError> {
    repo.find_commit(oid)
        .map_err(|e| ChurnError::Git(format!("failed to find commit {oid}: {e}")))
}

fn start_walk<'r>(
    repo: &'r Repository,
    options: &MiningOptions,
    sorting: Sort,
) -> Result<Revwalk<'r>, ChurnError> {
    let mut revwalk = repo
        .revwalk()
        .map_err(|e| ChurnError::Git(format!("failed to create revwalk: {e}")))?;
    revwalk
        .set_sorting(sorting)
        .map_err(|e| ChurnError::Git(format!("failed to sort revwalk: {e}")))?;

    // Start from HEAD or specified branch
    if let Some(ref branch) = options.branch {
        let reference = repo
            .resolve_reference_from_short_name(branch)
            .map_err(|e| ChurnError::Git(format!("failed to resolve branch '{branch}': {e}")))?;
        let oid = reference
            .target()
            .ok_or_else(|| ChurnError::Git("branch has no target".into()))?;
        revwalk
            .push(oid)
            .map_err(|e| ChurnError::Git(format!("failed to push oid: {e}")))?;
    } else {
        revwalk
            .push_head()
            .map_err(|e| ChurnError::Git(format!("failed to push HEAD: {e}")))?;
    }
    Ok(revwalk)
}
