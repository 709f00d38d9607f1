//! Git access for churn accounting.
//!
//! Lists authors and their non-merge commits inside a window, renders each
//! commit as zero-context unified diff text for the ledger, and keeps the
//! analyzed repositories cloned and up to date.

pub mod mining;
pub mod sync;

pub use mining::{
    churn_for_author, commit_diff, list_authors, list_commits, AuthorPattern, CommitRef,
    MiningOptions,
};
pub use sync::{sync_repository, RepoSource};
