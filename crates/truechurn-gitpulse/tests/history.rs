use std::path::Path;

use git2::{Commit, Oid, Repository, Signature, Time};
use truechurn_core::{ChurnError, ChurnResult, Window};
use truechurn_gitpulse::{
    churn_for_author, commit_diff, list_authors, list_commits, AuthorPattern, MiningOptions,
};

// 2020-05-01, 2020-05-21, 2020-05-22, 2020-05-23 at noon UTC.
const BEFORE_WINDOW: i64 = 1_588_334_400;
const DAY_1: i64 = 1_590_062_400;
const DAY_2: i64 = 1_590_148_800;
const DAY_3: i64 = 1_590_235_200;

fn commit_file(
    repo: &Repository,
    path: &str,
    content: &[u8],
    author: &str,
    time: i64,
    extra_parent: Option<Oid>,
) -> Oid {
    let workdir = repo.workdir().unwrap();
    std::fs::write(workdir.join(path), content).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(path)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

    let sig = Signature::new(author, &format!("{author}@example.com"), &Time::new(time, 0)).unwrap();
    let mut parents: Vec<Commit> = Vec::new();
    if let Ok(head) = repo.head() {
        parents.push(head.peel_to_commit().unwrap());
    }
    if let Some(oid) = extra_parent {
        parents.push(repo.find_commit(oid).unwrap());
    }
    let parent_refs: Vec<&Commit> = parents.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, "change", &tree, &parent_refs)
        .unwrap()
}

/// alice writes a.txt before the window, appends to it, bob prepends two
/// lines, then alice rewrites line 4 (a line she touched two commits ago).
fn fixture() -> (tempfile::TempDir, Repository) {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    commit_file(&repo, "a.txt", b"a\nb\nc\n", "alice", BEFORE_WINDOW, None);
    commit_file(&repo, "a.txt", b"a\nb\nc\nd\ne\n", "alice", DAY_1, None);
    commit_file(&repo, "a.txt", b"x\ny\na\nb\nc\nd\ne\n", "bob", DAY_2, None);
    commit_file(
        &repo,
        "a.txt",
        b"x\ny\na\nB1\nB2\nB3\nc\nd\ne\n",
        "alice",
        DAY_3,
        None,
    );
    (dir, repo)
}

fn alice() -> AuthorPattern {
    AuthorPattern::new("alice")
}

fn may_2020() -> Window {
    Window::parse(Some("2020-05-20"), Some("2020-05-30")).unwrap()
}

#[test]
fn authors_are_distinct_and_sorted() {
    let (dir, _repo) = fixture();
    let authors = list_authors(dir.path(), &MiningOptions::default()).unwrap();
    assert_eq!(authors, vec!["alice", "bob"]);
}

#[test]
fn commits_are_filtered_by_author_and_window_oldest_first() {
    let (dir, _repo) = fixture();
    let commits = list_commits(
        dir.path(),
        &AuthorPattern::new("alice"),
        &may_2020(),
        &MiningOptions::default(),
    )
    .unwrap();
    let times: Vec<i64> = commits.iter().map(|c| c.timestamp).collect();
    assert_eq!(times, vec![DAY_1, DAY_3]);
    assert!(commits.iter().all(|c| c.author == "alice <alice@example.com>"));
}

#[test]
fn diff_text_has_zero_context_and_bare_paths() {
    let (_dir, repo) = fixture();
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    let diff = commit_diff(&repo, &head).unwrap();
    assert!(diff.contains("+++ a.txt\n"), "diff was:\n{diff}");
    assert!(diff.contains("@@ -4 +4,3 @@"), "diff was:\n{diff}");
    assert!(!diff.contains("\n c\n"), "context lines leaked:\n{diff}");
}

#[test]
fn churn_inside_the_window() {
    let (dir, _repo) = fixture();
    let run = churn_for_author(dir.path(), &alice(), &may_2020(), &MiningOptions::default()).unwrap();
    // DAY_1: -3,0 +4,2 -> addresses 3 (0) and 4 (2): contribution 2.
    // DAY_3: -4 +4,3 -> address 4 again (+2): churn 2.
    assert_eq!(run.result(), ChurnResult::new(2, 2));
    assert_eq!(run.applied(), 2);
    assert!(run.skipped().is_empty());

    let bob = churn_for_author(dir.path(), &AuthorPattern::new("bob"), &may_2020(), &MiningOptions::default()).unwrap();
    assert_eq!(bob.result(), ChurnResult::new(2, 0));
}

#[test]
fn unbounded_window_includes_earlier_work() {
    let (dir, _repo) = fixture();
    let run =
        churn_for_author(dir.path(), &alice(), &Window::default(), &MiningOptions::default()).unwrap();
    // Root commit adds three lines at address 1 on top of the window's work.
    assert_eq!(run.result(), ChurnResult::new(5, 2));
}

#[test]
fn merge_commits_are_excluded() {
    let (dir, repo) = fixture();
    let first = repo
        .revparse_single("HEAD~3")
        .unwrap()
        .peel_to_commit()
        .unwrap()
        .id();
    commit_file(
        &repo,
        "a.txt",
        b"merged\n",
        "alice",
        DAY_3 + 60,
        Some(first),
    );

    let commits = list_commits(
        dir.path(),
        &AuthorPattern::new("alice"),
        &may_2020(),
        &MiningOptions::default(),
    )
    .unwrap();
    assert_eq!(commits.len(), 2);
}

#[test]
fn unknown_author_has_no_churn() {
    let (dir, _repo) = fixture();
    let run =
        churn_for_author(dir.path(), &AuthorPattern::new("carol"), &may_2020(), &MiningOptions::default()).unwrap();
    assert!(run.result().is_zero());
    assert_eq!(run.applied(), 0);
}

#[test]
fn empty_repository_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    Repository::init(dir.path()).unwrap();
    assert!(list_authors(dir.path(), &MiningOptions::default()).unwrap().is_empty());
    let run = churn_for_author(dir.path(), &alice(), &Window::default(), &MiningOptions::default())
        .unwrap();
    assert!(run.result().is_zero());
}

#[test]
fn non_utf8_diff_is_a_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    commit_file(&repo, "latin1.txt", b"caf\xe9 r\xe9sum\xe9\n", "alice", DAY_1, None);

    let err = churn_for_author(dir.path(), &alice(), &may_2020(), &MiningOptions::default())
        .unwrap_err();
    assert!(matches!(err, ChurnError::Decode { .. }), "got {err}");
}

#[test]
fn binary_files_produce_no_hunks() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    commit_file(&repo, "blob.bin", b"\x00\x01\x02\x00", "alice", DAY_1, None);

    let run = churn_for_author(dir.path(), &alice(), &may_2020(), &MiningOptions::default()).unwrap();
    assert!(run.result().is_zero());
    assert!(run.ledger().files().is_empty());
}

#[test]
fn walking_a_missing_branch_fails() {
    let (dir, _repo) = fixture();
    let options = MiningOptions {
        branch: Some("does-not-exist".into()),
    };
    let err = list_authors(dir.path(), &options).unwrap_err();
    assert!(err.to_string().contains("does-not-exist"));
}

#[test]
fn punctuated_author_name_matches_itself() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    commit_file(&repo, "a.txt", b"a\nb\n", "Jane Doe (Acme)", DAY_1, None);
    commit_file(&repo, "b.txt", b"z\n", "carol", DAY_2, None);

    let authors = list_authors(dir.path(), &MiningOptions::default()).unwrap();
    assert_eq!(authors, vec!["Jane Doe (Acme)", "carol"]);

    let jane = AuthorPattern::new("Jane Doe (Acme)");
    let run = churn_for_author(dir.path(), &jane, &may_2020(), &MiningOptions::default()).unwrap();
    assert_eq!(run.result(), ChurnResult::new(2, 0));
}
