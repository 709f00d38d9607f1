use std::collections::BTreeMap;

use truechurn_core::ChurnResult;
use truechurn_ledger::{aggregate, compute_churn, plan_units, ChurnRun, Ledger};

/// Three commits by one author on two files, in the shape `git show
/// --unified=0 --no-prefix` produces.
const HISTORY: [(&str, &str); 3] = [
    (
        "c1",
        "diff --git src/app.rs src/app.rs\n\
         new file mode 100644\n\
         --- /dev/null\n\
         +++ src/app.rs\n\
         @@ -0,0 +1,20 @@\n\
         +fn main() {}\n",
    ),
    (
        "c2",
        "diff --git src/app.rs src/app.rs\n\
         --- src/app.rs\n\
         +++ src/app.rs\n\
         @@ -1,4 +1,6 @@\n\
         -fn main() {}\n\
         +fn main() { run() }\n\
         @@ -30,0 +33,2 @@\n\
         +fn run() {}\n\
         diff --git src/lib.rs src/lib.rs\n\
         --- src/lib.rs\n\
         +++ src/lib.rs\n\
         @@ -5 +5 @@\n\
         -pub mod a;\n\
         +pub mod b;\n",
    ),
    (
        "c3",
        "diff --git src/lib.rs src/lib.rs\n\
         --- src/lib.rs\n\
         +++ src/lib.rs\n\
         @@ -5 +5,3 @@\n\
         -pub mod b;\n\
         +pub mod c;\n\
         +pub mod d;\n\
         +pub mod e;\n",
    ),
];

#[test]
fn full_history_splits_contribution_and_churn() {
    // c1: -0,0 +1,20 -> address 0 (0) and address 1 (20): contribution 20.
    // c2: -1,4 +1,6 -> address 1 again (+2): churn 2.
    //     -30,0 +33,2 -> address 30 (0) and 33 (2): contribution 2.
    //     lib.rs -5 +5 -> address 5 (0): contribution 0.
    // c3: lib.rs -5 +5,3 -> address 5 again (+2): churn 2.
    let result = compute_churn(HISTORY);
    assert_eq!(result, ChurnResult::new(22, 4));
}

#[test]
fn ledger_keeps_per_file_detail() {
    let mut run = ChurnRun::new();
    for (commit, diff) in HISTORY {
        run.record(commit, diff);
    }
    let files = run.into_ledger().into_files();
    assert_eq!(files["src/app.rs"][&1], 22);
    assert_eq!(files["src/app.rs"][&33], 2);
    assert_eq!(files["src/lib.rs"][&5], 2);
    assert!(!files.contains_key("/dev/null"));
}

#[test]
fn results_are_never_negative_even_for_pure_deletions() {
    let result = compute_churn([
        ("d1", "+++ f.rs\n@@ -1,9 +1 @@\n"),
        ("d2", "+++ f.rs\n@@ -1,4 +1 @@\n"),
    ]);
    assert_eq!(result, ChurnResult::new(8, 3));
}

#[test]
fn aliases_and_repositories_roll_up_to_canonical_names() {
    let mut aliases = BTreeMap::new();
    aliases.insert(
        "Jane Doe".to_string(),
        vec!["jane".to_string(), "Jane D".to_string()],
    );
    aliases.insert("Bob".to_string(), vec!["bob".to_string()]);
    let repositories = vec!["api".to_string(), "web".to_string()];

    let units = plan_units(&aliases, &repositories);
    assert_eq!(units.len(), 6);

    let outcomes = units.into_iter().map(|unit| {
        let totals = match (unit.alias.as_str(), unit.repository.as_str()) {
            ("jane", "api") => compute_churn(HISTORY),
            ("Jane D", "web") => compute_churn([HISTORY[0]]),
            _ => ChurnResult::default(),
        };
        unit.finish(Ok(totals))
    });
    let result = aggregate(outcomes);

    assert_eq!(result.authors.len(), 1);
    assert_eq!(result.authors["Jane Doe"], ChurnResult::new(42, 4));
    assert!(result.failures.is_empty());
}

#[test]
fn apply_reports_each_hunk() {
    let mut ledger = Ledger::new();
    let first = ledger.apply("f.rs", &"-10,1 +10,3".parse().unwrap());
    let second = ledger.apply("f.rs", &"-10 +10,5".parse().unwrap());
    assert_eq!(first, ChurnResult::new(2, 0));
    assert_eq!(second, ChurnResult::new(0, 4));
    assert_eq!(ledger.totals(), ChurnResult::new(2, 4));
}

#[test]
fn aggregate_serializes_for_reports() {
    let result = aggregate([truechurn_ledger::Unit::new("Jane", "jane", "api")
        .finish(Ok(ChurnResult::new(7, 2)))]);
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["authors"]["Jane"]["contribution"], 7);
    assert_eq!(json["authors"]["Jane"]["churn"], 2);
    assert_eq!(json["failures"].as_array().unwrap().len(), 0);
}
