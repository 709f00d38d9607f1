use truechurn_difflens::{scan_commit_diff, HunkHeader, LineDelta};

#[test]
fn git_show_output_is_reduced_to_hunk_events() {
    let diff = include_str!("fixtures/show_unified0.diff");
    let events = scan_commit_diff(diff).unwrap();

    let paths: Vec<&str> = events.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "src/parser.rs",
            "src/parser.rs",
            "src/parser.rs",
            "README.md",
            "/dev/null",
        ]
    );

    assert_eq!(events[0].header, HunkHeader::parse("-12 +12").unwrap());
    assert_eq!(
        events[1].header.line_delta(),
        LineDelta::Split {
            removed: (40, 0),
            added: (41, 3)
        }
    );
    assert_eq!(
        events[3].header.line_delta(),
        LineDelta::InPlace {
            address: 1,
            magnitude: 2
        }
    );
}

#[test]
fn events_serialize_with_camel_case_keys() {
    let events = scan_commit_diff("+++ a.rs\n@@ -2,3 +2 @@\n").unwrap();
    let json = serde_json::to_value(&events[0]).unwrap();
    assert_eq!(json["path"], "a.rs");
    assert_eq!(json["header"]["removedCount"], 3);
    assert_eq!(json["header"]["addedStart"], 2);
}
