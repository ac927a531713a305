//! Property test: rendering an issue and parsing the untouched buffer
//! back must always produce an empty diff.

use ghist::edit::{EditMode, parse_edit, render_issue};
use ghist::model::IssueState;
use proptest::prelude::*;

fn header_text() -> impl Strategy<Value = String> {
    // Header values round-trip through a trim, so no edge whitespace.
    "[a-zA-Z0-9][a-zA-Z0-9 ._-]{0,28}[a-zA-Z0-9]".prop_map(|s| s)
}

fn label() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,11}".prop_map(|s| s)
}

fn issue_state() -> impl Strategy<Value = IssueState> {
    (
        1i64..100_000,
        header_text(),
        prop_oneof![Just("open".to_string()), Just("closed".to_string())],
        prop::option::of(header_text()),
        prop::collection::btree_set(label(), 0..5),
        prop::option::of(header_text()),
        ".{0,200}",
    )
        .prop_map(
            |(number, title, state, assignee, labels, milestone, body)| IssueState {
                number,
                title,
                state,
                assignee: assignee.unwrap_or_default(),
                labels: labels.into_iter().collect(),
                milestone: milestone.unwrap_or_default(),
                url: format!("https://github.com/o/r/issues/{number}"),
                reporter: "someone".to_string(),
                body,
                ..IssueState::default()
            },
        )
}

proptest! {
    #[test]
    fn unedited_buffer_is_empty_diff(issue in issue_state()) {
        let text = render_issue(&issue, &[], &[]);
        let intent = parse_edit(&issue, &text, EditMode::Single).unwrap();
        prop_assert!(intent.is_empty(), "diff from untouched buffer: {intent:?}");
    }

    #[test]
    fn bulk_mode_sees_no_diff_either(issue in issue_state()) {
        let text = render_issue(&issue, &[], &[]);
        let intent = parse_edit(&issue, &text, EditMode::Bulk).unwrap();
        prop_assert!(intent.is_empty());
    }
}
