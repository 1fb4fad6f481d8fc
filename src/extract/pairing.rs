//! Step / expected-result pairing.
//!
//! Two rules, applied per test case:
//!
//! 1. **Positional.** If any direct child of the case is tagged as an expected
//!    result (label or marker, see [`EXPECTED_ROLE`]), children split into
//!    actions and expected results and the n-th action pairs with the n-th
//!    expected result. Nesting below either side is flattened into its text.
//! 2. **Nesting.** Otherwise every child is an action. A leaf action has no
//!    expected result; an action with a single child takes that child's
//!    flattened subtree as its expected result. Several children are merged
//!    and reported as ambiguous.

use super::{Step, WarningKind};
use crate::model::Topic;

/// Tokens marking a topic as an expected result, compared ignoring case.
pub(super) const EXPECTED_ROLE: &[&str] = &[
    "expected",
    "expected result",
    "expected-result",
    "expected_result",
    "expectedresult",
];

pub(super) type Issue = (WarningKind, String);

pub(super) fn steps(case: &Topic) -> (Vec<Step>, Vec<Issue>) {
    if case.children.iter().any(is_expected) {
        positional(case)
    } else {
        nested(case)
    }
}

fn is_expected(topic: &Topic) -> bool {
    topic
        .labels
        .iter()
        .chain(&topic.markers)
        .any(|tag| EXPECTED_ROLE.iter().any(|role| tag.trim().eq_ignore_ascii_case(role)))
}

fn positional(case: &Topic) -> (Vec<Step>, Vec<Issue>) {
    let (expected, actions): (Vec<&Topic>, Vec<&Topic>) =
        case.children.iter().partition(|t| is_expected(t));

    let mut issues = Vec::new();
    let count = actions.len().max(expected.len());
    let steps = (0..count)
        .map(|i| {
            let action = actions.get(i).map(|t| flatten(t)).unwrap_or_default();
            let result = expected.get(i).map(|t| flatten(t)).unwrap_or_default();
            if i >= actions.len() {
                issues.push((
                    WarningKind::UnpairedExpectedResult,
                    format!("expected result {result:?} has no matching action"),
                ));
            }
            Step {
                number: i + 1,
                action,
                expected: result,
            }
        })
        .collect();

    (steps, issues)
}

fn nested(case: &Topic) -> (Vec<Step>, Vec<Issue>) {
    let mut issues = Vec::new();
    let steps = case
        .children
        .iter()
        .enumerate()
        .map(|(i, action)| {
            let expected = match action.children.as_slice() {
                [] => String::new(),
                [only] => flatten(only),
                several => {
                    issues.push((
                        WarningKind::AmbiguousPairing,
                        format!(
                            "step {} has {} candidate expected results; they were merged",
                            i + 1,
                            several.len()
                        ),
                    ));
                    several.iter().map(flatten).collect::<Vec<_>>().join("\n")
                }
            };
            Step {
                number: i + 1,
                action: action.title.trim().to_string(),
                expected,
            }
        })
        .collect();

    (steps, issues)
}

/// Title of `topic` and all its descendants, one per line, in document order.
fn flatten(topic: &Topic) -> String {
    topic
        .descendants()
        .map(|t| t.title.trim())
        .filter(|title| !title.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
