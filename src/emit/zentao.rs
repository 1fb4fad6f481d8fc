//! Zentao CSV import.
//!
//! One row per test case. Steps go into a single cell as numbered
//! `N. action: expected` lines; the `: expected` part is left out for steps
//! without an expected result. Priority uses Zentao's 1 (highest) to 3 scale.

use super::EmitError;
use crate::extract::{Step, TestCase};

pub const HEADER: [&str; 6] = ["Module", "Title", "Precondition", "Steps", "Priority", "Type"];

/// Separator between suite levels in the module column.
pub const MODULE_SEPARATOR: &str = "/";

pub fn emit(cases: &[TestCase]) -> Result<String, EmitError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER)?;

    for case in cases {
        writer.write_record([
            case.suite_path.join(MODULE_SEPARATOR),
            case.title.clone(),
            case.precondition.clone(),
            steps_cell(&case.steps),
            case.priority.rank().to_string(),
            case.execution_type.to_string(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| EmitError::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn steps_cell(steps: &[Step]) -> String {
    steps
        .iter()
        .map(|step| {
            if step.expected.is_empty() {
                format!("{}. {}", step.number, step.action)
            } else {
                format!("{}. {}: {}", step.number, step.action, step.expected)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
