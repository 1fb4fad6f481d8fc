//! Canonical test cases derived from an outline.
//!
//! Depth 1 topics are suites, depth 2 topics are test cases, and everything
//! below a test case describes its steps. Interpretation of markers and labels
//! happens here and only here; anything unrecognized falls back to the
//! configured defaults. Extraction never fails: problems that make a case
//! unusable are reported as [`Warning`]s next to the cases that were produced.

mod pairing;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{Topic, Workbook};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Recognizes `1`/`2`/`3`, `high`/`medium`/`low` and marker ids of the
    /// form `priority-N`, ignoring case.
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim().to_ascii_lowercase();
        let token = token.strip_prefix("priority-").unwrap_or(&token);
        match token {
            "1" | "high" => Some(Priority::High),
            "2" | "medium" => Some(Priority::Medium),
            "3" | "low" => Some(Priority::Low),
            _ => None,
        }
    }

    /// 1 is the most important.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        })
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionType {
    #[default]
    Manual,
    Automated,
}

impl ExecutionType {
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.eq_ignore_ascii_case("manual") {
            Some(ExecutionType::Manual)
        } else if token.eq_ignore_ascii_case("automated") {
            Some(ExecutionType::Automated)
        } else {
            None
        }
    }
}

impl fmt::Display for ExecutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecutionType::Manual => "manual",
            ExecutionType::Automated => "automated",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// 1-based position within the test case.
    pub number: usize,
    pub action: String,
    /// Empty when the step has no expected result.
    pub expected: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub title: String,
    /// Title of the central topic the case was authored under.
    pub product: String,
    pub suite_path: Vec<String>,
    pub priority: Priority,
    pub execution_type: ExecutionType,
    pub precondition: String,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A suite or test case topic had a blank title. Cases are skipped.
    EmptyTitle,
    /// A step had several candidate expected results; they were merged.
    AmbiguousPairing,
    /// An explicitly tagged expected result had no action to pair with.
    UnpairedExpectedResult,
}

/// A recoverable problem found while extracting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub sheet: String,
    /// Titles from the suite down to the offending topic.
    pub path: Vec<String>,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.sheet)?;
        if !self.path.is_empty() {
            write!(f, "{}: ", self.path.join(" > "))?;
        }
        f.write_str(&self.message)
    }
}

/// Result of extracting a workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub cases: Vec<TestCase>,
    pub warnings: Vec<Warning>,
    /// Test case topics dropped; each has a matching warning.
    pub skipped_cases: usize,
}

/// Values used when a test case carries no recognizable annotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Extractor {
    pub default_priority: Priority,
    pub default_execution_type: ExecutionType,
}

impl Extractor {
    pub fn new(default_priority: Priority, default_execution_type: ExecutionType) -> Self {
        Self {
            default_priority,
            default_execution_type,
        }
    }

    pub fn extract(&self, workbook: &Workbook) -> Extraction {
        let mut out = Extraction::default();

        for sheet in &workbook.sheets {
            let product = sheet.root.title.trim();

            for suite in &sheet.root.children {
                let suite_title = suite.title.trim();
                let suite_path: Vec<String> = if suite_title.is_empty() {
                    out.warnings.push(Warning {
                        kind: WarningKind::EmptyTitle,
                        sheet: sheet.title.clone(),
                        path: Vec::new(),
                        message: format!(
                            "suite #{} has no title; its cases are kept without a suite",
                            suite.ordinal + 1
                        ),
                    });
                    Vec::new()
                } else {
                    vec![suite_title.to_string()]
                };

                for topic in &suite.children {
                    let title = topic.title.trim();
                    if title.is_empty() {
                        let mut path = suite_path.clone();
                        path.push(format!("#{}", topic.ordinal + 1));
                        out.warnings.push(Warning {
                            kind: WarningKind::EmptyTitle,
                            sheet: sheet.title.clone(),
                            path,
                            message: "test case has a blank title; skipped".to_string(),
                        });
                        out.skipped_cases += 1;
                        continue;
                    }

                    let (steps, issues) = pairing::steps(topic);
                    for (kind, message) in issues {
                        let mut path = suite_path.clone();
                        path.push(title.to_string());
                        out.warnings.push(Warning {
                            kind,
                            sheet: sheet.title.clone(),
                            path,
                            message,
                        });
                    }

                    out.cases.push(TestCase {
                        title: title.to_string(),
                        product: product.to_string(),
                        suite_path: suite_path.clone(),
                        priority: self.priority(topic),
                        execution_type: self.execution_type(topic),
                        precondition: topic.note.clone().unwrap_or_default(),
                        steps,
                    });
                }
            }
        }

        for warning in &out.warnings {
            tracing::warn!(kind = ?warning.kind, "{warning}");
        }
        tracing::debug!(
            cases = out.cases.len(),
            warnings = out.warnings.len(),
            skipped = out.skipped_cases,
            "extracted test cases"
        );
        out
    }

    /// Markers first, then labels; the first recognized token wins.
    fn priority(&self, topic: &Topic) -> Priority {
        topic
            .markers
            .iter()
            .chain(&topic.labels)
            .find_map(|token| Priority::from_token(token))
            .unwrap_or(self.default_priority)
    }

    fn execution_type(&self, topic: &Topic) -> ExecutionType {
        topic
            .labels
            .iter()
            .find_map(|token| ExecutionType::from_token(token))
            .unwrap_or(self.default_execution_type)
    }
}

/// Extract with the built-in defaults (Medium, Manual).
pub fn extract(workbook: &Workbook) -> Extraction {
    Extractor::default().extract(workbook)
}
