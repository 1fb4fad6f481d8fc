//! Output formats built from the canonical test-case list.
//!
//! Every emitter is a pure function of `&[TestCase]`, so several formats can
//! be produced in parallel from one shared extraction.

pub mod json;
pub mod testlink;
pub mod zentao;

use std::fmt;
use thiserror::Error;

use crate::extract::TestCase;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Target formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum OutputFormat {
    /// Zentao CSV import
    Zentao,
    /// TestLink XML import
    Testlink,
    /// JSON dump of the canonical model
    Json,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [
        OutputFormat::Zentao,
        OutputFormat::Testlink,
        OutputFormat::Json,
    ];

    /// File extension for written output, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Zentao => "csv",
            OutputFormat::Testlink => "xml",
            OutputFormat::Json => "json",
        }
    }

    pub fn emit(self, cases: &[TestCase]) -> Result<String, EmitError> {
        match self {
            OutputFormat::Zentao => zentao::emit(cases),
            OutputFormat::Testlink => testlink::emit(cases),
            OutputFormat::Json => json::emit(cases),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Zentao => "zentao",
            OutputFormat::Testlink => "testlink",
            OutputFormat::Json => "json",
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::extract::{ExecutionType, Priority, Step, TestCase};

    pub fn case(title: &str, suite: &str, steps: &[(&str, &str)]) -> TestCase {
        TestCase {
            title: title.to_string(),
            product: "App".to_string(),
            suite_path: vec![suite.to_string()],
            priority: Priority::High,
            execution_type: ExecutionType::Automated,
            precondition: "user exists".to_string(),
            steps: steps
                .iter()
                .enumerate()
                .map(|(i, (action, expected))| Step {
                    number: i + 1,
                    action: action.to_string(),
                    expected: expected.to_string(),
                })
                .collect(),
        }
    }
}
