//! JSON dump of the canonical model.
//!
//! ```text
//! {
//!   "version": 1,
//!   "testcases": [
//!     {
//!       "title": "...",
//!       "product": "...",
//!       "suite_path": ["..."],
//!       "priority": "high" | "medium" | "low",
//!       "execution_type": "manual" | "automated",
//!       "precondition": "...",
//!       "steps": [{"number": 1, "action": "...", "expected": "..."}]
//!     }
//!   ]
//! }
//! ```

use serde::Serialize;

use super::EmitError;
use crate::extract::TestCase;

/// Bumped whenever a key is renamed or removed.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize)]
struct Document<'a> {
    version: u32,
    testcases: &'a [TestCase],
}

pub fn emit(cases: &[TestCase]) -> Result<String, EmitError> {
    let document = Document {
        version: SCHEMA_VERSION,
        testcases: cases,
    };
    Ok(serde_json::to_string_pretty(&document)?)
}
