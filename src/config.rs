use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_CAPACITY;
use crate::extract::{ExecutionType, Priority};

/// Options accepted by [`Converter`](crate::Converter).
///
/// The library never reads these from the environment or from files; callers
/// build the value (or deserialize it from their own configuration source)
/// and pass it in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Memoize conversions by content fingerprint.
    pub enable_cache: bool,
    /// Maximum number of cached conversions.
    pub cache_size: usize,
    pub default_priority: Priority,
    pub default_execution_type: ExecutionType,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            enable_cache: true,
            cache_size: DEFAULT_CAPACITY,
            default_priority: Priority::Medium,
            default_execution_type: ExecutionType::Manual,
        }
    }
}
