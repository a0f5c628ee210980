use serde_derive::{Deserialize, Serialize};
use crate::core::Error;

/// Limits that keep a solve bounded. Fingerprint-based stall detection
/// normally ends propagation long before `max_iterations` is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Propagation steps allowed per branch before it is treated as stalled.
    pub max_iterations: usize,
    /// Deepest nesting of speculative guesses. None means one level per cell.
    pub max_depth: Option<usize>,
    /// Total branches (root included) the search may visit.
    pub max_branches: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            max_iterations: 10_000,
            max_depth: None,
            max_branches: 1_000_000,
        }
    }
}

impl SolverConfig {
    pub fn from_json(s: &str) -> Result<Self, Error> {
        serde_json::from_str(s)
            .map_err(|e| Error::malformed(format!("invalid solver config: {}", e)))
    }

    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| Error::internal(e.to_string()))
    }

    pub fn depth_limit(&self, cells: usize) -> usize {
        self.max_depth.unwrap_or(cells)
    }
}
