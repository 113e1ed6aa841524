//! Reasoning core: strategy policies, the adaptive controller, and the
//! chain-of-thought and tree-of-thought trackers.
//!
//! - [`StrategyCatalog`]: the seven named reasoning policies
//! - [`AdaptiveController`]: per-task strategy state machine
//! - [`ChainTracker`]: ordered step log with output parsing and validation
//! - [`TreeExplorer`]: bounded branch tree with scoring and path selection
//! - [`ComplexityClassifier`]: task difficulty estimation

mod adaptive;
mod chain;
mod complexity;
mod strategy;
mod tree;

pub use adaptive::*;
pub use chain::*;
pub use complexity::*;
pub use strategy::*;
pub use tree::*;

use serde::{Deserialize, Serialize};
use tracing::warn;

// ============================================================================
// Shared Utilities
// ============================================================================

/// Serialize a value to JSON for logging, with warning on failure.
pub(crate) fn serialize_for_log<T: Serialize>(value: &T, context: &str) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        warn!(
            error = %e,
            context = %context,
            "Failed to serialize reasoning record"
        );
        serde_json::json!({
            "serialization_error": e.to_string(),
            "context": context
        })
    })
}

/// Truncate to at most `max_len` characters, marking the cut with `...`.
pub(crate) fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Parse a confidence-like value such as `0.8`, `80%` or `0.8 (fairly sure)`.
///
/// Only the first whitespace-separated token is read. Results are clamped to
/// [0, 1]; non-numeric or non-finite input yields `None`.
pub(crate) fn parse_confidence(raw: &str) -> Option<f64> {
    let token = raw.split_whitespace().next()?;
    let token = token.trim_end_matches(|c: char| c == ',' || c == '.' || c == ';');

    let value = match token.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f64>().ok()? / 100.0,
        None => token.parse::<f64>().ok()?,
    };

    value.is_finite().then(|| value.clamp(0.0, 1.0))
}

/// Arithmetic mean, 0.0 for an empty sequence.
pub(crate) fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// How a task is driven by the runner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningMode {
    /// Free-form iterations under the adaptive controller.
    #[default]
    Adaptive,
    /// Explicit numbered steps recorded in a [`ChainTracker`].
    Chain,
    /// Candidate approaches explored in a [`TreeExplorer`].
    Tree,
}

impl ReasoningMode {
    /// Get the mode name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningMode::Adaptive => "adaptive",
            ReasoningMode::Chain => "chain",
            ReasoningMode::Tree => "tree",
        }
    }
}

impl std::fmt::Display for ReasoningMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReasoningMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "adaptive" => Ok(ReasoningMode::Adaptive),
            "chain" => Ok(ReasoningMode::Chain),
            "tree" => Ok(ReasoningMode::Tree),
            _ => Err(format!("Unknown reasoning mode: {}", s)),
        }
    }
}
