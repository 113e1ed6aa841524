//! Task complexity estimation.
//!
//! Classification is approximate by nature; only the
//! [`ComplexityClassifier`] interface and the level-to-strategy mapping are
//! fixed. [`KeywordClassifier`] is the default implementation.

use serde::{Deserialize, Serialize};

use super::StrategyName;

/// Coarse task difficulty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    /// Lookup-style tasks.
    Simple,
    /// Neither clearly simple nor complex.
    Moderate,
    /// Analytical or research tasks.
    Complex,
    /// No estimate available.
    #[default]
    Unknown,
}

impl ComplexityLevel {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplexityLevel::Simple => "simple",
            ComplexityLevel::Moderate => "moderate",
            ComplexityLevel::Complex => "complex",
            ComplexityLevel::Unknown => "unknown",
        }
    }

    /// Strategy a session should start with at this level.
    pub fn initial_strategy(&self) -> StrategyName {
        match self {
            ComplexityLevel::Simple => StrategyName::Fast,
            ComplexityLevel::Moderate => StrategyName::Balanced,
            ComplexityLevel::Complex => StrategyName::Deep,
            ComplexityLevel::Unknown => StrategyName::Balanced,
        }
    }
}

impl std::fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Estimates how hard a task is from its description.
pub trait ComplexityClassifier: Send + Sync {
    /// Classify a task description.
    fn classify(&self, task: &str) -> ComplexityLevel;
}

const COMPLEX_KEYWORDS: &[&str] = &[
    "analyze",
    "evaluate",
    "compare",
    "assess",
    "research",
    "comprehensive",
    "detailed",
    "thorough",
    "investigate",
];

const SIMPLE_KEYWORDS: &[&str] = &["get", "find", "show", "list", "what is", "tell me"];

/// Keyword-frequency classifier.
///
/// Counts occurrences of complexity and simplicity signals in the lowercased
/// task. More complex hits than simple hits gives `Complex`, the reverse
/// gives `Simple`, and a tie gives `Moderate`.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    complex_keywords: Vec<String>,
    simple_keywords: Vec<String>,
}

impl KeywordClassifier {
    /// Classifier with custom keyword sets. Keywords are matched lowercased.
    pub fn new(
        complex_keywords: impl IntoIterator<Item = impl Into<String>>,
        simple_keywords: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let normalize = |k: String| k.to_lowercase();
        Self {
            complex_keywords: complex_keywords
                .into_iter()
                .map(|k| normalize(k.into()))
                .filter(|k| !k.is_empty())
                .collect(),
            simple_keywords: simple_keywords
                .into_iter()
                .map(|k| normalize(k.into()))
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    fn count(text: &str, keywords: &[String]) -> usize {
        keywords.iter().map(|k| text.matches(k.as_str()).count()).sum()
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(COMPLEX_KEYWORDS.iter().copied(), SIMPLE_KEYWORDS.iter().copied())
    }
}

impl ComplexityClassifier for KeywordClassifier {
    fn classify(&self, task: &str) -> ComplexityLevel {
        let text = task.to_lowercase();
        let complex = Self::count(&text, &self.complex_keywords);
        let simple = Self::count(&text, &self.simple_keywords);

        match complex.cmp(&simple) {
            std::cmp::Ordering::Greater => ComplexityLevel::Complex,
            std::cmp::Ordering::Less => ComplexityLevel::Simple,
            std::cmp::Ordering::Equal => ComplexityLevel::Moderate,
        }
    }
}
