//! Strategy catalog - the fixed policy table behind every reasoning strategy.
//!
//! A [`Strategy`] bundles the loop parameters a caller applies to its next
//! LLM invocation: iteration ceiling, sampling temperature, and wall-clock
//! timeout. The [`StrategyCatalog`] holds exactly one policy per
//! [`StrategyName`] and is immutable once built.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::error::{CatalogError, CatalogResult};

/// Named reasoning strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyName {
    /// Few iterations, low temperature. For lookups and short answers.
    Fast,
    /// Default middle ground.
    Balanced,
    /// Long iteration budget for analytical work.
    Deep,
    /// High temperature for ideation.
    Creative,
    /// Explicit step-by-step chain-of-thought.
    CotExplicit,
    /// Branching exploration with scored selection.
    TreeOfThought,
    /// Widest budget, used when the strategy itself is chosen at runtime.
    Adaptive,
}

impl StrategyName {
    /// Every strategy, in catalog order.
    pub const ALL: [StrategyName; 7] = [
        StrategyName::Fast,
        StrategyName::Balanced,
        StrategyName::Deep,
        StrategyName::Creative,
        StrategyName::CotExplicit,
        StrategyName::TreeOfThought,
        StrategyName::Adaptive,
    ];

    /// Get the strategy name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyName::Fast => "fast",
            StrategyName::Balanced => "balanced",
            StrategyName::Deep => "deep",
            StrategyName::Creative => "creative",
            StrategyName::CotExplicit => "cot_explicit",
            StrategyName::TreeOfThought => "tree_of_thought",
            StrategyName::Adaptive => "adaptive",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for StrategyName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StrategyName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "fast" => Ok(StrategyName::Fast),
            "balanced" => Ok(StrategyName::Balanced),
            "deep" => Ok(StrategyName::Deep),
            "creative" => Ok(StrategyName::Creative),
            "cot_explicit" => Ok(StrategyName::CotExplicit),
            "tree_of_thought" => Ok(StrategyName::TreeOfThought),
            "adaptive" => Ok(StrategyName::Adaptive),
            _ => Err(format!("Unknown strategy: {}", s)),
        }
    }
}

/// Loop parameters for one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    /// Which strategy this policy belongs to.
    pub name: StrategyName,
    /// Iteration ceiling for the reasoning loop.
    pub max_iterations: u32,
    /// Sampling temperature (0.0-1.0).
    pub temperature: f64,
    /// Wall-clock budget in seconds.
    pub timeout_seconds: f64,
    /// Human-readable description.
    pub description: String,
}

impl Strategy {
    /// Create a new strategy policy
    pub fn new(
        name: StrategyName,
        max_iterations: u32,
        temperature: f64,
        timeout_seconds: f64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name,
            max_iterations,
            temperature,
            timeout_seconds,
            description: description.into(),
        }
    }

    /// The timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds.max(0.0))
    }

    fn validate(&self) -> CatalogResult<()> {
        let invalid = |reason: &str| CatalogError::InvalidPolicy {
            name: self.name.to_string(),
            reason: reason.to_string(),
        };

        if self.max_iterations == 0 {
            return Err(invalid("max_iterations must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(invalid("temperature must be within [0, 1]"));
        }
        if !(self.timeout_seconds.is_finite() && self.timeout_seconds > 0.0) {
            return Err(invalid("timeout_seconds must be greater than 0"));
        }
        Ok(())
    }
}

/// Partial replacement for a built-in policy, usually sourced from configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyOverride {
    /// Strategy to override.
    pub name: Option<StrategyName>,
    /// Replacement iteration ceiling.
    pub max_iterations: Option<u32>,
    /// Replacement temperature.
    pub temperature: Option<f64>,
    /// Replacement timeout in seconds.
    pub timeout_seconds: Option<f64>,
}

impl StrategyOverride {
    /// Create an empty override for a strategy
    pub fn new(name: StrategyName) -> Self {
        Self {
            name: Some(name),
            ..Default::default()
        }
    }

    /// Whether this override changes anything.
    pub fn is_empty(&self) -> bool {
        self.max_iterations.is_none() && self.temperature.is_none() && self.timeout_seconds.is_none()
    }
}

/// Immutable table mapping each [`StrategyName`] to its [`Strategy`].
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyCatalog {
    // Indexed by `StrategyName::index`, so lookup is total by construction.
    strategies: [Strategy; 7],
}

impl StrategyCatalog {
    /// The built-in policy table.
    pub fn builtin() -> Self {
        Self {
            strategies: [
                Strategy::new(
                    StrategyName::Fast,
                    3,
                    0.3,
                    30.0,
                    "Quick single-pass answers for simple lookups",
                ),
                Strategy::new(
                    StrategyName::Balanced,
                    10,
                    0.7,
                    120.0,
                    "General-purpose reasoning with a moderate budget",
                ),
                Strategy::new(
                    StrategyName::Deep,
                    20,
                    0.7,
                    300.0,
                    "Extended analysis for complex, multi-part tasks",
                ),
                Strategy::new(
                    StrategyName::Creative,
                    15,
                    0.9,
                    180.0,
                    "High-temperature exploration for open-ended ideation",
                ),
                Strategy::new(
                    StrategyName::CotExplicit,
                    15,
                    0.5,
                    240.0,
                    "Explicit step-by-step chain-of-thought with tracked steps",
                ),
                Strategy::new(
                    StrategyName::TreeOfThought,
                    25,
                    0.6,
                    360.0,
                    "Branching exploration of competing approaches with scored selection",
                ),
                Strategy::new(
                    StrategyName::Adaptive,
                    30,
                    0.7,
                    300.0,
                    "Runtime-selected strategy with the widest iteration budget",
                ),
            ],
        }
    }

    /// Build a catalog from an explicit list of policies.
    ///
    /// # Errors
    /// Fails if any strategy is missing, listed twice, or has an out-of-range value.
    pub fn from_strategies(strategies: impl IntoIterator<Item = Strategy>) -> CatalogResult<Self> {
        let mut slots: [Option<Strategy>; 7] = Default::default();

        for strategy in strategies {
            strategy.validate()?;
            let slot = &mut slots[strategy.name.index()];
            if slot.is_some() {
                return Err(CatalogError::DuplicateStrategy {
                    name: strategy.name.to_string(),
                });
            }
            *slot = Some(strategy);
        }

        let ordered = StrategyName::ALL
            .iter()
            .map(|name| {
                slots[name.index()]
                    .take()
                    .ok_or_else(|| CatalogError::MissingStrategy {
                        name: name.to_string(),
                    })
            })
            .collect::<CatalogResult<Vec<_>>>()?;

        let strategies: [Strategy; 7] =
            ordered
                .try_into()
                .map_err(|_| CatalogError::MissingStrategy {
                    name: "unknown".to_string(),
                })?;

        Ok(Self { strategies })
    }

    /// Apply overrides on top of this catalog, returning a new validated catalog.
    ///
    /// # Errors
    /// Fails if an override has no target strategy or produces an invalid policy.
    pub fn with_overrides(&self, overrides: &[StrategyOverride]) -> CatalogResult<Self> {
        let mut strategies = self.strategies.clone();

        for ov in overrides.iter().filter(|ov| !ov.is_empty()) {
            let name = ov.name.ok_or_else(|| CatalogError::InvalidPolicy {
                name: "unnamed".to_string(),
                reason: "override does not name a strategy".to_string(),
            })?;
            let strategy = &mut strategies[name.index()];
            if let Some(max_iterations) = ov.max_iterations {
                strategy.max_iterations = max_iterations;
            }
            if let Some(temperature) = ov.temperature {
                strategy.temperature = temperature;
            }
            if let Some(timeout_seconds) = ov.timeout_seconds {
                strategy.timeout_seconds = timeout_seconds;
            }
            strategy.validate()?;
        }

        Ok(Self { strategies })
    }

    /// Look up the policy for a strategy. Total over [`StrategyName`].
    pub fn get(&self, name: StrategyName) -> &Strategy {
        &self.strategies[name.index()]
    }

    /// Look up a policy by free-form name.
    ///
    /// Matching is case-insensitive. Unknown, empty, or missing names resolve
    /// to [`StrategyName::Balanced`] with a warning.
    pub fn get_by_name(&self, name: Option<&str>) -> &Strategy {
        match name {
            Some(raw) => match raw.parse::<StrategyName>() {
                Ok(parsed) => self.get(parsed),
                Err(_) => {
                    warn!(
                        requested = %raw,
                        fallback = %StrategyName::Balanced,
                        "Unknown strategy name, falling back to balanced"
                    );
                    self.get(StrategyName::Balanced)
                }
            },
            None => {
                warn!(
                    fallback = %StrategyName::Balanced,
                    "No strategy name given, falling back to balanced"
                );
                self.get(StrategyName::Balanced)
            }
        }
    }

    /// Iterate over every policy in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &Strategy> {
        self.strategies.iter()
    }
}

impl Default for StrategyCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================================================
    // StrategyName Tests
    // ============================================================================

    #[test]
    fn test_strategy_name_as_str() {
        assert_eq!(StrategyName::Fast.as_str(), "fast");
        assert_eq!(StrategyName::Balanced.as_str(), "balanced");
        assert_eq!(StrategyName::Deep.as_str(), "deep");
        assert_eq!(StrategyName::Creative.as_str(), "creative");
        assert_eq!(StrategyName::CotExplicit.as_str(), "cot_explicit");
        assert_eq!(StrategyName::TreeOfThought.as_str(), "tree_of_thought");
        assert_eq!(StrategyName::Adaptive.as_str(), "adaptive");
    }

    #[test]
    fn test_strategy_name_from_str_case_insensitive() {
        assert_eq!("FAST".parse::<StrategyName>().unwrap(), StrategyName::Fast);
        assert_eq!(
            "Tree_Of_Thought".parse::<StrategyName>().unwrap(),
            StrategyName::TreeOfThought
        );
        assert_eq!(
            "cot-explicit".parse::<StrategyName>().unwrap(),
            StrategyName::CotExplicit
        );
    }

    #[test]
    fn test_strategy_name_from_str_invalid() {
        let result = "turbo".parse::<StrategyName>();
        assert_eq!(result.unwrap_err(), "Unknown strategy: turbo");
    }

    #[test]
    fn test_strategy_name_serde_snake_case() {
        let json = serde_json::to_string(&StrategyName::TreeOfThought).unwrap();
        assert_eq!(json, "\"tree_of_thought\"");
        let parsed: StrategyName = serde_json::from_str("\"cot_explicit\"").unwrap();
        assert_eq!(parsed, StrategyName::CotExplicit);
    }

    #[test]
    fn test_strategy_name_index_matches_all_order() {
        for (i, name) in StrategyName::ALL.iter().enumerate() {
            assert_eq!(name.index(), i);
        }
    }

    // ============================================================================
    // Builtin Table Tests
    // ============================================================================

    #[test]
    fn test_builtin_policy_table() {
        let catalog = StrategyCatalog::builtin();
        let expected = [
            (StrategyName::Fast, 3, 0.3, 30.0),
            (StrategyName::Balanced, 10, 0.7, 120.0),
            (StrategyName::Deep, 20, 0.7, 300.0),
            (StrategyName::Creative, 15, 0.9, 180.0),
            (StrategyName::CotExplicit, 15, 0.5, 240.0),
            (StrategyName::TreeOfThought, 25, 0.6, 360.0),
            (StrategyName::Adaptive, 30, 0.7, 300.0),
        ];

        for (name, iterations, temperature, timeout) in expected {
            let strategy = catalog.get(name);
            assert_eq!(strategy.name, name);
            assert_eq!(strategy.max_iterations, iterations);
            assert_eq!(strategy.temperature, temperature);
            assert_eq!(strategy.timeout_seconds, timeout);
            assert!(!strategy.description.is_empty());
        }
    }

    #[test]
    fn test_catalog_is_total() {
        let catalog = StrategyCatalog::default();
        for name in StrategyName::ALL {
            assert_eq!(catalog.get(name).name, name);
        }
        assert_eq!(catalog.iter().count(), 7);
    }

    #[test]
    fn test_strategy_timeout_duration() {
        let catalog = StrategyCatalog::builtin();
        assert_eq!(catalog.get(StrategyName::Fast).timeout(), Duration::from_secs(30));
    }

    // ============================================================================
    // Lenient Lookup Tests
    // ============================================================================

    #[test]
    fn test_get_by_name_case_insensitive() {
        let catalog = StrategyCatalog::builtin();
        assert_eq!(catalog.get_by_name(Some("DEEP")).name, StrategyName::Deep);
        assert_eq!(catalog.get_by_name(Some("Creative")).name, StrategyName::Creative);
    }

    #[test]
    fn test_get_by_name_unknown_falls_back_to_balanced() {
        let catalog = StrategyCatalog::builtin();
        assert_eq!(catalog.get_by_name(Some("warp-speed")).name, StrategyName::Balanced);
    }

    #[test]
    fn test_get_by_name_empty_falls_back_to_balanced() {
        let catalog = StrategyCatalog::builtin();
        assert_eq!(catalog.get_by_name(Some("")).name, StrategyName::Balanced);
    }

    #[test]
    fn test_get_by_name_none_falls_back_to_balanced() {
        let catalog = StrategyCatalog::builtin();
        assert_eq!(catalog.get_by_name(None).name, StrategyName::Balanced);
    }

    // ============================================================================
    // Construction Tests
    // ============================================================================

    #[test]
    fn test_from_strategies_roundtrip_builtin() {
        let builtin = StrategyCatalog::builtin();
        let rebuilt = StrategyCatalog::from_strategies(builtin.iter().cloned()).unwrap();
        assert_eq!(rebuilt, builtin);
    }

    #[test]
    fn test_from_strategies_missing() {
        let builtin = StrategyCatalog::builtin();
        let partial = builtin
            .iter()
            .filter(|s| s.name != StrategyName::Creative)
            .cloned();
        let err = StrategyCatalog::from_strategies(partial).unwrap_err();
        assert!(matches!(err, CatalogError::MissingStrategy { ref name } if name == "creative"));
    }

    #[test]
    fn test_from_strategies_duplicate() {
        let builtin = StrategyCatalog::builtin();
        let mut strategies: Vec<Strategy> = builtin.iter().cloned().collect();
        strategies.push(builtin.get(StrategyName::Fast).clone());
        let err = StrategyCatalog::from_strategies(strategies).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateStrategy { .. }));
    }

    #[test]
    fn test_from_strategies_invalid_temperature() {
        let mut strategies: Vec<Strategy> = StrategyCatalog::builtin().iter().cloned().collect();
        strategies[0].temperature = 1.5;
        let err = StrategyCatalog::from_strategies(strategies).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidPolicy { .. }));
    }

    #[test]
    fn test_with_overrides_applies_values() {
        let overrides = vec![StrategyOverride {
            max_iterations: Some(5),
            temperature: Some(0.2),
            ..StrategyOverride::new(StrategyName::Fast)
        }];
        let catalog = StrategyCatalog::builtin().with_overrides(&overrides).unwrap();
        let fast = catalog.get(StrategyName::Fast);
        assert_eq!(fast.max_iterations, 5);
        assert_eq!(fast.temperature, 0.2);
        assert_eq!(fast.timeout_seconds, 30.0);
        // Untouched strategies keep builtin values
        assert_eq!(catalog.get(StrategyName::Deep).max_iterations, 20);
    }

    #[test]
    fn test_with_overrides_rejects_zero_iterations() {
        let overrides = vec![StrategyOverride {
            max_iterations: Some(0),
            ..StrategyOverride::new(StrategyName::Deep)
        }];
        let err = StrategyCatalog::builtin().with_overrides(&overrides).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidPolicy { ref name, .. } if name == "deep"));
    }

    #[test]
    fn test_with_overrides_rejects_non_positive_timeout() {
        let overrides = vec![StrategyOverride {
            timeout_seconds: Some(0.0),
            ..StrategyOverride::new(StrategyName::Balanced)
        }];
        assert!(StrategyCatalog::builtin().with_overrides(&overrides).is_err());
    }

    #[test]
    fn test_empty_override_is_ignored() {
        let overrides = vec![StrategyOverride::default()];
        let catalog = StrategyCatalog::builtin().with_overrides(&overrides).unwrap();
        assert_eq!(catalog, StrategyCatalog::builtin());
    }
}
