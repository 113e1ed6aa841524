//! Adaptive strategy controller - escalates reasoning depth on poor progress.
//!
//! The controller estimates task complexity, starts from the matching
//! strategy, and re-evaluates after every metrics report. Escalation follows
//! a fixed ladder and is bounded by a per-session budget.
//!
//! # Escalation ladder
//!
//! ```text
//! fast ──▶ balanced ──▶ deep ──▶ tree_of_thought ◀─┐
//!                        ▲              │          │
//! creative ──────────────┘              └──────────┘
//! cot_explicit ──────────────────▶ tree_of_thought
//! adaptive ──────────────▶ deep
//! ```
//!
//! State is fully determined by `(current_strategy, escalation_count)`;
//! [`AdaptiveController::phase`] exposes it as a [`ControllerPhase`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    serialize_for_log, ComplexityClassifier, ComplexityLevel, KeywordClassifier, Strategy,
    StrategyCatalog, StrategyName,
};

/// Escalation budget used when none is given.
pub const DEFAULT_MAX_ESCALATIONS: u32 = 3;

/// Error count at which a session counts as stuck.
const ERROR_THRESHOLD: u32 = 3;
/// Iterations past which low progress counts as stuck.
const STUCK_ITERATIONS: u32 = 5;
/// Progress below which a long-running session counts as stuck.
const STUCK_PROGRESS: f64 = 0.2;
/// Progress a bounded strategy must reach before its iteration limit.
const EXHAUSTION_PROGRESS: f64 = 0.8;
const FAST_ITERATION_LIMIT: u32 = 3;
const BALANCED_ITERATION_LIMIT: u32 = 10;

/// Next strategy on the escalation ladder.
pub fn escalation_target(from: StrategyName) -> StrategyName {
    match from {
        StrategyName::Fast => StrategyName::Balanced,
        StrategyName::Balanced => StrategyName::Deep,
        StrategyName::Deep => StrategyName::TreeOfThought,
        StrategyName::TreeOfThought => StrategyName::TreeOfThought,
        StrategyName::CotExplicit => StrategyName::TreeOfThought,
        StrategyName::Creative => StrategyName::Deep,
        // Off the ladder
        StrategyName::Adaptive => StrategyName::Deep,
    }
}

/// Latest performance snapshot reported by the caller.
///
/// Values are running totals supplied by the caller, not accumulated here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Reasoning iterations used so far.
    pub iterations_used: u32,
    /// Seconds elapsed since the task started.
    pub time_elapsed: f64,
    /// Errors encountered so far.
    pub errors_encountered: u32,
    /// Progress towards completion (0.0-1.0).
    pub progress_score: f64,
    /// Confidence in the current answer (0.0-1.0).
    pub confidence_score: f64,
}

impl PerformanceMetrics {
    /// Create a metrics snapshot
    pub fn new(
        iterations_used: u32,
        time_elapsed: f64,
        errors_encountered: u32,
        progress_score: f64,
        confidence_score: f64,
    ) -> Self {
        Self {
            iterations_used,
            time_elapsed,
            errors_encountered,
            progress_score,
            confidence_score,
        }
    }
}

/// One recorded escalation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyTransition {
    /// Strategy before the escalation.
    pub from_strategy: StrategyName,
    /// Strategy after the escalation.
    pub to_strategy: StrategyName,
    /// Why the escalation happened.
    pub reason: String,
    /// Iterations used at the time.
    pub iteration: u32,
    /// When the escalation happened.
    pub timestamp: DateTime<Utc>,
}

/// Observable controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerPhase {
    /// Escalations remain.
    Exploring,
    /// The escalation budget is spent; the strategy is fixed from here on.
    EscalationExhausted,
}

/// Per-task strategy state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveController {
    session_id: String,
    task_description: String,
    complexity_estimate: ComplexityLevel,
    initial_strategy: StrategyName,
    current_strategy: StrategyName,
    max_escalations: u32,
    escalation_count: u32,
    transitions: Vec<StrategyTransition>,
    metrics: PerformanceMetrics,
    started_at: DateTime<Utc>,
    /// Effective policy for `current_strategy`, kept so records carry the
    /// overridden values the run actually used.
    current_policy: Strategy,
    #[serde(skip)]
    catalog: Arc<StrategyCatalog>,
}

impl AdaptiveController {
    /// Create a session with the default escalation budget.
    pub fn new(task_description: impl Into<String>) -> Self {
        Self::create_session(task_description, DEFAULT_MAX_ESCALATIONS)
    }

    /// Create a session, classifying the task with [`KeywordClassifier`].
    pub fn create_session(task_description: impl Into<String>, max_escalations: u32) -> Self {
        Self::create_session_with(
            task_description,
            max_escalations,
            &KeywordClassifier::default(),
        )
    }

    /// Create a session using a custom complexity classifier.
    pub fn create_session_with(
        task_description: impl Into<String>,
        max_escalations: u32,
        classifier: &dyn ComplexityClassifier,
    ) -> Self {
        let task_description = task_description.into();
        let complexity_estimate = classifier.classify(&task_description);
        let initial_strategy = complexity_estimate.initial_strategy();
        let session_id = Uuid::new_v4().to_string();
        let catalog = Arc::new(StrategyCatalog::builtin());

        info!(
            session_id = %session_id,
            complexity = %complexity_estimate,
            strategy = %initial_strategy,
            max_escalations,
            "Created adaptive reasoning session"
        );

        Self {
            session_id,
            task_description,
            complexity_estimate,
            initial_strategy,
            current_strategy: initial_strategy,
            max_escalations,
            escalation_count: 0,
            transitions: Vec::new(),
            metrics: PerformanceMetrics::default(),
            started_at: Utc::now(),
            current_policy: catalog.get(initial_strategy).clone(),
            catalog,
        }
    }

    /// Resolve strategies against a custom catalog.
    ///
    /// Deserialized controllers start on the built-in catalog; reattach the
    /// run's catalog here before escalating further.
    pub fn with_catalog(mut self, catalog: Arc<StrategyCatalog>) -> Self {
        self.current_policy = catalog.get(self.current_strategy).clone();
        self.catalog = catalog;
        self
    }

    /// Start from a specific strategy instead of the estimated one.
    ///
    /// Intended for freshly created sessions; the transition log is untouched.
    pub fn with_initial_strategy(mut self, strategy: StrategyName) -> Self {
        self.initial_strategy = strategy;
        self.current_strategy = strategy;
        self.current_policy = self.catalog.get(strategy).clone();
        self
    }

    /// Replace the metrics snapshot and escalate if warranted.
    ///
    /// Returns the new strategy when this call escalated.
    pub fn update_metrics(
        &mut self,
        iterations_used: u32,
        time_elapsed: f64,
        errors_encountered: u32,
        progress_score: f64,
        confidence_score: f64,
    ) -> Option<StrategyName> {
        self.update(PerformanceMetrics::new(
            iterations_used,
            time_elapsed,
            errors_encountered,
            progress_score,
            confidence_score,
        ))
    }

    /// Replace the metrics snapshot and escalate if warranted.
    pub fn update(&mut self, metrics: PerformanceMetrics) -> Option<StrategyName> {
        self.record(metrics);

        let reason = self.escalation_reason()?;
        self.escalate_strategy(reason).map(|s| s.name)
    }

    /// Replace the metrics snapshot without considering escalation.
    ///
    /// Used for the final report of a finished run.
    pub fn record(&mut self, metrics: PerformanceMetrics) {
        self.metrics = metrics;

        debug!(
            session_id = %self.session_id,
            strategy = %self.current_strategy,
            iterations = metrics.iterations_used,
            errors = metrics.errors_encountered,
            progress = metrics.progress_score,
            confidence = metrics.confidence_score,
            "Metrics updated"
        );
    }

    /// Whether the current metrics call for an escalation.
    pub fn should_escalate(&self) -> bool {
        self.escalation_reason().is_some()
    }

    /// Why the current metrics call for an escalation, if they do.
    pub fn escalation_reason(&self) -> Option<String> {
        if self.escalation_count >= self.max_escalations {
            return None;
        }

        let m = &self.metrics;

        if m.errors_encountered >= ERROR_THRESHOLD {
            return Some(format!(
                "Stuck: {} errors encountered",
                m.errors_encountered
            ));
        }
        if m.iterations_used > STUCK_ITERATIONS && m.progress_score < STUCK_PROGRESS {
            return Some(format!(
                "Stuck: progress {:.2} after {} iterations",
                m.progress_score, m.iterations_used
            ));
        }

        let limit = match self.current_strategy {
            StrategyName::Fast => FAST_ITERATION_LIMIT,
            StrategyName::Balanced => BALANCED_ITERATION_LIMIT,
            _ => return None,
        };
        if m.iterations_used >= limit && m.progress_score < EXHAUSTION_PROGRESS {
            return Some(format!(
                "{} strategy exhausted: progress {:.2} after {} iterations",
                self.current_strategy, m.progress_score, m.iterations_used
            ));
        }

        None
    }

    /// Move one step up the escalation ladder.
    ///
    /// Returns `None` with a warning once the budget is spent.
    pub fn escalate_strategy(&mut self, reason: impl Into<String>) -> Option<&Strategy> {
        let reason = reason.into();

        if self.escalation_count >= self.max_escalations {
            warn!(
                session_id = %self.session_id,
                strategy = %self.current_strategy,
                max_escalations = self.max_escalations,
                reason = %reason,
                "Escalation budget exhausted, keeping current strategy"
            );
            return None;
        }

        let from = self.current_strategy;
        let to = escalation_target(from);

        self.transitions.push(StrategyTransition {
            from_strategy: from,
            to_strategy: to,
            reason: reason.clone(),
            iteration: self.metrics.iterations_used,
            timestamp: Utc::now(),
        });
        self.current_strategy = to;
        self.current_policy = self.catalog.get(to).clone();
        self.escalation_count += 1;

        info!(
            session_id = %self.session_id,
            from = %from,
            to = %to,
            iteration = self.metrics.iterations_used,
            escalations = self.escalation_count,
            reason = %reason,
            "Escalated reasoning strategy"
        );

        Some(&self.current_policy)
    }

    /// Policy for the current strategy.
    pub fn get_current_config(&self) -> &Strategy {
        &self.current_policy
    }

    /// Current state.
    pub fn phase(&self) -> ControllerPhase {
        if self.escalation_count >= self.max_escalations {
            ControllerPhase::EscalationExhausted
        } else {
            ControllerPhase::Exploring
        }
    }

    /// Escalations left in the budget.
    pub fn remaining_escalations(&self) -> u32 {
        self.max_escalations.saturating_sub(self.escalation_count)
    }

    /// Session identifier for log correlation.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The task being reasoned about.
    pub fn task_description(&self) -> &str {
        &self.task_description
    }

    /// Complexity estimated at creation.
    pub fn complexity_estimate(&self) -> ComplexityLevel {
        self.complexity_estimate
    }

    /// Strategy the session started with.
    pub fn initial_strategy(&self) -> StrategyName {
        self.initial_strategy
    }

    /// Strategy in effect now.
    pub fn current_strategy(&self) -> StrategyName {
        self.current_strategy
    }

    /// Escalation budget.
    pub fn max_escalations(&self) -> u32 {
        self.max_escalations
    }

    /// Escalations performed so far.
    pub fn escalation_count(&self) -> u32 {
        self.escalation_count
    }

    /// Escalation history, oldest first.
    pub fn transitions(&self) -> &[StrategyTransition] {
        &self.transitions
    }

    /// Latest metrics snapshot.
    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.metrics
    }

    /// When the session started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Time since the session started.
    pub fn elapsed(&self) -> Duration {
        Utc::now() - self.started_at
    }

    /// Human-readable summary.
    pub fn summary(&self) -> String {
        let m = &self.metrics;
        let mut lines = vec![
            format!("Task: {}", self.task_description),
            format!("Complexity: {}", self.complexity_estimate),
            format!(
                "Duration: {:.2}s",
                self.elapsed().num_milliseconds() as f64 / 1000.0
            ),
            format!(
                "Strategy: {} -> {}",
                self.initial_strategy, self.current_strategy
            ),
            format!(
                "Escalations: {}/{}",
                self.escalation_count, self.max_escalations
            ),
            format!(
                "Metrics: iterations={}, elapsed={:.1}s, errors={}, progress={:.2}, confidence={:.2}",
                m.iterations_used,
                m.time_elapsed,
                m.errors_encountered,
                m.progress_score,
                m.confidence_score
            ),
        ];

        if self.transitions.is_empty() {
            lines.push("Transitions: none".to_string());
        } else {
            lines.push("Transitions:".to_string());
            for (i, t) in self.transitions.iter().enumerate() {
                lines.push(format!(
                    "  {}. {} -> {} at iteration {}: {}",
                    i + 1,
                    t.from_strategy,
                    t.to_strategy,
                    t.iteration,
                    t.reason
                ));
            }
        }

        lines.join("\n")
    }

    /// Structured record of every field, for transport or logging.
    pub fn to_record(&self) -> serde_json::Value {
        serialize_for_log(self, "adaptive controller record")
    }
}
