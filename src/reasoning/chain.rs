//! Chain-of-thought tracking - linear, append-only reasoning steps.
//!
//! [`ChainTracker`] records the steps of one task execution in order.
//! [`extract_reasoning_steps`] and [`validate_reasoning`] scrape
//! `Step N:` / `Reasoning:` / `Confidence:` markers out of raw LLM output.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{average, parse_confidence, serialize_for_log, truncate};

const STEP_PREVIEW_LEN: usize = 80;

/// A single recorded reasoning step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningStep {
    /// 1-indexed position in the chain.
    pub step_number: u32,
    /// The thought for this step.
    pub thought: String,
    /// Action taken, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Observation resulting from the action, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
    /// Confidence in this step (0.0-1.0).
    pub confidence: f64,
    /// When the step was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Ordered, append-only record of reasoning steps for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainTracker {
    task_description: String,
    steps: Vec<ReasoningStep>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl ChainTracker {
    /// Start tracking a new task
    pub fn new(task_description: impl Into<String>) -> Self {
        Self {
            task_description: task_description.into(),
            steps: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Append a step and return it.
    ///
    /// The step number is always `len + 1`. Confidence is clamped to [0, 1].
    pub fn add_step(
        &mut self,
        thought: impl Into<String>,
        action: Option<String>,
        observation: Option<String>,
        confidence: f64,
    ) -> &ReasoningStep {
        let step_number = self.steps.len() as u32 + 1;
        self.steps.push(ReasoningStep {
            step_number,
            thought: thought.into(),
            action,
            observation,
            confidence: confidence.clamp(0.0, 1.0),
            timestamp: Utc::now(),
        });
        debug!(step = step_number, "Recorded reasoning step");
        &self.steps[self.steps.len() - 1]
    }

    /// Append a bare thought with full confidence.
    pub fn add_thought(&mut self, thought: impl Into<String>) -> &ReasoningStep {
        self.add_step(thought, None, None, 1.0)
    }

    /// Mark the chain complete. Later calls keep the first timestamp.
    pub fn complete(&mut self) {
        if self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
    }

    /// The task this chain belongs to.
    pub fn task_description(&self) -> &str {
        &self.task_description
    }

    /// Recorded steps in order.
    pub fn steps(&self) -> &[ReasoningStep] {
        &self.steps
    }

    /// When tracking started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// When the chain was completed, if it has been.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Whether [`complete`](Self::complete) has been called.
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Time from start to completion, or to now if still running.
    pub fn duration(&self) -> Duration {
        self.completed_at.unwrap_or_else(Utc::now) - self.started_at
    }

    /// Mean confidence over all steps; 0.0 when there are none.
    pub fn average_confidence(&self) -> f64 {
        average(self.steps.iter().map(|s| s.confidence))
    }

    /// Human-readable summary.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Task: {}", self.task_description),
            format!("Steps: {}", self.steps.len()),
            format!(
                "Duration: {:.2}s",
                self.duration().num_milliseconds() as f64 / 1000.0
            ),
            format!("Average confidence: {:.2}", self.average_confidence()),
        ];

        for step in &self.steps {
            lines.push(format!(
                "  {}. {} (confidence: {:.2})",
                step.step_number,
                truncate(&step.thought, STEP_PREVIEW_LEN),
                step.confidence
            ));
        }

        lines.join("\n")
    }

    /// Structured record of every field, for transport or logging.
    pub fn to_record(&self) -> serde_json::Value {
        serialize_for_log(self, "chain tracker record")
    }
}

// ============================================================================
// Output Parsing
// ============================================================================

/// A step scraped from raw chain-of-thought text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedStep {
    /// Text following the `Step N:` marker.
    pub thought: String,
    /// Text following the `Reasoning:` marker, empty if absent.
    pub reasoning: String,
    /// Parsed `Confidence:` value, 1.0 if absent or unparseable.
    pub confidence: f64,
}

impl ExtractedStep {
    fn new(thought: impl Into<String>) -> Self {
        Self {
            thought: thought.into(),
            reasoning: String::new(),
            confidence: 1.0,
        }
    }
}

/// Outcome of checking chain-of-thought text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainValidation {
    /// Whether the text passed.
    pub valid: bool,
    /// Steps found.
    pub step_count: usize,
    /// Steps carrying non-empty reasoning.
    pub reasoned_steps: usize,
    /// Explanation suitable for logging.
    pub reason: String,
}

/// Scrape ordered steps out of chain-of-thought text.
///
/// Line-oriented and lenient: lines without a recognised marker are ignored,
/// and `Reasoning:` / `Confidence:` lines before the first step are dropped.
pub fn extract_reasoning_steps(text: &str) -> Vec<ExtractedStep> {
    let mut steps = Vec::new();
    let mut current: Option<ExtractedStep> = None;

    for line in text.lines().map(str::trim) {
        if line.starts_with("Step ") {
            if let Some(step) = current.take() {
                steps.push(step);
            }
            let thought = line
                .split_once(':')
                .map(|(_, rest)| rest.trim())
                .unwrap_or(line);
            current = Some(ExtractedStep::new(thought));
        } else if let Some(rest) = line.strip_prefix("Reasoning:") {
            if let Some(step) = current.as_mut() {
                step.reasoning = rest.trim().to_string();
            }
        } else if let Some(rest) = line.strip_prefix("Confidence:") {
            if let Some(step) = current.as_mut() {
                step.confidence = parse_confidence(rest).unwrap_or(1.0);
            }
        }
    }

    if let Some(step) = current {
        steps.push(step);
    }

    steps
}

/// Check chain-of-thought text, returning the verdict with an explanation.
pub fn check_reasoning(text: &str, min_steps: usize) -> ChainValidation {
    let steps = extract_reasoning_steps(text);
    let step_count = steps.len();
    let reasoned_steps = steps
        .iter()
        .filter(|s| !s.reasoning.trim().is_empty())
        .count();

    let (valid, reason) = if step_count < min_steps {
        (
            false,
            format!("found {} steps, need at least {}", step_count, min_steps),
        )
    } else if reasoned_steps < min_steps {
        (
            false,
            format!(
                "only {} of {} steps include reasoning, need at least {}",
                reasoned_steps, step_count, min_steps
            ),
        )
    } else {
        (true, format!("{} steps with reasoning", reasoned_steps))
    };

    ChainValidation {
        valid,
        step_count,
        reasoned_steps,
        reason,
    }
}

/// Whether the text holds at least `min_steps` steps with reasoning.
pub fn validate_reasoning(text: &str, min_steps: usize) -> bool {
    let validation = check_reasoning(text, min_steps);
    if !validation.valid {
        debug!(reason = %validation.reason, "Chain-of-thought validation failed");
    }
    validation.valid
}
