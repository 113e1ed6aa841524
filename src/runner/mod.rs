//! Agent execution loop.
//!
//! [`ReasoningRunner`] is the caller the reasoning core expects: it asks the
//! [`AdaptiveController`] for a strategy, invokes the LLM under that strategy's
//! temperature and time budget, scrapes progress and confidence out of the
//! output, and reports running totals back so the controller can escalate.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::llm::{LlmBackend, TokenUsage};
use crate::prompts::{ADAPTIVE_REASONING_PROMPT, CHAIN_OF_THOUGHT_PROMPT, TREE_OF_THOUGHT_PROMPT};
use crate::reasoning::{
    extract_branches, extract_reasoning_steps, parse_confidence, validate_reasoning,
    AdaptiveController, ChainTracker, ComplexityClassifier, KeywordClassifier,
    PerformanceMetrics, ReasoningMode, Strategy, StrategyCatalog, StrategyName, TreeExplorer,
    DEFAULT_MAX_ESCALATIONS,
};

/// Consecutive failed invocations after which the backend is given up on.
const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model produced a `Final Answer:`.
    Completed,
    /// The current strategy's iteration ceiling was reached.
    IterationCeiling,
    /// The current strategy's time budget ran out.
    Timeout,
    /// Tree mode could not create any further branch.
    TreeExhausted,
    /// Too many invocations in a row failed.
    BackendUnavailable,
}

impl StopReason {
    /// Get the stop reason as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Completed => "completed",
            StopReason::IterationCeiling => "iteration_ceiling",
            StopReason::Timeout => "timeout",
            StopReason::TreeExhausted => "tree_exhausted",
            StopReason::BackendUnavailable => "backend_unavailable",
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Knobs for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerSettings {
    pub mode: ReasoningMode,
    /// Start here instead of at the complexity estimate.
    pub initial_strategy: Option<StrategyName>,
    pub max_escalations: u32,
    pub max_tokens: u32,
    pub tree_max_branches: usize,
    pub tree_max_depth: u32,
    pub cot_min_steps: usize,
    pub max_consecutive_failures: u32,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            mode: ReasoningMode::Adaptive,
            initial_strategy: None,
            max_escalations: DEFAULT_MAX_ESCALATIONS,
            max_tokens: 2000,
            tree_max_branches: 5,
            tree_max_depth: 3,
            cot_min_steps: 2,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }
}

impl RunnerSettings {
    /// Settings taken from loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_escalations: config.reasoning.max_escalations,
            max_tokens: config.llm.max_tokens,
            tree_max_branches: config.reasoning.tree_max_branches,
            tree_max_depth: config.reasoning.tree_max_depth,
            cot_min_steps: config.reasoning.cot_min_steps,
            ..Self::default()
        }
    }

    /// Set the reasoning mode
    pub fn with_mode(mut self, mode: ReasoningMode) -> Self {
        self.mode = mode;
        self
    }

    /// Force the starting strategy
    pub fn with_initial_strategy(mut self, strategy: StrategyName) -> Self {
        self.initial_strategy = Some(strategy);
        self
    }

    /// Set the escalation budget
    pub fn with_max_escalations(mut self, max_escalations: u32) -> Self {
        self.max_escalations = max_escalations;
        self
    }
}

/// Markers scraped from one model response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputAssessment {
    /// Last `Progress:` value, as a fraction.
    pub progress: Option<f64>,
    /// Last `Confidence:` value.
    pub confidence: Option<f64>,
    /// Everything after `Final Answer:`, if non-empty.
    pub final_answer: Option<String>,
}

/// Scrape `Progress:`, `Confidence:` and `Final Answer:` markers.
///
/// Progress accepts `80%`, `0.8` or `80` (values above 1 are read as
/// percentages). The final answer runs from the marker to the end of the text.
pub fn assess_output(text: &str) -> OutputAssessment {
    let mut assessment = OutputAssessment::default();
    let lines: Vec<&str> = text.lines().collect();

    for (idx, line) in lines.iter().enumerate() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Progress:") {
            if let Some(progress) = parse_progress(rest) {
                assessment.progress = Some(progress);
            }
        } else if let Some(rest) = line.strip_prefix("Confidence:") {
            if let Some(confidence) = parse_confidence(rest) {
                assessment.confidence = Some(confidence);
            }
        } else if let Some(rest) = line.strip_prefix("Final Answer:") {
            let mut answer = rest.trim().to_string();
            for tail in &lines[idx + 1..] {
                answer.push('\n');
                answer.push_str(tail);
            }
            let answer = answer.trim();
            if !answer.is_empty() {
                assessment.final_answer = Some(answer.to_string());
            }
            break;
        }
    }

    assessment
}

fn parse_progress(raw: &str) -> Option<f64> {
    let token = raw.split_whitespace().next()?;
    if token.ends_with('%') {
        return parse_confidence(token);
    }
    let value: f64 = token.trim_end_matches([',', '.', ';']).parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let fraction = if value > 1.0 { value / 100.0 } else { value };
    Some(fraction.clamp(0.0, 1.0))
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    /// The final answer, or the best partial result when the run stopped early.
    pub answer: String,
    pub stop_reason: StopReason,
    pub final_strategy: StrategyName,
    pub iterations: u32,
    pub errors: u32,
    /// Token usage summed over every successful invocation.
    pub usage: TokenUsage,
    pub controller: AdaptiveController,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<ChainTracker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree: Option<TreeExplorer>,
}

impl RunOutcome {
    /// Whether the model reached a final answer.
    pub fn is_completed(&self) -> bool {
        self.stop_reason == StopReason::Completed
    }

    /// Human-readable report: answer, stop reason, then per-component summaries.
    pub fn summary(&self) -> String {
        let mut sections = vec![
            format!("Answer:\n{}", self.answer),
            format!(
                "Stopped: {} after {} iterations ({} errors, {} tokens)",
                self.stop_reason, self.iterations, self.errors, self.usage.total_tokens
            ),
            self.controller.summary(),
        ];
        if let Some(chain) = &self.chain {
            sections.push(chain.summary());
        }
        if let Some(tree) = &self.tree {
            sections.push(tree.summary());
        }
        sections.join("\n\n")
    }
}

/// What one successful invocation contributed.
enum CycleOutcome {
    Continue,
    Completed(String),
    TreeExhausted,
}

/// Mutable per-run state.
struct RunState {
    iterations: u32,
    errors: u32,
    consecutive_failures: u32,
    progress: f64,
    confidence: f64,
    usage: TokenUsage,
    last_output: String,
    chain: Option<ChainTracker>,
    tree: Option<TreeExplorer>,
}

/// Drives one task at a time through the adaptive reasoning loop.
#[derive(Clone)]
pub struct ReasoningRunner {
    backend: Arc<dyn LlmBackend>,
    catalog: Arc<StrategyCatalog>,
    classifier: Arc<dyn ComplexityClassifier>,
    settings: RunnerSettings,
}

impl ReasoningRunner {
    /// Create a runner over a backend and strategy catalog
    pub fn new(
        backend: Arc<dyn LlmBackend>,
        catalog: Arc<StrategyCatalog>,
        settings: RunnerSettings,
    ) -> Self {
        Self {
            backend,
            catalog,
            classifier: Arc::new(KeywordClassifier::default()),
            settings,
        }
    }

    /// Use a custom complexity classifier
    pub fn with_classifier(mut self, classifier: Arc<dyn ComplexityClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Settings in effect
    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    /// Run a task to completion or until a budget runs out.
    ///
    /// Invocation failures never abort the run directly; they are counted as
    /// errors and fed to the controller.
    pub async fn run(&self, task: &str) -> RunOutcome {
        let settings = &self.settings;
        let started = Instant::now();

        let mut controller = AdaptiveController::create_session_with(
            task,
            settings.max_escalations,
            self.classifier.as_ref(),
        )
        .with_catalog(Arc::clone(&self.catalog));
        if let Some(strategy) = settings.initial_strategy {
            controller = controller.with_initial_strategy(strategy);
        }

        let mut state = RunState {
            iterations: 0,
            errors: 0,
            consecutive_failures: 0,
            progress: 0.0,
            confidence: 0.0,
            usage: TokenUsage::default(),
            last_output: String::new(),
            chain: (settings.mode == ReasoningMode::Chain).then(|| ChainTracker::new(task)),
            tree: (settings.mode == ReasoningMode::Tree).then(|| {
                TreeExplorer::new(task, settings.tree_max_branches, settings.tree_max_depth)
            }),
        };

        info!(
            session_id = %controller.session_id(),
            mode = %settings.mode,
            strategy = %controller.current_strategy(),
            "Starting reasoning run"
        );

        let mut answer = None;
        let stop_reason = loop {
            let strategy = controller.get_current_config().clone();

            if state.iterations >= strategy.max_iterations {
                break StopReason::IterationCeiling;
            }
            let remaining = strategy.timeout().saturating_sub(started.elapsed());
            if remaining.is_zero() {
                break StopReason::Timeout;
            }

            let prompt = self.build_prompt(task, &strategy, &state);
            state.iterations += 1;

            let cycle = self.invoke_once(&prompt, &strategy, remaining, &mut state).await;

            let metrics = PerformanceMetrics::new(
                state.iterations,
                started.elapsed().as_secs_f64(),
                state.errors,
                state.progress,
                state.confidence,
            );

            // A finished run reports its totals but never escalates
            let stop = match cycle {
                Some(CycleOutcome::Completed(text)) => {
                    controller.record(metrics);
                    answer = Some(text);
                    Some(StopReason::Completed)
                }
                Some(CycleOutcome::TreeExhausted) => {
                    controller.update(metrics);
                    Some(StopReason::TreeExhausted)
                }
                Some(CycleOutcome::Continue) => {
                    controller.update(metrics);
                    None
                }
                None => {
                    controller.update(metrics);
                    (state.consecutive_failures >= settings.max_consecutive_failures)
                        .then_some(StopReason::BackendUnavailable)
                }
            };
            if let Some(stop) = stop {
                break stop;
            }
        };

        if let Some(chain) = state.chain.as_mut() {
            chain.complete();
        }
        if let Some(tree) = state.tree.as_mut() {
            tree.complete();
        }

        let answer = answer.unwrap_or_else(|| fallback_answer(&state));

        info!(
            session_id = %controller.session_id(),
            stop_reason = %stop_reason,
            strategy = %controller.current_strategy(),
            iterations = state.iterations,
            errors = state.errors,
            escalations = controller.escalation_count(),
            "Reasoning run finished"
        );

        RunOutcome {
            answer,
            stop_reason,
            final_strategy: controller.current_strategy(),
            iterations: state.iterations,
            errors: state.errors,
            usage: state.usage,
            controller,
            chain: state.chain,
            tree: state.tree,
        }
    }

    /// One bounded invocation. `None` means the invocation itself failed.
    async fn invoke_once(
        &self,
        prompt: &str,
        strategy: &Strategy,
        remaining: Duration,
        state: &mut RunState,
    ) -> Option<CycleOutcome> {
        let call = self
            .backend
            .invoke(prompt, strategy.temperature, self.settings.max_tokens);

        let completion = match tokio::time::timeout(remaining, call).await {
            Ok(Ok(completion)) => completion,
            Ok(Err(e)) => {
                warn!(
                    strategy = %strategy.name,
                    iteration = state.iterations,
                    error = %e,
                    "LLM invocation failed"
                );
                state.errors += 1;
                state.consecutive_failures += 1;
                return None;
            }
            Err(_) => {
                warn!(
                    strategy = %strategy.name,
                    iteration = state.iterations,
                    remaining_ms = remaining.as_millis(),
                    "LLM invocation timed out"
                );
                state.errors += 1;
                state.consecutive_failures += 1;
                return None;
            }
        };

        state.consecutive_failures = 0;
        if let Some(usage) = completion.usage {
            state.usage += usage;
        }

        let assessment = assess_output(&completion.text);
        debug!(
            iteration = state.iterations,
            progress = ?assessment.progress,
            confidence = ?assessment.confidence,
            final_answer = assessment.final_answer.is_some(),
            "Assessed model output"
        );

        let outcome = match self.settings.mode {
            ReasoningMode::Adaptive => {
                if let Some(progress) = assessment.progress {
                    state.progress = progress;
                }
                if let Some(confidence) = assessment.confidence {
                    state.confidence = confidence;
                }
                CycleOutcome::Continue
            }
            ReasoningMode::Chain => self.record_chain(&completion.text, &assessment, state),
            ReasoningMode::Tree => self.record_tree(&completion.text, &assessment, state),
        };

        state.last_output = completion.text;

        match (outcome, assessment.final_answer) {
            (CycleOutcome::Continue, Some(answer)) => {
                state.progress = 1.0;
                Some(CycleOutcome::Completed(answer))
            }
            (outcome, _) => Some(outcome),
        }
    }

    fn record_chain(
        &self,
        text: &str,
        assessment: &OutputAssessment,
        state: &mut RunState,
    ) -> CycleOutcome {
        let Some(chain) = state.chain.as_mut() else {
            return CycleOutcome::Continue;
        };

        for step in extract_reasoning_steps(text) {
            let thought = if step.reasoning.is_empty() {
                step.thought
            } else {
                format!("{} ({})", step.thought, step.reasoning)
            };
            chain.add_step(thought, None, None, step.confidence);
        }

        let finishing = assessment.final_answer.is_some();
        if !finishing && !validate_reasoning(text, self.settings.cot_min_steps) {
            warn!(
                iteration = state.iterations,
                min_steps = self.settings.cot_min_steps,
                "Chain-of-thought output failed validation"
            );
            state.errors += 1;
        }

        if let Some(progress) = assessment.progress {
            state.progress = progress;
        }
        if !chain.steps().is_empty() {
            state.confidence = chain.average_confidence();
        }

        CycleOutcome::Continue
    }

    fn record_tree(
        &self,
        text: &str,
        assessment: &OutputAssessment,
        state: &mut RunState,
    ) -> CycleOutcome {
        let Some(tree) = state.tree.as_mut() else {
            return CycleOutcome::Continue;
        };

        let finishing = assessment.final_answer.is_some();
        let candidates = extract_branches(text);
        if candidates.is_empty() {
            if finishing {
                return CycleOutcome::Continue;
            }
            warn!(
                iteration = state.iterations,
                "Tree-of-thought output contained no approaches"
            );
            state.errors += 1;
            return CycleOutcome::Continue;
        }

        let parent_id = tree.selected_branch_id().map(str::to_string);
        let mut created = 0;
        for candidate in candidates {
            let Some(branch) = tree.create_branch(candidate.approach, parent_id.as_deref()) else {
                break;
            };
            if !candidate.steps.is_empty() {
                branch.add_action(
                    candidate.steps,
                    format!("Pros: {}; Cons: {}", candidate.pros, candidate.cons),
                );
            }
            branch.evaluate(candidate.score);
            created += 1;
        }

        if created == 0 {
            return if finishing {
                CycleOutcome::Continue
            } else {
                CycleOutcome::TreeExhausted
            };
        }

        if let Some(selected) = tree.select_best_branch() {
            state.progress = selected.score;
            state.confidence = assessment.confidence.unwrap_or(selected.score);
        }

        CycleOutcome::Continue
    }

    fn build_prompt(&self, task: &str, strategy: &Strategy, state: &RunState) -> String {
        let instructions = match self.settings.mode {
            ReasoningMode::Adaptive => ADAPTIVE_REASONING_PROMPT,
            ReasoningMode::Chain => CHAIN_OF_THOUGHT_PROMPT,
            ReasoningMode::Tree => TREE_OF_THOUGHT_PROMPT,
        };

        let context = match (&state.chain, &state.tree) {
            (Some(chain), _) if !chain.steps().is_empty() => {
                let mut lines = vec!["Steps so far:".to_string()];
                for step in chain.steps() {
                    lines.push(format!("Step {}: {}", step.step_number, step.thought));
                }
                lines.push(format!("Continue from Step {}.", chain.steps().len() + 1));
                lines.join("\n")
            }
            (_, Some(tree)) => {
                let path = tree.get_selected_path();
                if path.is_empty() {
                    "No approach has been selected yet.".to_string()
                } else {
                    let mut lines = vec!["Current path:".to_string()];
                    for branch in path {
                        lines.push(format!("- {} (score: {:.2})", branch.thought, branch.score));
                    }
                    lines.join("\n")
                }
            }
            _ if !state.last_output.is_empty() => {
                format!("Previous iteration:\n{}", state.last_output)
            }
            _ => "This is the first iteration.".to_string(),
        };

        format!(
            "{}\n\nTask: {}\n\nStrategy: {} ({})\nIteration {} of {}\n\n{}",
            instructions,
            task,
            strategy.name,
            strategy.description,
            state.iterations + 1,
            strategy.max_iterations,
            context
        )
    }
}

fn fallback_answer(state: &RunState) -> String {
    if let Some(tree) = &state.tree {
        let path: Vec<&str> = tree
            .get_selected_path()
            .into_iter()
            .map(|b| b.thought.as_str())
            .collect();
        if !path.is_empty() {
            return path.join(" -> ");
        }
    }
    if let Some(step) = state.chain.as_ref().and_then(|c| c.steps().last()) {
        return step.thought.clone();
    }
    state.last_output.trim().to_string()
}
