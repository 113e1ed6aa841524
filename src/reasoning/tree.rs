//! Tree-of-thought exploration - competing branches with scored selection.
//!
//! Branches live in one flat, creation-ordered list and refer to their parent
//! by id. Parent/child relationships are lookups, never ownership, so the
//! tree serializes as-is and cannot form reference cycles.
//!
//! Capacity limits (`max_branches`, `max_depth`) are enforced on creation:
//! a refused branch is reported as `None` plus a warning, never an error.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{serialize_for_log, truncate};

const PATH_PREVIEW_LEN: usize = 60;

/// Lifecycle of a reasoning branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchStatus {
    /// Still being explored, not yet scored.
    #[default]
    Exploring,
    /// Scored and eligible for selection.
    Evaluated,
    /// Chosen as the best path.
    Selected,
    /// Scored but lost the selection.
    Rejected,
    /// Abandoned after a failure.
    Failed,
}

impl BranchStatus {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchStatus::Exploring => "exploring",
            BranchStatus::Evaluated => "evaluated",
            BranchStatus::Selected => "selected",
            BranchStatus::Rejected => "rejected",
            BranchStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for BranchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BranchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exploring" => Ok(BranchStatus::Exploring),
            "evaluated" => Ok(BranchStatus::Evaluated),
            "selected" => Ok(BranchStatus::Selected),
            "rejected" => Ok(BranchStatus::Rejected),
            "failed" => Ok(BranchStatus::Failed),
            _ => Err(format!("Unknown branch status: {}", s)),
        }
    }
}

/// One candidate line of reasoning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningBranch {
    /// Identifier, unique within its explorer.
    pub branch_id: String,
    /// Parent branch id; `None` for roots.
    pub parent_id: Option<String>,
    /// The thought this branch explores.
    pub thought: String,
    /// Actions taken, paired index-for-index with `observations`.
    pub actions: Vec<String>,
    /// Observations recorded for each action.
    pub observations: Vec<String>,
    /// Current status.
    pub status: BranchStatus,
    /// Score (0.0-1.0), meaningful once the branch has left `Exploring`.
    pub score: f64,
    /// 0 for roots, parent depth + 1 otherwise.
    pub depth: u32,
    /// When the branch was created.
    pub created_at: DateTime<Utc>,
}

impl ReasoningBranch {
    fn new(branch_id: String, parent_id: Option<String>, thought: String, depth: u32) -> Self {
        Self {
            branch_id,
            parent_id,
            thought,
            actions: Vec::new(),
            observations: Vec::new(),
            status: BranchStatus::Exploring,
            score: 0.0,
            depth,
            created_at: Utc::now(),
        }
    }

    /// Record an action together with its observation.
    pub fn add_action(&mut self, action: impl Into<String>, observation: impl Into<String>) {
        self.actions.push(action.into());
        self.observations.push(observation.into());
    }

    /// Score the branch. The score is clamped to [0, 1].
    pub fn evaluate(&mut self, score: f64) {
        self.score = score.clamp(0.0, 1.0);
        self.status = BranchStatus::Evaluated;
    }

    /// Abandon the branch.
    pub fn mark_failed(&mut self) {
        self.status = BranchStatus::Failed;
        self.score = 0.0;
    }
}

/// Assigns a score to an unscored branch.
///
/// The explorer clamps whatever is returned into [0, 1].
pub trait BranchScorer {
    /// Score a branch.
    fn score(&self, branch: &ReasoningBranch) -> f64;
}

impl<F> BranchScorer for F
where
    F: Fn(&ReasoningBranch) -> f64,
{
    fn score(&self, branch: &ReasoningBranch) -> f64 {
        self(branch)
    }
}

/// Default scorer: rewards depth and recorded actions.
///
/// `0.5 + 0.1 * depth + 0.05 * actions`, capped at 1.0.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicScorer;

impl BranchScorer for HeuristicScorer {
    fn score(&self, branch: &ReasoningBranch) -> f64 {
        let raw = 0.5 + 0.1 * branch.depth as f64 + 0.05 * branch.actions.len() as f64;
        raw.min(1.0)
    }
}

/// Bounded set of competing branches for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeExplorer {
    task_description: String,
    max_branches: usize,
    max_depth: u32,
    branches: Vec<ReasoningBranch>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    selected_branch_id: Option<String>,
}

impl TreeExplorer {
    /// Create an explorer. Limits below 1 are raised to 1.
    pub fn new(task_description: impl Into<String>, max_branches: usize, max_depth: u32) -> Self {
        Self {
            task_description: task_description.into(),
            max_branches: max_branches.max(1),
            max_depth: max_depth.max(1),
            branches: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            selected_branch_id: None,
        }
    }

    /// Create a branch, optionally under a parent.
    ///
    /// Returns `None` when the branch limit is reached or the branch would
    /// sit at `max_depth` or deeper. An unknown parent id yields a root branch.
    pub fn create_branch(
        &mut self,
        thought: impl Into<String>,
        parent_id: Option<&str>,
    ) -> Option<&mut ReasoningBranch> {
        if self.branches.len() >= self.max_branches {
            warn!(
                max_branches = self.max_branches,
                "Branch limit reached, not creating branch"
            );
            return None;
        }

        let parent = parent_id.and_then(|id| {
            let found = self.get_branch(id).map(|p| (p.branch_id.clone(), p.depth));
            if found.is_none() {
                warn!(parent_id = %id, "Parent branch not found, creating root branch");
            }
            found
        });

        let depth = parent.as_ref().map(|(_, d)| d + 1).unwrap_or(0);
        if depth >= self.max_depth {
            warn!(
                depth,
                max_depth = self.max_depth,
                "Depth limit reached, not creating branch"
            );
            return None;
        }

        let branch_id = format!("branch_{}", self.branches.len() + 1);
        debug!(branch_id = %branch_id, depth, "Creating branch");

        self.branches.push(ReasoningBranch::new(
            branch_id,
            parent.map(|(id, _)| id),
            thought.into(),
            depth,
        ));
        self.branches.last_mut()
    }

    /// Look up a branch by id.
    pub fn get_branch(&self, branch_id: &str) -> Option<&ReasoningBranch> {
        self.branches.iter().find(|b| b.branch_id == branch_id)
    }

    /// Look up a branch by id for modification.
    pub fn get_branch_mut(&mut self, branch_id: &str) -> Option<&mut ReasoningBranch> {
        self.branches.iter_mut().find(|b| b.branch_id == branch_id)
    }

    /// Direct children of a branch, in creation order.
    pub fn get_children(&self, parent_id: &str) -> Vec<&ReasoningBranch> {
        self.branches
            .iter()
            .filter(|b| b.parent_id.as_deref() == Some(parent_id))
            .collect()
    }

    /// Score every unscored branch with [`HeuristicScorer`].
    pub fn evaluate_branches(&mut self) {
        self.evaluate_branches_with(&HeuristicScorer);
    }

    /// Score every unscored branch with the given scorer.
    ///
    /// `Exploring` branches become `Evaluated`. `Failed` branches keep their
    /// status and are pinned to 0.0. Other branches are left alone.
    pub fn evaluate_branches_with(&mut self, scorer: &dyn BranchScorer) {
        for branch in &mut self.branches {
            match branch.status {
                BranchStatus::Exploring => {
                    let score = scorer.score(branch);
                    branch.evaluate(score);
                }
                BranchStatus::Failed => branch.score = 0.0,
                _ => {}
            }
        }
    }

    /// Evaluate, then select the highest-scoring evaluated branch.
    pub fn select_best_branch(&mut self) -> Option<&ReasoningBranch> {
        self.select_best_branch_with(&HeuristicScorer)
    }

    /// Evaluate with the given scorer, then select the best branch.
    ///
    /// Ties go to the earliest-created branch. The winner becomes `Selected`;
    /// every other evaluated branch, and any earlier selection, becomes
    /// `Rejected`. Returns `None` when no branch is in `Evaluated` status.
    pub fn select_best_branch_with(&mut self, scorer: &dyn BranchScorer) -> Option<&ReasoningBranch> {
        self.evaluate_branches_with(scorer);

        let mut best: Option<(usize, f64)> = None;
        for (idx, branch) in self.branches.iter().enumerate() {
            if branch.status != BranchStatus::Evaluated {
                continue;
            }
            if best.map_or(true, |(_, score)| branch.score > score) {
                best = Some((idx, branch.score));
            }
        }

        let Some((best_idx, best_score)) = best else {
            debug!("No evaluated branches to select from");
            return None;
        };

        for (idx, branch) in self.branches.iter_mut().enumerate() {
            if idx == best_idx {
                branch.status = BranchStatus::Selected;
            } else if matches!(branch.status, BranchStatus::Evaluated | BranchStatus::Selected) {
                branch.status = BranchStatus::Rejected;
            }
        }

        let selected = &self.branches[best_idx];
        self.selected_branch_id = Some(selected.branch_id.clone());

        info!(
            branch_id = %selected.branch_id,
            score = best_score,
            depth = selected.depth,
            "Selected best branch"
        );

        Some(selected)
    }

    /// Branches from the root down to the selected branch.
    ///
    /// Empty when nothing is selected. Stops early at an unresolvable parent.
    pub fn get_selected_path(&self) -> Vec<&ReasoningBranch> {
        let mut path = Vec::new();
        let mut cursor = self
            .selected_branch_id
            .as_deref()
            .and_then(|id| self.get_branch(id));

        while let Some(branch) = cursor {
            path.push(branch);
            // Bounded by the branch count in case of a corrupted record.
            if path.len() > self.branches.len() {
                break;
            }
            cursor = branch
                .parent_id
                .as_deref()
                .and_then(|id| self.get_branch(id));
        }

        path.reverse();
        path
    }

    /// Mark the exploration complete. Later calls keep the first timestamp.
    pub fn complete(&mut self) {
        if self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
    }

    /// The task being explored.
    pub fn task_description(&self) -> &str {
        &self.task_description
    }

    /// Branch limit.
    pub fn max_branches(&self) -> usize {
        self.max_branches
    }

    /// Depth limit (exclusive).
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// All branches in creation order.
    pub fn branches(&self) -> &[ReasoningBranch] {
        &self.branches
    }

    /// Id of the selected branch, if any.
    pub fn selected_branch_id(&self) -> Option<&str> {
        self.selected_branch_id.as_deref()
    }

    /// The selected branch, if any.
    pub fn selected_branch(&self) -> Option<&ReasoningBranch> {
        self.selected_branch_id
            .as_deref()
            .and_then(|id| self.get_branch(id))
    }

    /// Whether another branch can still be created.
    pub fn has_capacity(&self) -> bool {
        self.branches.len() < self.max_branches
    }

    /// When exploration started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// When exploration was completed, if it has been.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Deepest depth actually reached; 0 when empty.
    pub fn max_depth_reached(&self) -> u32 {
        self.branches.iter().map(|b| b.depth).max().unwrap_or(0)
    }

    /// Time from start to completion, or to now if still running.
    pub fn duration(&self) -> Duration {
        self.completed_at.unwrap_or_else(Utc::now) - self.started_at
    }

    /// Human-readable summary.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Task: {}", self.task_description),
            format!("Branches: {}", self.branches.len()),
            format!("Max depth reached: {}", self.max_depth_reached()),
            format!(
                "Duration: {:.2}s",
                self.duration().num_milliseconds() as f64 / 1000.0
            ),
        ];

        let path = self.get_selected_path();
        if path.is_empty() {
            lines.push("Selected path: no path selected".to_string());
        } else {
            lines.push("Selected path:".to_string());
            for branch in path {
                lines.push(format!(
                    "  [{}] {} (score: {:.2})",
                    branch.branch_id,
                    truncate(&branch.thought, PATH_PREVIEW_LEN),
                    branch.score
                ));
            }
        }

        lines.join("\n")
    }

    /// Structured record of every field, for transport or logging.
    pub fn to_record(&self) -> serde_json::Value {
        serialize_for_log(self, "tree explorer record")
    }
}

// ============================================================================
// Output Parsing
// ============================================================================

/// A candidate approach scraped from raw tree-of-thought text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedBranch {
    /// Text following the `Approach N:` marker.
    pub approach: String,
    /// Text following `Steps:`.
    pub steps: String,
    /// Text following `Pros:`.
    pub pros: String,
    /// Text following `Cons:`.
    pub cons: String,
    /// Parsed `Score:`, 0.5 if absent or unparseable.
    pub score: f64,
}

impl ExtractedBranch {
    fn new(approach: impl Into<String>) -> Self {
        Self {
            approach: approach.into(),
            steps: String::new(),
            pros: String::new(),
            cons: String::new(),
            score: 0.5,
        }
    }
}

/// Parse a `Score:` value: `N/M` is a ratio, a bare number is out of 100.
fn parse_score(raw: &str) -> Option<f64> {
    let raw = raw.trim().trim_end_matches('%').trim();
    let score = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.parse::<f64>().ok()? / 100.0,
    };
    score.is_finite().then(|| score.clamp(0.0, 1.0))
}

/// Scrape candidate approaches out of tree-of-thought text.
///
/// Same line-oriented strategy as the chain parser: `Approach ` opens a new
/// record, `Steps:` / `Pros:` / `Cons:` / `Score:` fill the open one.
pub fn extract_branches(text: &str) -> Vec<ExtractedBranch> {
    let mut branches = Vec::new();
    let mut current: Option<ExtractedBranch> = None;

    for line in text.lines().map(str::trim) {
        if line.starts_with("Approach ") {
            if let Some(branch) = current.take() {
                branches.push(branch);
            }
            let approach = line
                .split_once(':')
                .map(|(_, rest)| rest.trim())
                .unwrap_or(line);
            current = Some(ExtractedBranch::new(approach));
            continue;
        }

        let Some(branch) = current.as_mut() else {
            continue;
        };

        if let Some(rest) = line.strip_prefix("Steps:") {
            branch.steps = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("Pros:") {
            branch.pros = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("Cons:") {
            branch.cons = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("Score:") {
            branch.score = parse_score(rest).unwrap_or(0.5);
        }
    }

    if let Some(branch) = current {
        branches.push(branch);
    }

    branches
}
