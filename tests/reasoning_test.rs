//! Integration tests for the strategy catalog, chain tracker, and tree explorer
//!
//! Exercises the public reasoning API the way a caller's agent loop would.

use pretty_assertions::assert_eq;

use adaptive_reasoning::reasoning::{
    check_reasoning, extract_branches, extract_reasoning_steps, validate_reasoning, BranchStatus,
    ChainTracker, ReasoningBranch, Strategy, StrategyCatalog, StrategyName, TreeExplorer,
};

#[cfg(test)]
mod catalog_tests {
    use super::*;
    #[allow(unused_imports)]
    use pretty_assertions::assert_eq;

    #[test]
    fn test_every_name_resolves() {
        let catalog = StrategyCatalog::builtin();
        for name in StrategyName::ALL {
            let strategy = catalog.get(name);
            assert_eq!(strategy.name, name);
            assert!(strategy.max_iterations > 0);
            assert!((0.0..=1.0).contains(&strategy.temperature));
            assert!(strategy.timeout_seconds > 0.0);
        }
    }

    #[test]
    fn test_lenient_lookup_falls_back_to_balanced() {
        let catalog = StrategyCatalog::builtin();
        for input in [None, Some(""), Some("   "), Some("quantum")] {
            assert_eq!(
                catalog.get_by_name(input).name,
                StrategyName::Balanced,
                "input {:?}",
                input
            );
        }
        assert_eq!(
            catalog.get_by_name(Some("Tree-Of-Thought")).name,
            StrategyName::TreeOfThought
        );
    }

    #[test]
    fn test_from_strategies_requires_every_name() {
        let partial: Vec<Strategy> = StrategyCatalog::builtin()
            .iter()
            .filter(|s| s.name != StrategyName::Creative)
            .cloned()
            .collect();
        assert!(StrategyCatalog::from_strategies(partial).is_err());

        let full: Vec<Strategy> = StrategyCatalog::builtin().iter().cloned().collect();
        assert_eq!(
            StrategyCatalog::from_strategies(full).unwrap(),
            StrategyCatalog::builtin()
        );
    }
}

#[cfg(test)]
mod chain_tests {
    use super::*;
    #[allow(unused_imports)]
    use pretty_assertions::assert_eq;

    #[test]
    fn test_step_numbers_are_sequential() {
        let mut chain = ChainTracker::new("Plan a trip");
        let numbers: Vec<u32> = (0..10)
            .map(|i| chain.add_thought(format!("thought {}", i)).step_number)
            .collect();

        assert_eq!(numbers, (1..=10).collect::<Vec<u32>>());
        assert_eq!(chain.steps().len(), 10);
        assert_eq!(chain.steps()[3].thought, "thought 3");
    }

    #[test]
    fn test_average_confidence() {
        let mut chain = ChainTracker::new("task");
        assert_eq!(chain.average_confidence(), 0.0);
        assert!(chain.summary().contains("Average confidence: 0.00"));

        chain.add_step("a", None, None, 0.5);
        chain.add_step("b", None, None, 0.75);
        chain.add_step("c", None, None, 1.0);
        assert_eq!(chain.average_confidence(), 0.75);
        assert!(chain.summary().contains("Average confidence: 0.75"));
    }

    #[test]
    fn test_complete_is_idempotent() {
        let mut chain = ChainTracker::new("task");
        assert!(chain.completed_at().is_none());
        chain.complete();
        let first = chain.completed_at();
        chain.complete();
        assert_eq!(chain.completed_at(), first);
    }

    #[test]
    fn test_parse_then_track() {
        let output = "Let me think.\n\
                      Step 1: Identify the inputs\n\
                      Reasoning: The task names two files\n\
                      Confidence: 0.9\n\
                      Step 2: Diff them\n\
                      Reasoning: Differences answer the question\n\
                      Confidence: 70%";

        assert!(validate_reasoning(output, 2));
        assert!(!validate_reasoning(output, 3));

        let mut chain = ChainTracker::new("Compare two files");
        for step in extract_reasoning_steps(output) {
            chain.add_step(step.thought, None, None, step.confidence);
        }

        assert_eq!(chain.steps().len(), 2);
        assert_eq!(chain.steps()[1].thought, "Diff them");
        assert!(chain.steps()[1].observation.is_none());
    }

    #[test]
    fn test_check_reasoning_explains_failure() {
        let validation = check_reasoning("Step 1: a\nStep 2: b", 2);
        assert!(!validation.valid);
        assert_eq!(validation.step_count, 2);
        assert_eq!(validation.reasoned_steps, 0);
    }

    #[test]
    fn test_record_roundtrip() {
        let mut chain = ChainTracker::new("task");
        chain.add_step("a", Some("search".to_string()), Some("found".to_string()), 0.25);
        chain.add_thought("b");
        chain.complete();

        let record = chain.to_record();
        let restored: ChainTracker = serde_json::from_value(record.clone()).unwrap();
        assert_eq!(restored, chain);
        assert_eq!(restored.to_record(), record);
    }
}

#[cfg(test)]
mod tree_tests {
    use super::*;
    #[allow(unused_imports)]
    use pretty_assertions::assert_eq;

    #[test]
    fn test_branch_limit_never_exceeded() {
        let mut tree = TreeExplorer::new("task", 4, 10);
        let mut created = 0;
        for i in 0..10 {
            let result = tree.create_branch(format!("idea {}", i), None).is_some();
            assert_eq!(result, i < 4, "call {}", i);
            if result {
                created += 1;
            }
            assert!(tree.branches().len() <= 4);
        }
        assert_eq!(created, 4);
        assert!(!tree.has_capacity());
    }

    #[test]
    fn test_depth_limit_never_exceeded() {
        let mut tree = TreeExplorer::new("task", 50, 3);
        let mut parent: Option<String> = None;
        for i in 0..6 {
            let created = tree
                .create_branch(format!("level {}", i), parent.as_deref())
                .map(|b| b.branch_id.clone());
            assert_eq!(created.is_some(), i < 3, "level {}", i);
            if created.is_some() {
                parent = created;
            }
        }

        assert_eq!(tree.branches().len(), 3);
        assert!(tree.branches().iter().all(|b| b.depth < 3));
        assert_eq!(tree.max_depth_reached(), 2);
    }

    #[test]
    fn test_selection_picks_highest_score() {
        let mut tree = TreeExplorer::new("task", 10, 3);
        for (i, score) in [0.75, 0.85, 0.70, 0.90, 0.88].into_iter().enumerate() {
            tree.create_branch(format!("approach {}", i), None)
                .unwrap()
                .evaluate(score);
        }

        let selected = tree.select_best_branch().unwrap();
        assert_eq!(selected.score, 0.90);
        assert_eq!(selected.thought, "approach 3");

        let statuses: Vec<BranchStatus> = tree.branches().iter().map(|b| b.status).collect();
        assert_eq!(
            statuses,
            vec![
                BranchStatus::Rejected,
                BranchStatus::Rejected,
                BranchStatus::Rejected,
                BranchStatus::Selected,
                BranchStatus::Rejected,
            ]
        );
    }

    #[test]
    fn test_selected_path_root_to_leaf() {
        let mut tree = TreeExplorer::new("task", 10, 4);
        let root = tree.create_branch("root", None).unwrap().branch_id.clone();
        tree.create_branch("sibling", None).unwrap().evaluate(0.1);
        let mid = tree.create_branch("mid", Some(root.as_str())).unwrap().branch_id.clone();
        tree.create_branch("leaf", Some(mid.as_str())).unwrap().evaluate(0.95);
        tree.get_branch_mut(&root).unwrap().evaluate(0.5);
        tree.get_branch_mut(&mid).unwrap().evaluate(0.6);

        tree.select_best_branch().unwrap();

        let path: Vec<&str> = tree
            .get_selected_path()
            .iter()
            .map(|b| b.thought.as_str())
            .collect();
        assert_eq!(path, vec!["root", "mid", "leaf"]);

        let path = tree.get_selected_path();
        for pair in path.windows(2) {
            assert_eq!(pair[1].parent_id.as_deref(), Some(pair[0].branch_id.as_str()));
            assert_eq!(pair[1].depth, pair[0].depth + 1);
        }
    }

    #[test]
    fn test_custom_scorer_and_failed_branches() {
        let mut tree = TreeExplorer::new("task", 5, 3);
        tree.create_branch("short", None);
        tree.create_branch("a much longer thought", None);
        tree.create_branch("doomed", None).unwrap().mark_failed();

        let by_length = |b: &ReasoningBranch| b.thought.len() as f64 / 100.0;
        let selected = tree.select_best_branch_with(&by_length).unwrap();
        assert_eq!(selected.thought, "a much longer thought");

        let doomed = tree.get_branch("branch_3").unwrap();
        assert_eq!(doomed.status, BranchStatus::Failed);
        assert_eq!(doomed.score, 0.0);
    }

    #[test]
    fn test_parse_then_explore() {
        let output = "Approach 1: Greedy\n\
                      Steps: take the largest coin first\n\
                      Pros: fast\n\
                      Cons: not always optimal\n\
                      Score: 6/10\n\
                      Approach 2: Dynamic programming\n\
                      Score: 90%\n\
                      Approach 3: Guess\n\
                      Score: ??";

        let candidates = extract_branches(output);
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[2].score, 0.5);

        let mut tree = TreeExplorer::new("Make change", 5, 3);
        for candidate in &candidates {
            tree.create_branch(candidate.approach.clone(), None)
                .unwrap()
                .evaluate(candidate.score);
        }
        let selected = tree.select_best_branch().unwrap();
        assert_eq!(selected.thought, "Dynamic programming");
    }

    #[test]
    fn test_record_roundtrip() {
        let mut tree = TreeExplorer::new("task", 5, 3);
        let root = tree.create_branch("root", None).unwrap();
        root.add_action("look", "saw");
        root.evaluate(0.25);
        tree.create_branch("child", Some("branch_1")).unwrap().evaluate(0.75);
        tree.select_best_branch();
        tree.complete();

        let record = tree.to_record();
        let restored: TreeExplorer = serde_json::from_value(record.clone()).unwrap();
        assert_eq!(restored, tree);
        assert_eq!(restored.selected_branch_id(), Some("branch_2"));
        assert_eq!(restored.to_record(), record);
    }
}
