//! # Adaptive Reasoning
//!
//! An adaptive reasoning-strategy controller for LLM agent loops. The core
//! selects how deeply an agent should reason (iteration budget, temperature,
//! timeout), monitors progress signals reported by the caller, and escalates
//! to deeper strategies when the current one stalls.
//!
//! ## Features
//!
//! - **Strategy Catalog**: Seven named reasoning policies, overridable from configuration
//! - **Adaptive Controller**: Complexity-based start plus bounded, logged escalation
//! - **Chain-of-Thought Tracking**: Ordered step log with output scraping and validation
//! - **Tree-of-Thought Exploration**: Bounded branch tree with pluggable scoring
//! - **Runner**: Drives the controller against any OpenAI-compatible endpoint
//!
//! ## Architecture
//!
//! ```text
//! CLI → ReasoningRunner → LlmBackend (HTTP)
//!            ↓
//!   AdaptiveController ⇄ StrategyCatalog
//!   ChainTracker / TreeExplorer
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use adaptive_reasoning::{Config, ReasoningRunner, RunnerSettings};
//! use adaptive_reasoning::llm::ChatClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let client = ChatClient::new(&config.llm, config.request.clone())?;
//!     let settings = RunnerSettings::from_config(&config);
//!     let runner = ReasoningRunner::new(Arc::new(client), Arc::new(config.catalog), settings);
//!     let outcome = runner.run("Compare three sorting algorithms").await;
//!     println!("{}", outcome.summary());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Configuration management loaded from the environment.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// LLM capability trait and OpenAI-compatible client.
pub mod llm;
/// Prompt templates for each reasoning mode.
pub mod prompts;
/// Strategy catalog, adaptive controller, and chain/tree trackers.
pub mod reasoning;
/// Agent execution loop driving the controller against an LLM.
pub mod runner;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use reasoning::{AdaptiveController, StrategyCatalog, StrategyName};
pub use runner::{ReasoningRunner, RunOutcome, RunnerSettings};
