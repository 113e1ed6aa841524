//! LLM capability used by the runner.
//!
//! The reasoning core never talks to a model itself. [`LlmBackend`] is the
//! opaque `invoke(prompt, temperature, max_tokens)` seam; [`ChatClient`] is the
//! production implementation against any OpenAI-compatible endpoint.

mod client;
mod types;

pub use client::*;
pub use types::*;

use async_trait::async_trait;

use crate::error::LlmResult;

/// Single-prompt text completion.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Complete `prompt` with the given sampling temperature and token cap.
    async fn invoke(&self, prompt: &str, temperature: f64, max_tokens: u32)
        -> LlmResult<Completion>;
}
