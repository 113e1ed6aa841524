//! Config environment variable tests
//!
//! These tests verify that Config::from_env() correctly reads and applies
//! environment variable overrides. Config::from_env() also loads a .env file
//! via dotenvy when present, so each test sets exactly what it asserts on and
//! removes it afterwards.
//!
//! Tests use #[serial] to prevent race conditions with shared env vars.

use adaptive_reasoning::config::{Config, LogFormat};
use adaptive_reasoning::error::AppError;
use adaptive_reasoning::reasoning::StrategyName;
use serial_test::serial;
use std::env;

#[test]
#[serial]
fn test_config_from_env_loads_without_api_key() {
    env::remove_var("LLM_API_KEY");

    let config = Config::from_env().unwrap();
    assert!(config.llm.api_key.is_none());
}

#[test]
#[serial]
fn test_config_from_env_llm_settings() {
    env::set_var("LLM_API_KEY", "sk-test");
    env::set_var("LLM_BASE_URL", "http://localhost:11434/v1");
    env::set_var("LLM_MODEL", "llama3");
    env::set_var("LLM_MAX_TOKENS", "1024");

    let config = Config::from_env().unwrap();
    assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
    assert_eq!(config.llm.base_url, "http://localhost:11434/v1");
    assert_eq!(config.llm.model, "llama3");
    assert_eq!(config.llm.max_tokens, 1024);

    env::remove_var("LLM_API_KEY");
    env::remove_var("LLM_BASE_URL");
    env::remove_var("LLM_MODEL");
    env::remove_var("LLM_MAX_TOKENS");
}

#[test]
#[serial]
fn test_config_from_env_blank_api_key_is_none() {
    env::set_var("LLM_API_KEY", "   ");

    let config = Config::from_env().unwrap();
    assert!(config.llm.api_key.is_none());

    env::remove_var("LLM_API_KEY");
}

#[test]
#[serial]
fn test_config_from_env_json_log_format() {
    env::set_var("LOG_FORMAT", "json");

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.format, LogFormat::Json);

    // Restore default
    env::set_var("LOG_FORMAT", "pretty");
}

#[test]
#[serial]
fn test_config_from_env_custom_request() {
    env::set_var("REQUEST_TIMEOUT_MS", "60000");
    env::set_var("MAX_RETRIES", "5");
    env::set_var("RETRY_DELAY_MS", "2000");

    let config = Config::from_env().unwrap();
    assert_eq!(config.request.timeout_ms, 60000);
    assert_eq!(config.request.max_retries, 5);
    assert_eq!(config.request.retry_delay_ms, 2000);

    // Restore defaults
    env::set_var("REQUEST_TIMEOUT_MS", "30000");
    env::set_var("MAX_RETRIES", "3");
    env::set_var("RETRY_DELAY_MS", "1000");
}

#[test]
#[serial]
fn test_config_from_env_reasoning_limits() {
    env::set_var("MAX_ESCALATIONS", "1");
    env::set_var("TREE_MAX_BRANCHES", "8");
    env::set_var("TREE_MAX_DEPTH", "4");
    env::set_var("COT_MIN_STEPS", "3");

    let config = Config::from_env().unwrap();
    assert_eq!(config.reasoning.max_escalations, 1);
    assert_eq!(config.reasoning.tree_max_branches, 8);
    assert_eq!(config.reasoning.tree_max_depth, 4);
    assert_eq!(config.reasoning.cot_min_steps, 3);

    env::remove_var("MAX_ESCALATIONS");
    env::remove_var("TREE_MAX_BRANCHES");
    env::remove_var("TREE_MAX_DEPTH");
    env::remove_var("COT_MIN_STEPS");
}

#[test]
#[serial]
fn test_config_from_env_invalid_numbers_fall_back() {
    env::set_var("MAX_ESCALATIONS", "many");
    env::set_var("REQUEST_TIMEOUT_MS", "soon");

    let config = Config::from_env().unwrap();
    assert_eq!(config.reasoning.max_escalations, 3);
    assert_eq!(config.request.timeout_ms, 30000);

    env::remove_var("MAX_ESCALATIONS");
    env::set_var("REQUEST_TIMEOUT_MS", "30000");
}

#[test]
#[serial]
fn test_config_from_env_strategy_override() {
    env::set_var("STRATEGY_DEEP_MAX_ITERATIONS", "12");
    env::set_var("STRATEGY_DEEP_TEMPERATURE", "0.4");

    let config = Config::from_env().unwrap();
    let deep = config.catalog.get(StrategyName::Deep);
    assert_eq!(deep.max_iterations, 12);
    assert_eq!(deep.temperature, 0.4);
    assert_eq!(deep.timeout_seconds, 300.0);

    env::remove_var("STRATEGY_DEEP_MAX_ITERATIONS");
    env::remove_var("STRATEGY_DEEP_TEMPERATURE");
}

#[test]
#[serial]
fn test_config_from_env_malformed_strategy_override_fails() {
    env::set_var("STRATEGY_FAST_TIMEOUT_SECS", "quick");

    let result = Config::from_env();
    assert!(matches!(result, Err(AppError::Config { .. })));

    env::remove_var("STRATEGY_FAST_TIMEOUT_SECS");
}

#[test]
#[serial]
fn test_config_from_env_out_of_range_strategy_override_fails() {
    env::set_var("STRATEGY_CREATIVE_TEMPERATURE", "1.8");

    let result = Config::from_env();
    assert!(matches!(result, Err(AppError::Catalog(_))));

    env::remove_var("STRATEGY_CREATIVE_TEMPERATURE");
}
