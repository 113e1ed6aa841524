use std::env;

use crate::error::{AppError, AppResult};
use crate::reasoning::{StrategyCatalog, StrategyName, StrategyOverride, DEFAULT_MAX_ESCALATIONS};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub reasoning: ReasoningConfig,
    /// Built-in strategies with any `STRATEGY_*` overrides applied.
    pub catalog: StrategyCatalog,
}

/// OpenAI-compatible endpoint configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Sent as a bearer token when present.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// Reasoning loop limits
#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningConfig {
    pub max_escalations: u32,
    pub tree_max_branches: usize,
    pub tree_max_depth: u32,
    pub cot_min_steps: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let llm = LlmConfig {
            api_key: env::var("LLM_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            base_url: env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            max_tokens: env::var("LLM_MAX_TOKENS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2000),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30000),
            max_retries: env::var("MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            retry_delay_ms: env::var("RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
        };

        let defaults = ReasoningConfig::default();
        let reasoning = ReasoningConfig {
            max_escalations: env::var("MAX_ESCALATIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_escalations),
            tree_max_branches: env::var("TREE_MAX_BRANCHES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.tree_max_branches),
            tree_max_depth: env::var("TREE_MAX_DEPTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.tree_max_depth),
            cot_min_steps: env::var("COT_MIN_STEPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.cot_min_steps),
        };

        let overrides = strategy_overrides(|key| env::var(key).ok())?;
        let catalog = StrategyCatalog::builtin().with_overrides(&overrides)?;

        Ok(Config {
            llm,
            logging,
            request,
            reasoning,
            catalog,
        })
    }
}

/// Read `STRATEGY_<NAME>_{MAX_ITERATIONS,TEMPERATURE,TIMEOUT_SECS}` overrides.
///
/// Unlike the other settings, a value that does not parse is an error rather
/// than a silent fallback.
pub fn strategy_overrides(
    lookup: impl Fn(&str) -> Option<String>,
) -> AppResult<Vec<StrategyOverride>> {
    let mut overrides = Vec::new();

    for name in StrategyName::ALL {
        let prefix = format!("STRATEGY_{}", name.as_str().to_uppercase());
        let ov = StrategyOverride {
            max_iterations: parse_override(&lookup, &format!("{}_MAX_ITERATIONS", prefix))?,
            temperature: parse_override(&lookup, &format!("{}_TEMPERATURE", prefix))?,
            timeout_seconds: parse_override(&lookup, &format!("{}_TIMEOUT_SECS", prefix))?,
            ..StrategyOverride::new(name)
        };
        if !ov.is_empty() {
            overrides.push(ov);
        }
    }

    Ok(overrides)
}

fn parse_override<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> AppResult<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| AppError::Config {
            message: format!("{} has invalid value '{}'", key, raw),
        }),
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            max_escalations: DEFAULT_MAX_ESCALATIONS,
            tree_max_branches: 5,
            tree_max_depth: 3,
            cot_min_steps: 2,
        }
    }
}
