use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Strategy catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Errors raised while assembling a strategy catalog.
///
/// These only occur at startup; lookups against a built catalog never fail.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Missing policy for strategy: {name}")]
    MissingStrategy { name: String },

    #[error("Duplicate policy for strategy: {name}")]
    DuplicateStrategy { name: String },

    #[error("Invalid policy for {name}: {reason}")]
    InvalidPolicy { name: String, reason: String },
}

/// LLM backend errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for catalog construction
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Result type alias for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;
