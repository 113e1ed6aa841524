use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::types::{ChatRequest, ChatResponse, Completion, Message};
use super::LlmBackend;
use crate::config::{LlmConfig, RequestConfig};
use crate::error::{LlmError, LlmResult};

/// Client for OpenAI-compatible chat completion APIs
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    request_config: RequestConfig,
}

impl ChatClient {
    /// Create a new chat client
    pub fn new(config: &LlmConfig, request_config: RequestConfig) -> LlmResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(LlmError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            request_config,
        })
    }

    /// Send a chat completion request, retrying transient failures
    pub async fn chat(&self, request: ChatRequest) -> LlmResult<ChatResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut last_error = None;
        let mut retries = 0;

        while retries <= self.request_config.max_retries {
            if retries > 0 {
                let delay = Duration::from_millis(
                    self.request_config.retry_delay_ms * (2_u64.pow(retries - 1)),
                );
                warn!(
                    model = %request.model,
                    retry = retries,
                    delay_ms = delay.as_millis(),
                    "Retrying chat completion request"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();

            match self.execute_request(&url, &request).await {
                Ok(response) => {
                    info!(
                        model = %request.model,
                        latency_ms = start.elapsed().as_millis(),
                        "Chat completion succeeded"
                    );
                    return Ok(response);
                }
                Err(e) if !is_retryable(&e) => {
                    error!(
                        model = %request.model,
                        error = %e,
                        "Chat completion failed permanently"
                    );
                    return Err(e);
                }
                Err(e) => {
                    error!(
                        model = %request.model,
                        error = %e,
                        latency_ms = start.elapsed().as_millis(),
                        retry = retries,
                        "Chat completion failed"
                    );
                    last_error = Some(e);
                    retries += 1;
                }
            }
        }

        Err(LlmError::Unavailable {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
            retries,
        })
    }

    async fn execute_request(&self, url: &str, request: &ChatRequest) -> LlmResult<ChatResponse> {
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            temperature = request.temperature,
            max_tokens = request.max_tokens,
            "Calling chat completions"
        );

        let mut builder = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout {
                    timeout_ms: self.request_config.timeout_ms,
                }
            } else {
                LlmError::Http(e)
            }
        })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let chat_response: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse {
                    message: format!("Failed to parse response: {}", e),
                })?;

        if chat_response.choices.is_empty() {
            return Err(LlmError::InvalidResponse {
                message: "Response contained no choices".to_string(),
            });
        }

        Ok(chat_response)
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Model name sent with each request
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmBackend for ChatClient {
    async fn invoke(
        &self,
        prompt: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> LlmResult<Completion> {
        let request = ChatRequest::new(&self.model, vec![Message::user(prompt)])
            .with_temperature(temperature)
            .with_max_tokens(max_tokens);

        let response = self.chat(request).await?;
        let usage = response.usage;
        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(Completion { text, usage })
    }
}

/// Client errors other than timeouts and rate limits will not succeed on retry.
fn is_retryable(err: &LlmError) -> bool {
    match err {
        LlmError::Api { status, .. } => !(400..500).contains(status) || matches!(status, 408 | 429),
        LlmError::InvalidResponse { .. } => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> LlmConfig {
        LlmConfig {
            api_key: Some("test_key".to_string()),
            base_url: "https://api.example.com/v1/".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 2000,
        }
    }

    #[test]
    fn test_client_creation() {
        let client = ChatClient::new(&test_config(), RequestConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ChatClient::new(&test_config(), RequestConfig::default()).unwrap();
        assert_eq!(client.base_url(), "https://api.example.com/v1");
        assert_eq!(client.model(), "gpt-4o-mini");
    }

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable(&LlmError::Api {
            status: 500,
            message: String::new()
        }));
        assert!(is_retryable(&LlmError::Api {
            status: 429,
            message: String::new()
        }));
        assert!(is_retryable(&LlmError::Api {
            status: 408,
            message: String::new()
        }));
        assert!(is_retryable(&LlmError::Timeout { timeout_ms: 10 }));
    }

    #[test]
    fn test_non_retryable_errors() {
        assert!(!is_retryable(&LlmError::Api {
            status: 401,
            message: String::new()
        }));
        assert!(!is_retryable(&LlmError::Api {
            status: 404,
            message: String::new()
        }));
        assert!(!is_retryable(&LlmError::InvalidResponse {
            message: String::new()
        }));
    }
}
