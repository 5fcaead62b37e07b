use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tokio::time::sleep;

use super::gateway::{
    LlmGateway, LlmGatewayError, LlmGatewayFuture, LlmGatewayRequest, LlmGatewayResponse,
    LlmTokenUsage,
};
use crate::config::AiSettings;

/// Connection settings for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiGatewayConfig {
    pub chat_completions_url: String,
    pub api_key: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_base_backoff_ms: u64,
    /// Tried once the requested model has exhausted its retries.
    pub fallback_model: Option<String>,
}

impl OpenAiGatewayConfig {
    pub fn from_settings(settings: &AiSettings) -> Result<Self, OpenAiConfigError> {
        let api_key = settings.api_key().ok_or(OpenAiConfigError::MissingApiKey)?;
        let url = settings.chat_completions_url.trim();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(OpenAiConfigError::InvalidConfiguration(format!(
                "chat_completions_url is not an http(s) url: {url}"
            )));
        }

        let fallback_model = settings
            .fallback_model
            .as_deref()
            .map(str::trim)
            .filter(|model| !model.is_empty());

        Ok(Self {
            chat_completions_url: url.to_string(),
            api_key: api_key.to_string(),
            timeout_ms: settings.timeout_ms,
            max_retries: settings.max_retries,
            retry_base_backoff_ms: settings.retry_base_backoff_ms,
            fallback_model: fallback_model.map(str::to_string),
        })
    }
}

#[derive(Debug, Error)]
pub enum OpenAiConfigError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to build http client: {0}")]
    HttpClient(String),
}

/// Chat-completions client with bounded retries and an optional fallback model.
///
/// Transient statuses (408, 429, 5xx gateway errors) and transport failures are
/// retried with exponential backoff. Credential rejections (401, 403) end the
/// request without trying the fallback model.
#[derive(Clone)]
pub struct OpenAiGateway {
    client: reqwest::Client,
    config: OpenAiGatewayConfig,
}

impl OpenAiGateway {
    pub fn new(config: OpenAiGatewayConfig) -> Result<Self, OpenAiConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| OpenAiConfigError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    fn models_to_try<'a>(&'a self, requested: &'a str) -> Vec<&'a str> {
        let mut models = vec![requested];
        if let Some(fallback) = self.config.fallback_model.as_deref()
            && fallback != requested
        {
            models.push(fallback);
        }
        models.retain(|model| !model.is_empty());
        models
    }

    fn backoff(&self, retry: u32) -> Duration {
        let factor = 2_u64.saturating_pow(retry);
        Duration::from_millis(self.config.retry_base_backoff_ms.saturating_mul(factor))
    }

    async fn complete_with_retries(
        &self,
        model: &str,
        request: &LlmGatewayRequest,
    ) -> Result<LlmGatewayResponse, AttemptFailure> {
        let mut retry = 0_u32;
        loop {
            let failure = match self.attempt(model, request).await {
                Ok(response) => return Ok(response),
                Err(failure) => failure,
            };

            if !failure.retryable || retry >= self.config.max_retries {
                return Err(failure);
            }
            sleep(self.backoff(retry)).await;
            retry += 1;
        }
    }

    async fn attempt(
        &self,
        model: &str,
        request: &LlmGatewayRequest,
    ) -> Result<LlmGatewayResponse, AttemptFailure> {
        let body = json!({
            "model": model,
            "messages": request.messages,
            "max_tokens": request.max_tokens,
        });

        let response = self
            .client
            .post(&self.config.chat_completions_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                AttemptFailure::transient(if err.is_timeout() {
                    LlmGatewayError::Timeout
                } else {
                    LlmGatewayError::ProviderFailure("request_unavailable".to_string())
                })
            })?;

        let status = response.status();
        let request_id = request_id(response.headers());
        let text = response
            .text()
            .await
            .map_err(|_| AttemptFailure::invalid_payload("response_body_read_failed"))?;

        if !status.is_success() {
            return Err(AttemptFailure::from_status(status, &text));
        }

        let completion: ChatCompletion = serde_json::from_str(&text)
            .map_err(|_| AttemptFailure::invalid_payload("response_json_parse_failed"))?;
        completion
            .into_response(model, request_id)
            .ok_or_else(|| AttemptFailure::invalid_payload("missing_message_content"))
    }
}

impl LlmGateway for OpenAiGateway {
    fn generate<'a>(&'a self, request: LlmGatewayRequest) -> LlmGatewayFuture<'a> {
        Box::pin(async move {
            let models = self.models_to_try(&request.model);
            let mut last_failure = None;

            for model in models {
                match self.complete_with_retries(model, &request).await {
                    Ok(response) => return Ok(response),
                    Err(failure) if failure.fallback_allowed => last_failure = Some(failure),
                    Err(failure) => return Err(failure.error),
                }
            }

            Err(last_failure.map_or_else(
                || LlmGatewayError::ProviderFailure("no_model_candidates".to_string()),
                |failure| failure.error,
            ))
        })
    }
}

#[derive(Debug)]
struct AttemptFailure {
    error: LlmGatewayError,
    retryable: bool,
    fallback_allowed: bool,
}

impl AttemptFailure {
    fn transient(error: LlmGatewayError) -> Self {
        Self {
            error,
            retryable: true,
            fallback_allowed: true,
        }
    }

    fn invalid_payload(code: &str) -> Self {
        Self {
            error: LlmGatewayError::InvalidProviderPayload(code.to_string()),
            retryable: false,
            fallback_allowed: true,
        }
    }

    fn from_status(status: StatusCode, body: &str) -> Self {
        let rejected_credentials =
            matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN);
        Self {
            error: LlmGatewayError::ProviderFailure(format!(
                "status={} code={}",
                status.as_u16(),
                provider_error_code(body)
            )),
            retryable: is_transient_status(status),
            fallback_allowed: !rejected_credentials,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    id: Option<String>,
    model: Option<String>,
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CompletionUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

impl ChatCompletion {
    /// `None` when the first choice carries no text.
    fn into_response(
        self,
        requested_model: &str,
        request_id: Option<String>,
    ) -> Option<LlmGatewayResponse> {
        let content = self
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())?;

        Some(LlmGatewayResponse {
            model: self.model.unwrap_or_else(|| requested_model.to_string()),
            provider_request_id: request_id.or(self.id),
            content,
            usage: self.usage.map(LlmTokenUsage::from),
        })
    }
}

impl From<CompletionUsage> for LlmTokenUsage {
    fn from(usage: CompletionUsage) -> Self {
        Self {
            prompt_tokens: saturating_u32(usage.prompt_tokens),
            completion_tokens: saturating_u32(usage.completion_tokens),
            total_tokens: saturating_u32(usage.total_tokens),
        }
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || matches!(status.as_u16(), 500 | 502 | 503 | 504)
}

fn request_id(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("x-request-id")?.to_str().ok()?;
    Some(value.to_string())
}

/// Machine-readable code from an `{"error": {"code", "type"}}` body.
fn provider_error_code(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<ErrorDetail>,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        code: Option<Value>,
        #[serde(rename = "type")]
        kind: Option<String>,
    }

    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error);

    match detail {
        Some(ErrorDetail {
            code: Some(Value::String(code)),
            ..
        }) => code,
        Some(ErrorDetail {
            code: Some(Value::Number(code)),
            ..
        }) => code.to_string(),
        Some(ErrorDetail {
            kind: Some(kind), ..
        }) => kind,
        _ => "unknown".to_string(),
    }
}

fn saturating_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
