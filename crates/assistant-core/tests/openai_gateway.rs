use std::collections::VecDeque;
use std::sync::Arc;

use assistant_core::llm::{
    ChatMessage, LlmGateway, LlmGatewayError, LlmGatewayRequest, OpenAiGateway,
    OpenAiGatewayConfig, SYSTEM_PROMPT,
};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;

/// Scripted chat-completions endpoint. Replies are served in order; once they
/// run out every request gets a 500.
#[derive(Clone, Default)]
struct ProviderScript {
    replies: Arc<Mutex<VecDeque<(StatusCode, Value)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

#[derive(Debug, Clone)]
struct RecordedRequest {
    authorization: Option<String>,
    body: Value,
}

impl ProviderScript {
    fn new(replies: Vec<(StatusCode, Value)>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            requests: Arc::default(),
        }
    }

    async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }

    async fn models(&self) -> Vec<String> {
        self.requests()
            .await
            .iter()
            .filter_map(|request| request.body["model"].as_str().map(str::to_string))
            .collect()
    }
}

struct MockProvider {
    url: String,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl MockProvider {
    async fn start(script: ProviderScript) -> Self {
        let app = Router::new()
            .route("/v1/chat/completions", post(chat_completions))
            .with_state(script);
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock provider");
        let addr = listener.local_addr().expect("mock provider address");
        let (stop, stopped) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = stopped.await;
                })
                .await
                .expect("mock provider runs");
        });

        Self {
            url: format!("http://{addr}/v1/chat/completions"),
            stop,
            task,
        }
    }

    fn gateway(&self, max_retries: u32) -> OpenAiGateway {
        OpenAiGateway::new(config_for(self.url.clone(), max_retries)).expect("gateway builds")
    }

    async fn stop(self) {
        self.stop.send(()).expect("stop signal sent");
        self.task.await.expect("mock provider joins");
    }
}

async fn chat_completions(
    State(script): State<ProviderScript>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    script
        .requests
        .lock()
        .await
        .push(RecordedRequest { authorization, body });

    let (status, body) = script.replies.lock().await.pop_front().unwrap_or_else(|| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_body("script_exhausted"),
        )
    });
    (status, Json(body))
}

#[tokio::test]
async fn sends_chat_request_and_parses_content() {
    let script = ProviderScript::new(vec![(
        StatusCode::OK,
        completion_body("gpt-4-0613", "Добрый вечер."),
    )]);
    let provider = MockProvider::start(script.clone()).await;

    let response = provider
        .gateway(1)
        .generate(greeting_request())
        .await
        .expect("request should succeed");
    provider.stop().await;

    assert_eq!(response.content, "Добрый вечер.");
    assert_eq!(response.model, "gpt-4-0613");
    assert_eq!(response.provider_request_id.as_deref(), Some("chatcmpl-1"));
    assert_eq!(response.usage.map(|usage| usage.total_tokens), Some(20));

    let requests = script.requests().await;
    assert_eq!(requests.len(), 1);
    let body = &requests[0].body;
    assert_eq!(body["model"], "gpt-4");
    assert_eq!(body["max_tokens"], 150);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["role"], "user");
    assert_eq!(body["messages"][1]["content"], "добрый вечер");
    assert_eq!(
        requests[0].authorization.as_deref(),
        Some("Bearer test-openai-key")
    );
}

#[tokio::test]
async fn retries_transient_failures_before_succeeding() {
    let script = ProviderScript::new(vec![
        (StatusCode::TOO_MANY_REQUESTS, error_body("rate_limit_exceeded")),
        (StatusCode::BAD_GATEWAY, error_body("upstream_gateway")),
        (StatusCode::OK, completion_body("gpt-4", "Готово.")),
    ]);
    let provider = MockProvider::start(script.clone()).await;

    let response = provider
        .gateway(2)
        .generate(greeting_request())
        .await
        .expect("request should succeed after retries");
    provider.stop().await;

    assert_eq!(response.content, "Готово.");
    assert_eq!(script.models().await, vec!["gpt-4", "gpt-4", "gpt-4"]);
}

#[tokio::test]
async fn falls_back_to_secondary_model_after_retries_exhausted() {
    let script = ProviderScript::new(vec![
        (StatusCode::SERVICE_UNAVAILABLE, error_body("capacity")),
        (StatusCode::SERVICE_UNAVAILABLE, error_body("capacity")),
        (StatusCode::OK, completion_body("gpt-4o-mini", "Запасной ответ.")),
    ]);
    let provider = MockProvider::start(script.clone()).await;

    let response = provider
        .gateway(1)
        .generate(greeting_request())
        .await
        .expect("fallback model should answer");
    provider.stop().await;

    assert_eq!(response.model, "gpt-4o-mini");
    assert_eq!(script.models().await, vec!["gpt-4", "gpt-4", "gpt-4o-mini"]);
}

#[tokio::test]
async fn rejected_key_is_not_retried_or_sent_to_fallback() {
    let script = ProviderScript::new(vec![(
        StatusCode::UNAUTHORIZED,
        error_body("invalid_api_key"),
    )]);
    let provider = MockProvider::start(script.clone()).await;

    let err = provider
        .gateway(1)
        .generate(greeting_request())
        .await
        .expect_err("unauthorized should fail immediately");
    provider.stop().await;

    assert!(
        matches!(err, LlmGatewayError::ProviderFailure(ref message) if message.contains("status=401") && message.contains("invalid_api_key")),
        "unexpected error: {err:?}"
    );
    assert_eq!(script.models().await, vec!["gpt-4"]);
}

#[tokio::test]
async fn null_content_is_an_invalid_payload() {
    let script = ProviderScript::new(vec![(
        StatusCode::OK,
        json!({
            "id": "chatcmpl-empty",
            "choices": [{ "message": { "content": null } }]
        }),
    )]);
    let provider = MockProvider::start(script.clone()).await;

    let mut config = config_for(provider.url.clone(), 0);
    config.fallback_model = None;
    let err = OpenAiGateway::new(config)
        .expect("gateway builds")
        .generate(greeting_request())
        .await
        .expect_err("missing content should fail");
    provider.stop().await;

    assert!(
        matches!(err, LlmGatewayError::InvalidProviderPayload(ref code) if code == "missing_message_content"),
        "unexpected error: {err:?}"
    );
    assert_eq!(script.requests().await.len(), 1);
}

fn greeting_request() -> LlmGatewayRequest {
    LlmGatewayRequest {
        model: "gpt-4".to_string(),
        messages: vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user("добрый вечер"),
        ],
        max_tokens: 150,
    }
}

fn config_for(chat_completions_url: String, max_retries: u32) -> OpenAiGatewayConfig {
    OpenAiGatewayConfig {
        chat_completions_url,
        api_key: "test-openai-key".to_string(),
        timeout_ms: 5_000,
        max_retries,
        retry_base_backoff_ms: 0,
        fallback_model: Some("gpt-4o-mini".to_string()),
    }
}

fn completion_body(model: &str, content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "model": model,
        "choices": [{ "message": { "role": "assistant", "content": content } }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 8, "total_tokens": 20 }
    })
}

fn error_body(code: &str) -> Value {
    json!({ "error": { "code": code } })
}
