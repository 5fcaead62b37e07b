use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::config::AiSettings;
use crate::llm::{
    GenerativePrompt, LlmGateway, LlmGatewayRequest, OpenAiConfigError, OpenAiGateway,
    OpenAiGatewayConfig, PROMPT_HISTORY_TURNS,
};
use crate::memory::ConversationMemory;
use crate::telemetry::LogContext;

pub const MISSING_API_KEY_REPLY: &str =
    "API ключ не настроен. Пожалуйста, добавьте ключ API в настройках.";
pub const APOLOGY_REPLY: &str = "Извините, у меня возникла проблема при обработке вашего запроса.";

/// Answers whatever no matcher claimed by asking the completion service.
pub struct GenerativeFallback {
    gateway: Option<Arc<dyn LlmGateway>>,
    model: String,
    max_tokens: u32,
    log: LogContext,
}

impl GenerativeFallback {
    pub fn new(
        gateway: Option<Arc<dyn LlmGateway>>,
        model: impl Into<String>,
        max_tokens: u32,
        log: LogContext,
    ) -> Self {
        Self {
            gateway,
            model: model.into(),
            max_tokens,
            log,
        }
    }

    /// Builds the OpenAI-backed fallback. A missing key leaves the fallback
    /// without a gateway; any other configuration problem is returned.
    pub fn from_settings(settings: &AiSettings, log: LogContext) -> Result<Self, OpenAiConfigError> {
        let gateway = match OpenAiGatewayConfig::from_settings(settings) {
            Ok(config) => Some(Arc::new(OpenAiGateway::new(config)?) as Arc<dyn LlmGateway>),
            Err(OpenAiConfigError::MissingApiKey) => {
                warn!(parent: log.span(), "no API key configured; generative answers disabled");
                None
            }
            Err(err) => return Err(err),
        };

        info!(parent: log.span(), model = %settings.model, "generative fallback ready");
        Ok(Self::new(gateway, settings.model.clone(), settings.max_tokens, log))
    }

    pub fn is_configured(&self) -> bool {
        self.gateway.is_some()
    }

    pub async fn process(&self, memory: &mut ConversationMemory, input: &str) -> String {
        self.process_at(memory, input, Utc::now()).await
    }

    pub async fn process_at(
        &self,
        memory: &mut ConversationMemory,
        input: &str,
        now: DateTime<Utc>,
    ) -> String {
        let Some(gateway) = self.gateway.as_ref() else {
            return MISSING_API_KEY_REPLY.to_string();
        };

        let prompt = GenerativePrompt::build(memory.recent_turns(PROMPT_HISTORY_TURNS), input);
        let request = LlmGatewayRequest {
            model: self.model.clone(),
            messages: prompt.into_messages(),
            max_tokens: self.max_tokens,
        };

        match gateway.generate(request).await {
            Ok(response) => {
                info!(
                    parent: self.log.span(),
                    model = %response.model,
                    request_id = response.provider_request_id.as_deref().unwrap_or("-"),
                    "completion received"
                );
                if let Err(err) = memory.add_to_conversation(input, &response.content, now) {
                    error!(parent: self.log.span(), error = %err, "failed to persist conversation turn");
                }
                response.content
            }
            Err(err) => {
                error!(parent: self.log.span(), error = %err, "completion request failed");
                APOLOGY_REPLY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::Utc;

    use super::{APOLOGY_REPLY, GenerativeFallback, MISSING_API_KEY_REPLY};
    use crate::llm::{
        ChatMessage, LlmGateway, LlmGatewayError, LlmGatewayFuture, LlmGatewayRequest,
        LlmGatewayResponse, SYSTEM_PROMPT,
    };
    use crate::memory::ConversationMemory;
    use crate::telemetry::LogContext;

    struct ScriptedGateway {
        reply: Option<String>,
        requests: Mutex<Vec<LlmGatewayRequest>>,
    }

    impl LlmGateway for ScriptedGateway {
        fn generate<'a>(&'a self, request: LlmGatewayRequest) -> LlmGatewayFuture<'a> {
            Box::pin(async move {
                let model = request.model.clone();
                self.requests.lock().expect("lock").push(request);
                match self.reply.as_ref() {
                    Some(content) => Ok(LlmGatewayResponse {
                        model,
                        provider_request_id: None,
                        content: content.clone(),
                        usage: None,
                    }),
                    None => Err(LlmGatewayError::Timeout),
                }
            })
        }
    }

    fn scripted(reply: Option<&str>) -> Arc<ScriptedGateway> {
        Arc::new(ScriptedGateway {
            reply: reply.map(ToString::to_string),
            requests: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn missing_gateway_returns_instruction_without_touching_memory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut memory = ConversationMemory::load(dir.path(), LogContext::disabled());
        let fallback = GenerativeFallback::new(None, "gpt-4", 150, LogContext::disabled());

        let reply = fallback.process(&mut memory, "расскажи анекдот").await;

        assert_eq!(reply, MISSING_API_KEY_REPLY);
        assert!(memory.turns().is_empty());
        assert_eq!(memory.last_interaction(), None);
    }

    #[tokio::test]
    async fn successful_completion_is_remembered() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut memory = ConversationMemory::load(dir.path(), LogContext::disabled());
        let gateway = scripted(Some("Конечно."));
        let fallback = GenerativeFallback::new(
            Some(gateway.clone() as Arc<dyn LlmGateway>),
            "gpt-4",
            150,
            LogContext::disabled(),
        );

        let now = Utc::now();
        let reply = fallback.process_at(&mut memory, "ты тут?", now).await;

        assert_eq!(reply, "Конечно.");
        assert_eq!(memory.turns().len(), 1);
        assert_eq!(memory.turns()[0].user_text, "ты тут?");
        assert_eq!(memory.turns()[0].assistant_text, "Конечно.");

        let requests = gateway.requests.lock().expect("lock");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].max_tokens, 150);
        assert_eq!(
            requests[0].messages,
            vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user("ты тут?")]
        );
    }

    #[tokio::test]
    async fn provider_failure_returns_apology_and_keeps_memory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut memory = ConversationMemory::load(dir.path(), LogContext::disabled());
        let fallback = GenerativeFallback::new(
            Some(scripted(None) as Arc<dyn LlmGateway>),
            "gpt-4",
            150,
            LogContext::disabled(),
        );

        let reply = fallback.process(&mut memory, "вопрос").await;

        assert_eq!(reply, APOLOGY_REPLY);
        assert!(memory.turns().is_empty());
    }
}
