pub mod gateway;
pub mod openai;
pub mod prompts;

pub use gateway::{
    ChatMessage, ChatRole, LlmGateway, LlmGatewayError, LlmGatewayFuture, LlmGatewayRequest,
    LlmGatewayResponse, LlmTokenUsage,
};
pub use openai::{OpenAiConfigError, OpenAiGateway, OpenAiGatewayConfig};
pub use prompts::{GenerativePrompt, PROMPT_HISTORY_TURNS, SYSTEM_PROMPT};
