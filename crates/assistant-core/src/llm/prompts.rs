use crate::memory::ConversationTurn;

use super::gateway::ChatMessage;

pub const SYSTEM_PROMPT: &str = "Вы - Джарвис, персональный ИИ-ассистент. Вы работаете на компьютере пользователя. Отвечайте кратко и по делу.";

/// Turns of history replayed to the model.
pub const PROMPT_HISTORY_TURNS: usize = 5;

/// System instruction, then one user and one assistant entry per remembered
/// turn (oldest first), then the new user text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerativePrompt {
    messages: Vec<ChatMessage>,
}

impl GenerativePrompt {
    pub fn build(history: &[ConversationTurn], user_text: &str) -> Self {
        let start = history.len().saturating_sub(PROMPT_HISTORY_TURNS);
        let recent = &history[start..];

        let mut messages = Vec::with_capacity(recent.len() * 2 + 2);
        messages.push(ChatMessage::system(SYSTEM_PROMPT));
        for turn in recent {
            messages.push(ChatMessage::user(turn.user_text.as_str()));
            messages.push(ChatMessage::assistant(turn.assistant_text.as_str()));
        }
        messages.push(ChatMessage::user(user_text));

        Self { messages }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{GenerativePrompt, SYSTEM_PROMPT};
    use crate::llm::gateway::{ChatMessage, ChatRole};
    use crate::memory::ConversationTurn;

    fn turn(index: usize) -> ConversationTurn {
        ConversationTurn {
            timestamp: Utc::now(),
            user_text: format!("u{index}"),
            assistant_text: format!("a{index}"),
        }
    }

    #[test]
    fn empty_history_yields_system_and_user_only() {
        let prompt = GenerativePrompt::build(&[], "привет");
        assert_eq!(
            prompt.messages(),
            &[ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user("привет")]
        );
    }

    #[test]
    fn replays_only_last_five_turns_oldest_first() {
        let history: Vec<ConversationTurn> = (0..8).map(turn).collect();
        let prompt = GenerativePrompt::build(&history, "новый вопрос");
        let messages = prompt.into_messages();

        assert_eq!(messages.len(), 1 + 5 * 2 + 1);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[1], ChatMessage::user("u3"));
        assert_eq!(messages[2], ChatMessage::assistant("a3"));
        assert_eq!(messages[9], ChatMessage::user("u7"));
        assert_eq!(messages[10], ChatMessage::assistant("a7"));
        assert_eq!(messages[11], ChatMessage::user("новый вопрос"));
    }
}
