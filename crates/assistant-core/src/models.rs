use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IntentCategory {
    SystemCommands,
    AppCommands,
    SearchCommands,
    ExitCommands,
    WebSearch,
    Personal,
    Ai,
    /// Category key from the trigger configuration that has no handler.
    Unrecognized(String),
}

impl IntentCategory {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "system_commands" => Self::SystemCommands,
            "app_commands" => Self::AppCommands,
            "search_commands" => Self::SearchCommands,
            "exit_commands" => Self::ExitCommands,
            "web_search" => Self::WebSearch,
            "personal" => Self::Personal,
            "ai" => Self::Ai,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::SystemCommands => "system_commands",
            Self::AppCommands => "app_commands",
            Self::SearchCommands => "search_commands",
            Self::ExitCommands => "exit_commands",
            Self::WebSearch => "web_search",
            Self::Personal => "personal",
            Self::Ai => "ai",
            Self::Unrecognized(value) => value.as_str(),
        }
    }
}

impl From<String> for IntentCategory {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<IntentCategory> for String {
    fn from(value: IntentCategory) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IntentAction {
    Shutdown,
    CancelShutdown,
    Restart,
    TakeScreenshot,
    LockComputer,
    OpenApplication,
    CloseApplication,
    Search,
    SearchRecipe,
    SearchVideo,
    Exit,
    ParseIntent,
    Response,
    Process,
    Unrecognized(String),
}

impl IntentAction {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "shutdown" => Self::Shutdown,
            "cancel_shutdown" => Self::CancelShutdown,
            "restart" => Self::Restart,
            "take_screenshot" => Self::TakeScreenshot,
            "lock_computer" => Self::LockComputer,
            "open_application" => Self::OpenApplication,
            "close_application" => Self::CloseApplication,
            "search" => Self::Search,
            "search_recipe" => Self::SearchRecipe,
            "search_video" => Self::SearchVideo,
            "exit" => Self::Exit,
            "parse_intent" => Self::ParseIntent,
            "response" => Self::Response,
            "process" => Self::Process,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Shutdown => "shutdown",
            Self::CancelShutdown => "cancel_shutdown",
            Self::Restart => "restart",
            Self::TakeScreenshot => "take_screenshot",
            Self::LockComputer => "lock_computer",
            Self::OpenApplication => "open_application",
            Self::CloseApplication => "close_application",
            Self::Search => "search",
            Self::SearchRecipe => "search_recipe",
            Self::SearchVideo => "search_video",
            Self::Exit => "exit",
            Self::ParseIntent => "parse_intent",
            Self::Response => "response",
            Self::Process => "process",
            Self::Unrecognized(value) => value.as_str(),
        }
    }
}

impl From<String> for IntentAction {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<IntentAction> for String {
    fn from(value: IntentAction) -> Self {
        value.as_str().to_string()
    }
}

/// Outcome of routing a single utterance. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentMatch {
    pub category: IntentCategory,
    pub action: IntentAction,
    pub parameters: String,
}

impl IntentMatch {
    pub fn new(category: IntentCategory, action: IntentAction, parameters: impl Into<String>) -> Self {
        Self {
            category,
            action,
            parameters: parameters.into(),
        }
    }
}
