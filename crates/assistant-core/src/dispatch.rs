use crate::models::{IntentAction, IntentCategory, IntentMatch};
use crate::system::SystemAction;
use crate::web_search::SearchKind;

/// Handler selected for a resolved intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    System(SystemAction),
    OpenApplication { name: String },
    CloseApplication { name: String },
    Search { kind: SearchKind, query: String },
    /// Re-run the search-intent parser on this text and open the result.
    SearchIntent { text: String },
    Reply(String),
    Exit,
    /// No dedicated handler; answer generatively from the original utterance.
    Generative,
}

impl Dispatch {
    pub fn from_intent(intent: &IntentMatch) -> Self {
        let parameters = intent.parameters.clone();

        match (&intent.category, &intent.action) {
            (IntentCategory::SystemCommands, action) => match system_action(action) {
                Some(action) => Self::System(action),
                None => Self::Generative,
            },
            (IntentCategory::AppCommands, IntentAction::OpenApplication) => {
                Self::OpenApplication { name: parameters }
            }
            (IntentCategory::AppCommands, IntentAction::CloseApplication) => {
                Self::CloseApplication { name: parameters }
            }
            (IntentCategory::SearchCommands, IntentAction::Search) => Self::Search {
                kind: SearchKind::General,
                query: parameters,
            },
            (IntentCategory::SearchCommands, IntentAction::SearchRecipe) => Self::Search {
                kind: SearchKind::Recipe,
                query: parameters,
            },
            (IntentCategory::SearchCommands, IntentAction::SearchVideo) => Self::Search {
                kind: SearchKind::Video,
                query: parameters,
            },
            (IntentCategory::ExitCommands, _) => Self::Exit,
            (IntentCategory::WebSearch, IntentAction::ParseIntent) => {
                Self::SearchIntent { text: parameters }
            }
            (IntentCategory::Personal, IntentAction::Response) => Self::Reply(parameters),
            (
                IntentCategory::AppCommands
                | IntentCategory::SearchCommands
                | IntentCategory::WebSearch
                | IntentCategory::Personal
                | IntentCategory::Ai
                | IntentCategory::Unrecognized(_),
                _,
            ) => Self::Generative,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::System(_) => "system",
            Self::OpenApplication { .. } => "open_application",
            Self::CloseApplication { .. } => "close_application",
            Self::Search { .. } => "search",
            Self::SearchIntent { .. } => "search_intent",
            Self::Reply(_) => "reply",
            Self::Exit => "exit",
            Self::Generative => "generative",
        }
    }
}

fn system_action(action: &IntentAction) -> Option<SystemAction> {
    match action {
        IntentAction::Shutdown => Some(SystemAction::Shutdown),
        IntentAction::CancelShutdown => Some(SystemAction::CancelShutdown),
        IntentAction::Restart => Some(SystemAction::Restart),
        IntentAction::TakeScreenshot => Some(SystemAction::TakeScreenshot),
        IntentAction::LockComputer => Some(SystemAction::LockComputer),
        IntentAction::OpenApplication
        | IntentAction::CloseApplication
        | IntentAction::Search
        | IntentAction::SearchRecipe
        | IntentAction::SearchVideo
        | IntentAction::Exit
        | IntentAction::ParseIntent
        | IntentAction::Response
        | IntentAction::Process
        | IntentAction::Unrecognized(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::Dispatch;
    use crate::models::{IntentAction, IntentCategory, IntentMatch};
    use crate::system::SystemAction;
    use crate::web_search::SearchKind;

    fn dispatch(category: &str, action: &str, parameters: &str) -> Dispatch {
        Dispatch::from_intent(&IntentMatch::new(
            IntentCategory::parse(category),
            IntentAction::parse(action),
            parameters,
        ))
    }

    #[test]
    fn configured_categories_map_to_handlers() {
        assert_eq!(
            dispatch("system_commands", "take_screenshot", ""),
            Dispatch::System(SystemAction::TakeScreenshot)
        );
        assert_eq!(
            dispatch("app_commands", "open_application", "блокнот"),
            Dispatch::OpenApplication {
                name: "блокнот".to_string()
            }
        );
        assert_eq!(
            dispatch("search_commands", "search_video", "коты"),
            Dispatch::Search {
                kind: SearchKind::Video,
                query: "коты".to_string()
            }
        );
        assert_eq!(dispatch("exit_commands", "anything", ""), Dispatch::Exit);
    }

    #[test]
    fn parser_results_map_to_handlers() {
        assert_eq!(
            dispatch("web_search", "parse_intent", "найди котов"),
            Dispatch::SearchIntent {
                text: "найди котов".to_string()
            }
        );
        assert_eq!(
            dispatch("personal", "response", "Сейчас 1 час 5 минут"),
            Dispatch::Reply("Сейчас 1 час 5 минут".to_string())
        );
    }

    #[test]
    fn unhandled_pairs_fall_back_to_generation() {
        assert_eq!(dispatch("ai", "process", "привет"), Dispatch::Generative);
        assert_eq!(dispatch("system_commands", "self_destruct", ""), Dispatch::Generative);
        assert_eq!(dispatch("app_commands", "search", "x"), Dispatch::Generative);
        assert_eq!(dispatch("music_commands", "play", "x"), Dispatch::Generative);
    }
}
