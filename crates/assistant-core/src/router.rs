use chrono::{DateTime, Utc};
use tracing::debug;

use crate::commands::CommandTriggerTable;
use crate::models::{IntentAction, IntentCategory, IntentMatch};
use crate::personal::PersonalAssistant;
use crate::telemetry::LogContext;
use crate::web_search::detect_search_intent;

/// Resolves an utterance to exactly one intent.
///
/// Matchers run in a fixed order: configured triggers, the search-intent
/// parser, the personal-query parser, then the generative fallback. The first
/// hit wins and nothing after it runs.
pub struct CommandRouter {
    table: CommandTriggerTable,
    personal: PersonalAssistant,
    log: LogContext,
}

impl CommandRouter {
    pub fn new(table: CommandTriggerTable, personal: PersonalAssistant, log: LogContext) -> Self {
        Self {
            table,
            personal,
            log,
        }
    }

    pub fn table(&self) -> &CommandTriggerTable {
        &self.table
    }

    pub async fn resolve(&self, input: &str) -> IntentMatch {
        self.resolve_at(input, Utc::now()).await
    }

    pub async fn resolve_at(&self, input: &str, now: DateTime<Utc>) -> IntentMatch {
        let lowercased = input.to_lowercase();

        if let Some(entry) = self.table.find_match(&lowercased) {
            let parameters = lowercased.replacen(entry.trigger.as_str(), "", 1);
            debug!(
                parent: self.log.span(),
                trigger = %entry.trigger,
                category = entry.category.as_str(),
                "configured trigger matched"
            );
            return IntentMatch::new(
                entry.category.clone(),
                entry.action.clone(),
                parameters.trim(),
            );
        }

        // Only classified here; the search itself runs when the intent is dispatched.
        if detect_search_intent(&lowercased).is_some() {
            debug!(parent: self.log.span(), "search intent matched");
            return IntentMatch::new(IntentCategory::WebSearch, IntentAction::ParseIntent, input);
        }

        if let Some(answer) = self.personal.parse_intent_at(&lowercased, now).await {
            debug!(parent: self.log.span(), "personal query matched");
            return IntentMatch::new(IntentCategory::Personal, IntentAction::Response, answer);
        }

        IntentMatch::new(IntentCategory::Ai, IntentAction::Process, input)
    }
}
