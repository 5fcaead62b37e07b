use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{error, info};

use crate::models::{IntentAction, IntentCategory};
use crate::telemetry::LogContext;

#[derive(Debug, Error)]
pub enum CommandTableError {
    #[error("failed to read command configuration {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("command configuration {path} is not valid JSON: {source}")]
    ParseJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEntry {
    pub category: IntentCategory,
    pub trigger: String,
    pub action: IntentAction,
}

/// Trigger phrases mapped to `(category, action)`, kept in configuration order.
///
/// Shape on disk: `{ "<category>": { "<trigger phrase>": "<action>" } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandTriggerTable {
    entries: Vec<TriggerEntry>,
}

impl CommandTriggerTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads the table once at startup. Missing or unreadable configuration
    /// yields an empty table.
    pub fn load(path: &Path, log: &LogContext) -> Self {
        match Self::read(path) {
            Ok(table) => {
                info!(parent: log.span(), triggers = table.len(), "command triggers loaded");
                table
            }
            Err(CommandTableError::ReadFile { source, .. }) if source.kind() == ErrorKind::NotFound => {
                error!(
                    parent: log.span(),
                    path = %path.display(),
                    "command configuration not found; no triggers configured"
                );
                Self::empty()
            }
            Err(err) => {
                error!(parent: log.span(), error = %err, "command configuration ignored");
                Self::empty()
            }
        }
    }

    pub fn read(path: &Path) -> Result<Self, CommandTableError> {
        let raw = fs::read_to_string(path).map_err(|source| CommandTableError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw).map_err(|source| CommandTableError::ParseJson {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        let parsed = serde_json::from_str::<IndexMap<String, IndexMap<String, String>>>(raw)?;
        Ok(Self::from_categories(parsed))
    }

    pub fn from_categories(categories: IndexMap<String, IndexMap<String, String>>) -> Self {
        let mut entries = Vec::new();
        for (category_key, triggers) in categories {
            let category = IntentCategory::parse(&category_key);
            for (trigger, action) in triggers {
                let trigger = trigger.trim().to_lowercase();
                // An empty trigger would match every input.
                if trigger.is_empty() {
                    continue;
                }
                entries.push(TriggerEntry {
                    category: category.clone(),
                    trigger,
                    action: IntentAction::parse(&action),
                });
            }
        }

        Self { entries }
    }

    pub fn entries(&self) -> &[TriggerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry whose trigger occurs in `lowercased_input`.
    pub fn find_match(&self, lowercased_input: &str) -> Option<&TriggerEntry> {
        self.entries
            .iter()
            .find(|entry| lowercased_input.contains(entry.trigger.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::CommandTriggerTable;
    use crate::models::{IntentAction, IntentCategory};
    use crate::telemetry::LogContext;

    #[test]
    fn preserves_configuration_order_across_categories() {
        let table = CommandTriggerTable::from_json_str(
            r#"{
                "exit_commands": {"стоп": "exit"},
                "app_commands": {"открой": "open_application", "закрой": "close_application"}
            }"#,
        )
        .expect("valid table");

        let triggers: Vec<&str> = table
            .entries()
            .iter()
            .map(|entry| entry.trigger.as_str())
            .collect();
        assert_eq!(triggers, vec!["стоп", "открой", "закрой"]);
        assert_eq!(table.entries()[0].category, IntentCategory::ExitCommands);
        assert_eq!(table.entries()[2].action, IntentAction::CloseApplication);
    }

    #[test]
    fn first_matching_entry_wins() {
        let table = CommandTriggerTable::from_json_str(
            r#"{"app_commands": {"открой": "open_application", "открой браузер": "open_application"}}"#,
        )
        .expect("valid table");

        let entry = table.find_match("открой браузер").expect("match");
        assert_eq!(entry.trigger, "открой");
        assert!(table.find_match("включи музыку").is_none());
    }

    #[test]
    fn triggers_are_normalized_and_blank_ones_dropped() {
        let table = CommandTriggerTable::from_json_str(
            r#"{"system_commands": {"  Сделай Скриншот ": "take_screenshot", " ": "shutdown"}}"#,
        )
        .expect("valid table");

        assert_eq!(table.len(), 1);
        assert_eq!(table.entries()[0].trigger, "сделай скриншот");
    }

    #[test]
    fn missing_or_malformed_configuration_yields_empty_table() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("commands.json");
        assert!(CommandTriggerTable::load(&missing, &LogContext::disabled()).is_empty());

        std::fs::write(&missing, "[1, 2").expect("write");
        assert!(CommandTriggerTable::load(&missing, &LogContext::disabled()).is_empty());
    }
}
