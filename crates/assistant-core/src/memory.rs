use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::telemetry::LogContext;

pub const CONVERSATION_FILE_NAME: &str = "conversation.json";
pub const USER_DATA_FILE_NAME: &str = "user_data.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    #[serde(with = "iso_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "user")]
    pub user_text: String,
    #[serde(rename = "assistant")]
    pub assistant_text: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserData {
    #[serde(default)]
    pub preferences: BTreeMap<String, Value>,
    #[serde(default)]
    pub facts: BTreeMap<String, Value>,
    #[serde(default, with = "iso_timestamp::option")]
    pub last_interaction: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("failed to write memory file {path}: {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode memory file {path}: {source}")]
    EncodeJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Conversation log plus user facts and preferences, persisted as two JSON files.
///
/// Turns are append-only. Every mutation rewrites the affected files in full
/// before returning; there is no buffering and no protection against a second
/// process writing the same directory.
#[derive(Debug)]
pub struct ConversationMemory {
    conversation_file: PathBuf,
    user_data_file: PathBuf,
    turns: Vec<ConversationTurn>,
    user_data: UserData,
    log: LogContext,
}

impl ConversationMemory {
    /// Never fails: missing or unreadable state starts empty, corrupt state is replaced.
    pub fn load(memory_dir: &Path, log: LogContext) -> Self {
        if let Err(err) = fs::create_dir_all(memory_dir) {
            warn!(
                parent: log.span(),
                path = %memory_dir.display(),
                error = %err,
                "failed to create memory directory"
            );
        }

        let conversation_file = memory_dir.join(CONVERSATION_FILE_NAME);
        let user_data_file = memory_dir.join(USER_DATA_FILE_NAME);

        let turns = load_or_replace::<Vec<ConversationTurn>>(&conversation_file, &log);
        let user_data = load_or_replace::<UserData>(&user_data_file, &log);

        info!(parent: log.span(), turns = turns.len(), "conversation memory loaded");

        Self {
            conversation_file,
            user_data_file,
            turns,
            user_data,
            log,
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// The last `limit` turns, oldest first.
    pub fn recent_turns(&self, limit: usize) -> &[ConversationTurn] {
        let start = self.turns.len().saturating_sub(limit);
        &self.turns[start..]
    }

    pub fn last_interaction(&self) -> Option<DateTime<Utc>> {
        self.user_data.last_interaction
    }

    pub fn add_to_conversation(
        &mut self,
        user_text: &str,
        assistant_text: &str,
        now: DateTime<Utc>,
    ) -> Result<(), MemoryError> {
        self.turns.push(ConversationTurn {
            timestamp: now,
            user_text: user_text.to_string(),
            assistant_text: assistant_text.to_string(),
        });
        self.user_data.last_interaction = Some(now);

        write_pretty_json(&self.conversation_file, &self.turns)?;
        write_pretty_json(&self.user_data_file, &self.user_data)?;
        debug!(parent: self.log.span(), turns = self.turns.len(), "conversation turn persisted");
        Ok(())
    }

    pub fn set_preference(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), MemoryError> {
        self.user_data.preferences.insert(key.into(), value.into());
        write_pretty_json(&self.user_data_file, &self.user_data)
    }

    pub fn preference(&self, key: &str) -> Option<&Value> {
        self.user_data.preferences.get(key)
    }

    pub fn set_fact(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), MemoryError> {
        self.user_data.facts.insert(key.into(), value.into());
        write_pretty_json(&self.user_data_file, &self.user_data)
    }

    pub fn fact(&self, key: &str) -> Option<&Value> {
        self.user_data.facts.get(key)
    }
}

fn load_or_replace<T>(path: &Path, log: &LogContext) -> T
where
    T: DeserializeOwned + Serialize + Default,
{
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return replace_with_default(path, log);
        }
        Err(err) => {
            warn!(
                parent: log.span(),
                path = %path.display(),
                error = %err,
                "memory file unreadable; starting empty"
            );
            return T::default();
        }
    };

    match serde_json::from_str::<T>(&raw) {
        Ok(value) => value,
        Err(err) => {
            warn!(
                parent: log.span(),
                path = %path.display(),
                error = %err,
                "memory file corrupt; replacing with empty state"
            );
            replace_with_default(path, log)
        }
    }
}

fn replace_with_default<T>(path: &Path, log: &LogContext) -> T
where
    T: Serialize + Default,
{
    let value = T::default();
    if let Err(err) = write_pretty_json(path, &value) {
        warn!(parent: log.span(), error = %err, "failed to initialize memory file");
    }
    value
}

fn write_pretty_json<T: Serialize>(path: &Path, value: &T) -> Result<(), MemoryError> {
    let mut encoded =
        serde_json::to_string_pretty(value).map_err(|source| MemoryError::EncodeJson {
            path: path.display().to_string(),
            source,
        })?;
    encoded.push('\n');

    fs::write(path, encoded).map_err(|source| MemoryError::WriteFile {
        path: path.display().to_string(),
        source,
    })
}

/// ISO-8601 timestamps. Writes RFC 3339 in UTC; also reads offset-less
/// timestamps (`2024-05-01T10:00:00.123456`) as UTC.
mod iso_timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 timestamp: {raw}")))
    }

    pub(super) fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }

        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer, de};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            raw.map(|raw| {
                super::parse(&raw)
                    .ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 timestamp: {raw}")))
            })
            .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    use super::{CONVERSATION_FILE_NAME, ConversationMemory, USER_DATA_FILE_NAME};
    use crate::telemetry::LogContext;

    #[test]
    fn appended_turns_survive_reload_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let start = Utc
            .with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
            .single()
            .expect("valid datetime")
            + Duration::nanoseconds(123_456_789);

        let mut memory = ConversationMemory::load(dir.path(), LogContext::disabled());
        for index in 0..7 {
            memory
                .add_to_conversation(
                    &format!("вопрос {index}"),
                    &format!("ответ {index}"),
                    start + Duration::minutes(index),
                )
                .expect("turn persists");
        }

        let reloaded = ConversationMemory::load(dir.path(), LogContext::disabled());
        assert_eq!(reloaded.turns(), memory.turns());
        assert_eq!(reloaded.turns().len(), 7);
        assert_eq!(reloaded.turns()[0].user_text, "вопрос 0");
        assert_eq!(reloaded.last_interaction(), Some(start + Duration::minutes(6)));
    }

    #[test]
    fn recent_turns_returns_tail_oldest_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let now = Utc::now();
        let mut memory = ConversationMemory::load(dir.path(), LogContext::disabled());
        assert!(memory.recent_turns(5).is_empty());

        for index in 0..8 {
            memory
                .add_to_conversation(&format!("u{index}"), &format!("a{index}"), now)
                .expect("turn persists");
        }

        let recent: Vec<&str> = memory
            .recent_turns(5)
            .iter()
            .map(|turn| turn.user_text.as_str())
            .collect();
        assert_eq!(recent, vec!["u3", "u4", "u5", "u6", "u7"]);
    }

    #[test]
    fn corrupt_files_are_replaced_with_empty_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(CONVERSATION_FILE_NAME), "[{broken").expect("write");
        std::fs::write(dir.path().join(USER_DATA_FILE_NAME), "42").expect("write");

        let memory = ConversationMemory::load(dir.path(), LogContext::disabled());
        assert!(memory.turns().is_empty());
        assert_eq!(memory.last_interaction(), None);

        let rewritten = std::fs::read_to_string(dir.path().join(CONVERSATION_FILE_NAME))
            .expect("conversation file rewritten");
        assert_eq!(rewritten.trim(), "[]");
        let user_data: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join(USER_DATA_FILE_NAME)).expect("read"),
        )
        .expect("user data is valid json");
        assert_eq!(
            user_data,
            json!({"preferences": {}, "facts": {}, "last_interaction": null})
        );
    }

    #[test]
    fn reads_offset_less_timestamps() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(CONVERSATION_FILE_NAME),
            r#"[{"timestamp":"2025-01-15T08:30:00.250000","user":"привет","assistant":"здравствуйте"}]"#,
        )
        .expect("write");

        let memory = ConversationMemory::load(dir.path(), LogContext::disabled());
        assert_eq!(memory.turns().len(), 1);
        assert_eq!(
            memory.turns()[0].timestamp.to_rfc3339(),
            "2025-01-15T08:30:00.250+00:00"
        );
    }

    #[test]
    fn preferences_and_facts_are_written_immediately() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut memory = ConversationMemory::load(dir.path(), LogContext::disabled());
        memory.set_preference("music", "джаз").expect("preference persists");
        memory.set_fact("birthday", "12 мая").expect("fact persists");

        let reloaded = ConversationMemory::load(dir.path(), LogContext::disabled());
        assert_eq!(reloaded.preference("music"), Some(&json!("джаз")));
        assert_eq!(reloaded.fact("birthday"), Some(&json!("12 мая")));
        assert_eq!(reloaded.fact("city"), None);
    }
}
