use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config_env::{EnvSource, optional_trimmed_env, parse_u32_env, parse_u64_env};

pub const DEFAULT_AI_MODEL: &str = "gpt-4";
pub const DEFAULT_MAX_TOKENS: u32 = 150;
pub const DEFAULT_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_LLM_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_LLM_MAX_RETRIES: u32 = 2;
pub const DEFAULT_LLM_RETRY_BASE_BACKOFF_MS: u64 = 250;
pub const DEFAULT_CITY: &str = "Москва";
pub const DEFAULT_TIME_ZONE: &str = "Europe/Moscow";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid integer in env var {0}")]
    ParseInt(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to load .env file: {0}")]
    Dotenv(String),
    #[error("failed to read settings file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("settings file {path} is not valid JSON: {source}")]
    ParseJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write settings file {path}: {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode settings for {path}: {source}")]
    EncodeJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Contents of `settings.json`.
///
/// Every field falls back to its default so partially written files still load.
/// Keys this version does not know about are kept in `extra` and written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantSettings {
    pub user_name: String,
    pub ai: AiSettings,
    pub speech: SpeechSettings,
    pub system: SystemSettings,
    pub weather_api_key: String,
    pub default_city: String,
    pub time_zone: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            user_name: String::new(),
            ai: AiSettings::default(),
            speech: SpeechSettings::default(),
            system: SystemSettings::default(),
            weather_api_key: String::new(),
            default_city: DEFAULT_CITY.to_string(),
            time_zone: DEFAULT_TIME_ZONE.to_string(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub chat_completions_url: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_base_backoff_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_model: Option<String>,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_AI_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            chat_completions_url: DEFAULT_CHAT_COMPLETIONS_URL.to_string(),
            timeout_ms: DEFAULT_LLM_TIMEOUT_MS,
            max_retries: DEFAULT_LLM_MAX_RETRIES,
            retry_base_backoff_ms: DEFAULT_LLM_RETRY_BASE_BACKOFF_MS,
            fallback_model: None,
        }
    }
}

impl AiSettings {
    pub fn api_key(&self) -> Option<&str> {
        let trimmed = self.api_key.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub voice_rate: u32,
    pub voice_index: u32,
    pub energy_threshold: u32,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            voice_rate: 190,
            voice_index: 0,
            energy_threshold: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSettings {
    pub startup: bool,
    pub tray_icon: bool,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            startup: false,
            tray_icon: true,
        }
    }
}

impl AssistantSettings {
    /// Reads `path`, or writes and returns the defaults when the file does not exist.
    pub fn load_or_init(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let settings = Self::default();
                settings.save(path)?;
                return Ok(settings);
            }
            Err(source) => {
                return Err(ConfigError::ReadFile {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        serde_json::from_str(&raw).map_err(|source| ConfigError::ParseJson {
            path: path.display().to_string(),
            source,
        })
    }

    /// Rewrites the whole settings file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::WriteFile {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let mut encoded =
            serde_json::to_string_pretty(self).map_err(|source| ConfigError::EncodeJson {
                path: path.display().to_string(),
                source,
            })?;
        encoded.push('\n');

        fs::write(path, encoded).map_err(|source| ConfigError::WriteFile {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn apply_env_overrides(&mut self, source: &impl EnvSource) -> Result<(), ConfigError> {
        if let Some(api_key) = optional_trimmed_env(source, "OPENAI_API_KEY") {
            self.ai.api_key = api_key;
        }
        if let Some(model) = optional_trimmed_env(source, "JARVIS_AI_MODEL") {
            self.ai.model = model;
        }
        if let Some(model) = optional_trimmed_env(source, "JARVIS_AI_FALLBACK_MODEL") {
            self.ai.fallback_model = Some(model);
        }
        if let Some(url) = optional_trimmed_env(source, "JARVIS_CHAT_COMPLETIONS_URL") {
            self.ai.chat_completions_url = url;
        }
        self.ai.timeout_ms = parse_u64_env(source, "JARVIS_LLM_TIMEOUT_MS", self.ai.timeout_ms)?;
        self.ai.max_retries =
            parse_u32_env(source, "JARVIS_LLM_MAX_RETRIES", self.ai.max_retries)?;
        if let Some(api_key) = optional_trimmed_env(source, "OPENWEATHER_API_KEY") {
            self.weather_api_key = api_key;
        }
        if let Some(city) = optional_trimmed_env(source, "JARVIS_DEFAULT_CITY") {
            self.default_city = city;
        }
        if let Some(time_zone) = optional_trimmed_env(source, "JARVIS_TIME_ZONE") {
            self.time_zone = time_zone;
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.ai.chat_completions_url.as_str();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::InvalidConfiguration(
                "ai.chat_completions_url must start with http:// or https://".to_string(),
            ));
        }
        if self.ai.max_tokens == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "ai.max_tokens must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn weather_api_key(&self) -> Option<&str> {
        let trimmed = self.weather_api_key.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// File layout under the assistant home directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JarvisPaths {
    pub settings_file: PathBuf,
    pub commands_file: PathBuf,
    pub memory_dir: PathBuf,
    pub media_dir: PathBuf,
}

impl JarvisPaths {
    pub fn under(home: impl AsRef<Path>) -> Self {
        let home = home.as_ref();
        let config_dir = home.join("config");
        let data_dir = home.join("data");

        Self {
            settings_file: config_dir.join("settings.json"),
            commands_file: config_dir.join("commands.json"),
            memory_dir: data_dir.join("memory"),
            media_dir: data_dir.join("media"),
        }
    }

    pub fn from_env(source: &impl EnvSource) -> Result<Self, ConfigError> {
        let home = match optional_trimmed_env(source, "JARVIS_HOME") {
            Some(home) => PathBuf::from(home),
            None => std::env::current_dir().map_err(|err| {
                ConfigError::InvalidConfiguration(format!(
                    "JARVIS_HOME is unset and the working directory is unavailable: {err}"
                ))
            })?,
        };

        Ok(Self::under(home))
    }

    pub fn ensure_data_dirs(&self) -> Result<(), ConfigError> {
        for dir in [&self.memory_dir, &self.media_dir] {
            fs::create_dir_all(dir).map_err(|source| ConfigError::WriteFile {
                path: dir.display().to_string(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Loads `.env` from the working directory if one exists.
pub fn load_dotenv() -> Result<(), ConfigError> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(ConfigError::Dotenv(err.to_string())),
    }
}
