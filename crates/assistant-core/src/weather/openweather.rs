use std::time::Duration;

use serde::Deserialize;

use super::{WeatherError, WeatherFuture, WeatherLookup, WeatherReport};

const DEFAULT_CURRENT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct OpenWeatherConfig {
    pub current_weather_url: String,
    pub api_key: String,
    pub timeout_ms: u64,
}

impl OpenWeatherConfig {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            current_weather_url: DEFAULT_CURRENT_WEATHER_URL.to_string(),
            api_key: api_key.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// OpenWeatherMap "current weather" endpoint, metric units, Russian descriptions.
#[derive(Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    config: OpenWeatherConfig,
}

impl OpenWeatherClient {
    pub fn new(config: OpenWeatherConfig) -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| WeatherError::Transport(err.to_string()))?;

        Ok(Self { client, config })
    }

    async fn fetch(&self, city: &str) -> Result<WeatherReport, WeatherError> {
        let response = self
            .client
            .get(&self.config.current_weather_url)
            .query(&[
                ("q", city),
                ("appid", self.config.api_key.as_str()),
                ("units", "metric"),
                ("lang", "ru"),
            ])
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    WeatherError::Transport("request_timed_out".to_string())
                } else {
                    WeatherError::Transport(err.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|_| WeatherError::InvalidPayload("response_body_read_failed".to_string()))?;

        if !status.is_success() {
            return Err(WeatherError::Rejected {
                status: status.as_u16(),
                message: parse_provider_message(&body),
            });
        }

        let parsed: CurrentWeatherResponse = serde_json::from_str(&body)
            .map_err(|_| WeatherError::InvalidPayload("response_json_parse_failed".to_string()))?;
        let description = parsed
            .weather
            .into_iter()
            .next()
            .map(|condition| condition.description)
            .ok_or_else(|| WeatherError::InvalidPayload("missing_weather_condition".to_string()))?;

        Ok(WeatherReport {
            description,
            temp_celsius: parsed.main.temp,
            feels_like_celsius: parsed.main.feels_like,
            humidity_pct: parsed.main.humidity,
        })
    }
}

impl WeatherLookup for OpenWeatherClient {
    fn current_weather<'a>(&'a self, city: &'a str) -> WeatherFuture<'a> {
        Box::pin(self.fetch(city))
    }
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    main: CurrentWeatherMain,
    weather: Vec<CurrentWeatherCondition>,
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherMain {
    temp: f64,
    feels_like: f64,
    humidity: u32,
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherCondition {
    description: String,
}

fn parse_provider_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ProviderErrorEnvelope {
        message: Option<String>,
    }

    serde_json::from_str::<ProviderErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| "неизвестная ошибка".to_string())
}
