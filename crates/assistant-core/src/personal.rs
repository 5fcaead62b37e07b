use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;
use regex::Regex;
use tracing::{info, warn};

use crate::telemetry::LogContext;
use crate::timezone::{parse_time_zone_or_default, user_local_datetime};
use crate::weather::{WeatherError, WeatherLookup};

pub const WEATHER_API_KEY_MISSING: &str =
    "Для получения информации о погоде необходимо настроить API ключ OpenWeatherMap";

static DATE_QUERY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"какое сегодня число|какая сегодня дата|дата сегодня|число сегодня")
        .expect("valid regex")
});
static TIME_QUERY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"который час|сколько времени|время сейчас|текущее время").expect("valid regex")
});
static WEATHER_QUERY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"погода|прогноз погоды").expect("valid regex"));
static WEATHER_CITY: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"погода в (\w+)").expect("valid regex"),
        Regex::new(r"погода (\w+)").expect("valid regex"),
    ]
});

const MONTHS_GENITIVE: [&str; 12] = [
    "января", "февраля", "марта", "апреля", "мая", "июня", "июля", "августа", "сентября",
    "октября", "ноября", "декабря",
];
const WEEKDAYS: [&str; 7] = [
    "понедельник",
    "вторник",
    "среда",
    "четверг",
    "пятница",
    "суббота",
    "воскресенье",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonalQuery {
    Date,
    Time,
    Weather { city: Option<String> },
}

/// Date, then time, then weather. The first matching question wins.
pub fn detect_personal_query(text: &str) -> Option<PersonalQuery> {
    let normalized = text.to_lowercase();

    if DATE_QUERY.is_match(&normalized) {
        return Some(PersonalQuery::Date);
    }
    if TIME_QUERY.is_match(&normalized) {
        return Some(PersonalQuery::Time);
    }
    if WEATHER_QUERY.is_match(&normalized) {
        let city = WEATHER_CITY
            .iter()
            .find_map(|pattern| pattern.captures(&normalized))
            .and_then(|captures| captures.get(1))
            .map(|capture| capture.as_str().to_string());
        return Some(PersonalQuery::Weather { city });
    }

    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PluralForm {
    One,
    Few,
    Many,
}

fn plural_form(value: u32) -> PluralForm {
    let last_digit = value % 10;
    let last_two = value % 100;

    if last_digit == 1 && last_two != 11 {
        PluralForm::One
    } else if (2..=4).contains(&last_digit) && !(12..=14).contains(&last_two) {
        PluralForm::Few
    } else {
        PluralForm::Many
    }
}

pub fn format_hours(hours: u32) -> String {
    let noun = match plural_form(hours) {
        PluralForm::One => "час",
        PluralForm::Few => "часа",
        PluralForm::Many => "часов",
    };
    format!("{hours} {noun}")
}

pub fn format_minutes(minutes: u32) -> String {
    let noun = match plural_form(minutes) {
        PluralForm::One => "минута",
        PluralForm::Few => "минуты",
        PluralForm::Many => "минут",
    };
    format!("{minutes} {noun}")
}

/// Answers date, time and weather questions.
pub struct PersonalAssistant {
    weather: Option<Arc<dyn WeatherLookup>>,
    default_city: String,
    time_zone: Tz,
    log: LogContext,
}

impl PersonalAssistant {
    /// `weather` is `None` when no weather API key is configured.
    pub fn new(
        weather: Option<Arc<dyn WeatherLookup>>,
        default_city: impl Into<String>,
        time_zone: &str,
        log: LogContext,
    ) -> Self {
        Self {
            weather,
            default_city: default_city.into(),
            time_zone: parse_time_zone_or_default(time_zone),
            log,
        }
    }

    pub async fn parse_intent(&self, text: &str) -> Option<String> {
        self.parse_intent_at(text, Utc::now()).await
    }

    pub async fn parse_intent_at(&self, text: &str, now: DateTime<Utc>) -> Option<String> {
        let answer = match detect_personal_query(text)? {
            PersonalQuery::Date => self.date_answer(now),
            PersonalQuery::Time => self.time_answer(now),
            PersonalQuery::Weather { city } => {
                let city = city.unwrap_or_else(|| self.default_city.clone());
                self.weather_answer(&city).await
            }
        };
        Some(answer)
    }

    pub fn date_answer(&self, now: DateTime<Utc>) -> String {
        let local = user_local_datetime(now, &self.time_zone);
        let weekday = WEEKDAYS[local.weekday().num_days_from_monday() as usize];
        let month = MONTHS_GENITIVE[local.month0() as usize];
        format!(
            "Сегодня {weekday}, {} {month} {} года",
            local.day(),
            local.year()
        )
    }

    pub fn time_answer(&self, now: DateTime<Utc>) -> String {
        let local = user_local_datetime(now, &self.time_zone);
        format!(
            "Сейчас {} {}",
            format_hours(local.hour()),
            format_minutes(local.minute())
        )
    }

    pub async fn weather_answer(&self, city: &str) -> String {
        let Some(weather) = self.weather.as_ref() else {
            return WEATHER_API_KEY_MISSING.to_string();
        };

        info!(parent: self.log.span(), city, "weather lookup");
        match weather.current_weather(city).await {
            Ok(report) => format!(
                "Погода в городе {city}: {}, температура {:.1}°C, ощущается как {:.1}°C, влажность {}%",
                report.description,
                report.temp_celsius,
                report.feels_like_celsius,
                report.humidity_pct
            ),
            Err(WeatherError::Rejected { status, message }) => {
                warn!(parent: self.log.span(), status, provider_message = %message, "weather lookup rejected");
                format!("Не удалось получить информацию о погоде: {message}")
            }
            Err(err) => {
                warn!(parent: self.log.span(), error = %err, "weather lookup failed");
                format!("Произошла ошибка при получении данных о погоде: {err}")
            }
        }
    }
}
