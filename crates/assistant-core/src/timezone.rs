use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;

use crate::config::DEFAULT_TIME_ZONE;

pub fn normalize_time_zone(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    trimmed.parse::<Tz>().ok().map(|tz| tz.name().to_string())
}

pub fn parse_time_zone_or_default(value: &str) -> Tz {
    normalize_time_zone(value)
        .and_then(|normalized| normalized.parse::<Tz>().ok())
        .or_else(|| DEFAULT_TIME_ZONE.parse::<Tz>().ok())
        .unwrap_or(chrono_tz::UTC)
}

pub fn user_local_datetime(now_utc: DateTime<Utc>, time_zone: &Tz) -> NaiveDateTime {
    now_utc.with_timezone(time_zone).naive_local()
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, TimeZone, Timelike, Utc};

    use super::{normalize_time_zone, parse_time_zone_or_default, user_local_datetime};

    #[test]
    fn normalize_time_zone_accepts_valid_iana_name() {
        assert_eq!(
            normalize_time_zone("Asia/Yekaterinburg"),
            Some("Asia/Yekaterinburg".to_string())
        );
    }

    #[test]
    fn normalize_time_zone_rejects_invalid_values() {
        assert_eq!(normalize_time_zone(""), None);
        assert_eq!(normalize_time_zone("Mars/Olympus"), None);
    }

    #[test]
    fn invalid_zone_falls_back_to_moscow() {
        let tz = parse_time_zone_or_default("not-a-time-zone");
        assert_eq!(tz.name(), "Europe/Moscow");
    }

    #[test]
    fn local_datetime_converts_from_utc() {
        let now = Utc
            .with_ymd_and_hms(2026, 2, 16, 22, 30, 0)
            .single()
            .expect("valid utc datetime");
        let local = user_local_datetime(now, &parse_time_zone_or_default("Europe/Moscow"));
        assert_eq!(local.day(), 17);
        assert_eq!(local.hour(), 1);
        assert_eq!(local.minute(), 30);
    }
}
