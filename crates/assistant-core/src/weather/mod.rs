pub mod openweather;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

pub use openweather::{OpenWeatherClient, OpenWeatherConfig};

pub type WeatherFuture<'a> =
    Pin<Box<dyn Future<Output = Result<WeatherReport, WeatherError>> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub description: String,
    pub temp_celsius: f64,
    pub feels_like_celsius: f64,
    pub humidity_pct: u32,
}

#[derive(Debug, Error)]
pub enum WeatherError {
    /// The provider answered with a non-success status.
    #[error("weather provider rejected the request (status {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("weather request failed: {0}")]
    Transport(String),
    #[error("weather provider returned an invalid payload: {0}")]
    InvalidPayload(String),
}

pub trait WeatherLookup: Send + Sync {
    fn current_weather<'a>(&'a self, city: &'a str) -> WeatherFuture<'a>;
}
