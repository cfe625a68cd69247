//! HTTP retrieval of the calendar feed and the weather document.

use std::time::Duration;

use crate::config::WeatherSettings;
use crate::error::{InkdayError, InkdayResult};
use crate::weather::Weather;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

static WEATHER_API_URL: &str = "https://api.openweathermap.org/data/2.5/onecall";

/// Shared HTTP client for both feeds.
pub fn http_client() -> InkdayResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent(concat!("inkday/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| InkdayError::Fetch(e.to_string()))
}

/// `webcal://` is plain HTTPS as far as fetching is concerned.
pub fn normalize_calendar_url(url: &str) -> String {
    match url.strip_prefix("webcal://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}

/// Download the ICS document at `url`.
pub async fn fetch_calendar(client: &reqwest::Client, url: &str) -> InkdayResult<String> {
    let url = normalize_calendar_url(url);
    tracing::debug!(%url, "fetching calendar");

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| InkdayError::Fetch(format!("Failed to fetch calendar: {e}")))?;

    if !response.status().is_success() {
        return Err(InkdayError::FetchStatus {
            url,
            status: response.status().as_u16(),
        });
    }

    response
        .text()
        .await
        .map_err(|e| InkdayError::Fetch(format!("Failed to read calendar body: {e}")))
}

pub fn weather_url(settings: &WeatherSettings) -> String {
    format!(
        "{WEATHER_API_URL}?lat={}&lon={}&units=imperial&exclude=minutely&appid={}",
        settings.lat, settings.lon, settings.api_key
    )
}

/// Download and decode the weather document.
pub async fn fetch_weather(
    client: &reqwest::Client,
    settings: &WeatherSettings,
) -> InkdayResult<Weather> {
    let response = client
        .get(weather_url(settings))
        .send()
        .await
        .map_err(|e| InkdayError::Fetch(format!("Failed to fetch weather: {e}")))?;

    if !response.status().is_success() {
        // The query string carries the API key
        return Err(InkdayError::FetchStatus {
            url: WEATHER_API_URL.to_string(),
            status: response.status().as_u16(),
        });
    }

    response
        .json::<Weather>()
        .await
        .map_err(|e| InkdayError::Weather(format!("Failed to parse weather response: {e}")))
}
