//! Weather document and the values derived from it for the display.
//!
//! The document is the OpenWeatherMap "One Call" response. Only the fields the
//! display draws are deserialized.

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::{InkdayError, InkdayResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Weather {
    pub current: CurrentConditions,
    pub daily: Vec<DailyForecast>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentConditions {
    /// Unix seconds
    pub sunrise: i64,
    /// Unix seconds
    pub sunset: i64,
    pub feels_like: f64,
    pub humidity: f64,
    pub wind_deg: f64,
    /// Miles per hour (imperial units)
    pub wind_speed: f64,
    pub weather: Vec<Condition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Condition {
    pub id: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DailyForecast {
    pub temp: DailyTemperature,
    /// 0 and 1 are new moon, 0.5 is full moon
    pub moon_phase: f64,
    /// Probability of precipitation, 0-1
    #[serde(default)]
    pub pop: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DailyTemperature {
    pub min: f64,
    pub max: f64,
}

/// The weather part of the display state, already rounded the way it is drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherState {
    pub condition_code: u32,
    pub is_day: bool,
    pub feels_like: i64,
    pub high: i64,
    pub low: i64,
    pub sunrise: String,
    pub sunset: String,
    pub moon_phase: String,
    pub precip_percent: i64,
    pub humidity_percent: i64,
    /// Rounded to 4 degree steps so small gusts do not force a redraw
    pub wind_dir: i64,
    pub beaufort: u8,
}

impl WeatherState {
    pub fn from_weather(weather: &Weather, now: DateTime<Tz>) -> InkdayResult<Self> {
        let tz = now.timezone();
        let today = weather
            .daily
            .first()
            .ok_or_else(|| InkdayError::Weather("forecast has no daily entries".into()))?;
        let condition_code = weather
            .current
            .weather
            .first()
            .map(|c| c.id)
            .ok_or_else(|| InkdayError::Weather("current conditions are empty".into()))?;

        let sunrise = unix_to_local(weather.current.sunrise, tz)?;
        let sunset = unix_to_local(weather.current.sunset, tz)?;

        Ok(WeatherState {
            condition_code,
            is_day: sunrise < now && now < sunset,
            feels_like: weather.current.feels_like.round() as i64,
            high: today.temp.max.round() as i64,
            low: today.temp.min.round() as i64,
            sunrise: clock_label(sunrise),
            sunset: clock_label(sunset),
            moon_phase: moon_phase_name(today.moon_phase),
            precip_percent: (today.pop * 100.0).round() as i64,
            humidity_percent: weather.current.humidity.round() as i64,
            wind_dir: ((weather.current.wind_deg / 4.0).round() as i64) * 4,
            beaufort: beaufort(weather.current.wind_speed),
        })
    }
}

fn unix_to_local(seconds: i64, tz: Tz) -> InkdayResult<DateTime<Tz>> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .map(|dt| dt.with_timezone(&tz))
        .ok_or_else(|| InkdayError::Weather(format!("invalid timestamp {seconds}")))
}

/// "6:05am" style label.
pub fn clock_label(dt: DateTime<Tz>) -> String {
    dt.format("%-I:%M%p").to_string().to_lowercase()
}

/// Beaufort number for a wind speed in miles per hour.
pub fn beaufort(mph: f64) -> u8 {
    const UPPER_BOUNDS: [f64; 12] = [1.0, 4.0, 8.0, 13.0, 19.0, 25.0, 32.0, 39.0, 47.0, 55.0, 64.0, 73.0];

    UPPER_BOUNDS
        .iter()
        .position(|bound| mph < *bound)
        .unwrap_or(UPPER_BOUNDS.len()) as u8
}

/// Icon-set name of a moon phase, split into 28 steps.
pub fn moon_phase_name(phase: f64) -> String {
    let step = (phase * 27.0).round() as i64;
    match step {
        0 => "moon-alt-new".to_string(),
        7 => "moon-alt-first-quarter".to_string(),
        14 => "moon-alt-full".to_string(),
        21 => "moon-alt-third-quarter".to_string(),
        1..=6 => format!("moon-alt-waxing-crescent-{step}"),
        8..=13 => format!("moon-alt-waxing-gibbous-{}", step - 7),
        15..=20 => format!("moon-alt-waning-gibbous-{}", step - 14),
        22..=27 => format!("moon-alt-waning-crescent-{}", step - 21),
        _ => "na".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;

    const SAMPLE: &str = r#"{
        "lat": 40.71, "lon": -74.0, "timezone": "America/New_York",
        "current": {
            "dt": 1711634400, "sunrise": 1711622940, "sunset": 1711667640,
            "temp": 55.2, "feels_like": 53.6, "humidity": 61, "wind_speed": 9.2,
            "wind_deg": 187, "weather": [{"id": 803, "main": "Clouds"}]
        },
        "daily": [
            {"temp": {"min": 44.6, "max": 58.5}, "moon_phase": 0.58, "pop": 0.25}
        ]
    }"#;

    #[test]
    fn test_weather_state_from_document() {
        let weather: Weather = serde_json::from_str(SAMPLE).unwrap();
        // 2024-03-28 10:00 in New York
        let now = Utc.timestamp_opt(1711634400, 0).unwrap().with_timezone(&New_York);

        let state = WeatherState::from_weather(&weather, now).unwrap();
        assert_eq!(state.condition_code, 803);
        assert!(state.is_day);
        assert_eq!(state.feels_like, 54);
        assert_eq!((state.high, state.low), (59, 45));
        assert_eq!(state.precip_percent, 25);
        assert_eq!(state.humidity_percent, 61);
        assert_eq!(state.wind_dir, 188);
        assert_eq!(state.beaufort, 3);
        assert_eq!(state.sunrise, "6:49am");
        assert_eq!(state.moon_phase, "moon-alt-waning-gibbous-2");
    }

    #[test]
    fn test_missing_daily_is_an_error() {
        let mut weather: Weather = serde_json::from_str(SAMPLE).unwrap();
        weather.daily.clear();
        let now = Utc.timestamp_opt(1711634400, 0).unwrap().with_timezone(&New_York);
        assert!(WeatherState::from_weather(&weather, now).is_err());
    }

    #[test]
    fn test_beaufort_scale_edges() {
        assert_eq!(beaufort(0.5), 0);
        assert_eq!(beaufort(1.0), 1);
        assert_eq!(beaufort(12.9), 3);
        assert_eq!(beaufort(72.9), 11);
        assert_eq!(beaufort(73.0), 12);
        assert_eq!(beaufort(120.0), 12);
    }

    #[test]
    fn test_moon_phase_names() {
        assert_eq!(moon_phase_name(0.0), "moon-alt-new");
        assert_eq!(moon_phase_name(0.5), "moon-alt-full");
        assert_eq!(moon_phase_name(3.0 / 27.0), "moon-alt-waxing-crescent-3");
        assert_eq!(moon_phase_name(1.0), "moon-alt-waning-crescent-6");
        assert_eq!(moon_phase_name(-0.5), "na");
    }
}
