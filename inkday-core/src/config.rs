//! Runtime settings.
//!
//! Settings come from an optional TOML file (`~/.config/inkday/config.toml`)
//! overlaid with environment variables. A `.env` file in the working directory
//! is loaded into the environment first.

use std::path::{Path, PathBuf};

use chrono::Duration;
use chrono_tz::Tz;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::{InkdayError, InkdayResult};
use crate::schedule::OffHours;

const DEFAULT_UPDATE_INTERVAL_MINUTES: i64 = 5;
const MAX_UPDATE_INTERVAL_MINUTES: i64 = 24 * 60;
static DEFAULT_OUTPUT_PATH: &str = "output.png";

/// Settings as read from the sources, before validation.
///
/// Every value is kept as text so the file and the environment behave the same.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSettings {
    pub timezone: Option<String>,
    pub update_interval: Option<String>,
    pub down_hours: Option<String>,
    pub ics_calendars: Option<String>,
    pub location_lat: Option<String>,
    pub location_long: Option<String>,
    pub weather_api_key: Option<String>,
    pub output_path: Option<String>,
    pub display_driver: Option<String>,
    pub font_path: Option<String>,
}

impl RawSettings {
    /// Read only the TOML file at `path`.
    pub fn from_file(path: &Path) -> InkdayResult<Self> {
        Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml))
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| InkdayError::Config(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSettings {
    pub lat: f64,
    pub lon: f64,
    pub api_key: String,
}

/// Validated settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub timezone: Tz,
    pub poll_interval: Duration,
    pub off_hours: OffHours,
    pub calendar_url: String,
    /// `None` when coordinates or the API key are missing
    pub weather: Option<WeatherSettings>,
    pub output_path: PathBuf,
    pub display_driver: Option<String>,
    /// TrueType font for frame text; system fonts are tried when unset
    pub font_path: Option<PathBuf>,
}

impl Settings {
    pub fn config_path() -> InkdayResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| InkdayError::Config("Could not determine config directory".into()))?
            .join("inkday");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from `path` (or the default config file) and the environment.
    ///
    /// An explicitly given file must exist; the default one is optional.
    pub fn load(path: Option<&Path>) -> InkdayResult<Self> {
        if let Ok(env_file) = dotenvy::dotenv() {
            tracing::debug!(path = %env_file.display(), "loaded .env");
        }

        let (file_path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (Self::config_path()?, false),
        };
        let file = File::from(file_path)
            .format(FileFormat::Toml)
            .required(required);

        let raw: RawSettings = Config::builder()
            .add_source(file)
            .add_source(Environment::default())
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| InkdayError::Config(e.to_string()))?;

        Self::from_raw(raw)
    }

    pub fn from_raw(raw: RawSettings) -> InkdayResult<Self> {
        let timezone_name = required(raw.timezone, "TIMEZONE")?;
        let timezone: Tz = timezone_name
            .parse()
            .map_err(|_| InkdayError::Config(format!("unknown timezone '{timezone_name}'")))?;

        let minutes = match non_empty(raw.update_interval) {
            Some(value) => value.parse::<i64>().map_err(|_| {
                InkdayError::Config(format!("UPDATE_INTERVAL '{value}' is not a whole number"))
            })?,
            None => DEFAULT_UPDATE_INTERVAL_MINUTES,
        };
        if !(1..=MAX_UPDATE_INTERVAL_MINUTES).contains(&minutes) {
            return Err(InkdayError::Config(format!(
                "UPDATE_INTERVAL must be between 1 and {MAX_UPDATE_INTERVAL_MINUTES} minutes, got {minutes}"
            )));
        }
        let poll_interval = Duration::try_minutes(minutes).ok_or_else(|| {
            InkdayError::Config(format!("UPDATE_INTERVAL {minutes} is out of range"))
        })?;

        let off_hours = match non_empty(raw.down_hours) {
            Some(value) => value.parse()?,
            None => OffHours::default(),
        };

        let calendar_url = required(raw.ics_calendars, "ICS_CALENDARS")?;

        let weather = match (
            non_empty(raw.location_lat),
            non_empty(raw.location_long),
            non_empty(raw.weather_api_key),
        ) {
            (Some(lat), Some(lon), Some(api_key)) => Some(WeatherSettings {
                lat: coordinate(&lat, "LOCATION_LAT")?,
                lon: coordinate(&lon, "LOCATION_LONG")?,
                api_key,
            }),
            _ => {
                tracing::debug!("weather location or API key missing, weather disabled");
                None
            }
        };

        let output_path = non_empty(raw.output_path).unwrap_or_else(|| DEFAULT_OUTPUT_PATH.into());
        let output_path = PathBuf::from(shellexpand::tilde(&output_path).into_owned());

        Ok(Settings {
            timezone,
            poll_interval,
            off_hours,
            calendar_url,
            weather,
            output_path,
            display_driver: non_empty(raw.display_driver),
            font_path: non_empty(raw.font_path)
                .map(|p| PathBuf::from(shellexpand::tilde(&p).into_owned())),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, key: &str) -> InkdayResult<String> {
    non_empty(value).ok_or_else(|| InkdayError::Config(format!("{key} is not set")))
}

fn coordinate(value: &str, key: &str) -> InkdayResult<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| InkdayError::Config(format!("{key} '{value}' is not a number")))
}
