//! Snapshot of what is on screen, used only to tell whether anything changed.

use chrono::DateTime;
use chrono_tz::Tz;

use crate::event::ResolvedEvent;
use crate::weather::WeatherState;

/// One rendered event row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventState {
    pub title: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub all_day: bool,
    /// Never set for all-day rows
    pub in_progress: bool,
}

impl EventState {
    pub fn from_event(event: &ResolvedEvent, now: DateTime<Tz>) -> Self {
        EventState {
            title: event.title.clone(),
            start: event.start,
            end: event.end,
            all_day: event.is_all_day,
            in_progress: !event.is_all_day && event.is_in_progress(now),
        }
    }
}

/// Everything that was drawn on the last frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayState {
    /// e.g. "Thursday, Mar 28"
    pub date_label: String,
    pub weather: Option<WeatherState>,
    pub events: Vec<EventState>,
    pub overflow: usize,
    pub total_count: usize,
    pub footer: String,
}

/// Whether `curr` needs to go to the display.
pub fn should_push(prev: Option<&DisplayState>, curr: &DisplayState) -> bool {
    prev != Some(curr)
}
