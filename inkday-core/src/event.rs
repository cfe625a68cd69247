//! Calendar entry and event types.
//!
//! `RawCalendarEntry` is what the ICS parser hands over, with times exactly as
//! the feed wrote them. `ResolvedEvent` is what comes out of extraction: always
//! zoned to the configured timezone, never naive.

use std::fmt;

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// A start or end value as written in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTime {
    /// All-day value (`VALUE=DATE`)
    Date(NaiveDate),
    /// UTC instant (trailing `Z`)
    DateTimeUtc(DateTime<Utc>),
    /// Wall-clock time with no zone attached
    DateTimeFloating(NaiveDateTime),
    /// Wall-clock time in a named zone (`TZID=...`)
    DateTimeZoned { datetime: NaiveDateTime, tzid: String },
}

impl EventTime {
    /// True when the value has no time-of-day component.
    pub fn is_date(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    /// Resolve into the local timezone.
    ///
    /// Dates become local midnight. Floating times and zones the tz database
    /// does not know are read as local wall-clock time.
    pub fn to_zoned(&self, tz: Tz) -> Option<DateTime<Tz>> {
        match self {
            EventTime::Date(d) => start_of_day(*d, tz),
            EventTime::DateTimeUtc(dt) => Some(dt.with_timezone(&tz)),
            EventTime::DateTimeFloating(naive) => localize(tz, *naive),
            EventTime::DateTimeZoned { datetime, tzid } => match tzid.parse::<Tz>() {
                Ok(source) => localize(source, *datetime).map(|dt| dt.with_timezone(&tz)),
                Err(_) => {
                    tracing::debug!(tzid = %tzid, "unknown TZID, reading as local time");
                    localize(tz, *datetime)
                }
            },
        }
    }

    /// Calendar date of this value as seen in `tz`.
    pub fn local_date(&self, tz: Tz) -> Option<NaiveDate> {
        match self {
            EventTime::Date(d) => Some(*d),
            _ => self.to_zoned(tz).map(|dt| dt.date_naive()),
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            EventTime::DateTimeUtc(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%SZ")),
            EventTime::DateTimeFloating(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            EventTime::DateTimeZoned { datetime, tzid } => {
                write!(f, "{} ({})", datetime.format("%Y-%m-%dT%H:%M:%S"), tzid)
            }
        }
    }
}

/// Recurrence data of a master event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recurrence {
    /// The RRULE value, without the `RRULE:` prefix
    pub rrule: String,
    /// Excluded occurrences
    pub exdates: Vec<EventTime>,
}

/// One VEVENT as parsed from the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCalendarEntry {
    pub summary: String,
    pub start: Option<EventTime>,
    pub end: Option<EventTime>,
    /// Explicit DURATION, used when there is no DTEND
    pub duration: Option<Duration>,
    pub recurrence: Option<Recurrence>,
}

impl RawCalendarEntry {
    /// Length of the first occurrence: DTEND - DTSTART, else DURATION, else zero.
    pub fn anchor_duration(&self, tz: Tz) -> Duration {
        let from_end = match (&self.start, &self.end) {
            (Some(start), Some(end)) => match (start.to_zoned(tz), end.to_zoned(tz)) {
                (Some(s), Some(e)) => Some(e - s),
                _ => None,
            },
            _ => None,
        };

        from_end
            .or(self.duration)
            .filter(|d| *d >= Duration::zero())
            .unwrap_or_else(Duration::zero)
    }
}

/// An event instance on a concrete day, resolved into local time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEvent {
    pub is_all_day: bool,
    pub title: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl ResolvedEvent {
    /// Build an all-day event spanning 00:00:00 to 23:59:59 of `date`.
    pub fn all_day(title: &str, date: NaiveDate, tz: Tz) -> Option<Self> {
        Some(ResolvedEvent {
            is_all_day: true,
            title: title.to_string(),
            start: start_of_day(date, tz)?,
            end: end_of_day(date, tz)?,
        })
    }

    /// Build a timed event, clamping an end before the start to the start.
    pub fn timed(title: &str, start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        ResolvedEvent {
            is_all_day: false,
            title: title.to_string(),
            start,
            end: end.max(start),
        }
    }

    pub fn is_in_progress(&self, now: DateTime<Tz>) -> bool {
        self.start < now && now < self.end
    }
}

impl fmt::Display for ResolvedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// The ordered events of a single day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agenda {
    pub date: NaiveDate,
    events: Vec<ResolvedEvent>,
}

impl Agenda {
    /// Wrap events that are already deduplicated and sorted by start.
    pub(crate) fn new(date: NaiveDate, events: Vec<ResolvedEvent>) -> Self {
        Agenda { date, events }
    }

    pub fn empty(date: NaiveDate) -> Self {
        Agenda {
            date,
            events: Vec::new(),
        }
    }

    pub fn events(&self) -> &[ResolvedEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResolvedEvent> {
        self.events.iter()
    }
}

impl<'a> IntoIterator for &'a Agenda {
    type Item = &'a ResolvedEvent;
    type IntoIter = std::slice::Iter<'a, ResolvedEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Attach `tz` to a wall-clock time.
///
/// Ambiguous times (DST fall-back) take the earlier instant. Times inside a
/// DST gap are pushed forward by an hour.
pub fn localize(tz: Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest(),
    }
}

/// Local midnight of `date`.
pub fn start_of_day(date: NaiveDate, tz: Tz) -> Option<DateTime<Tz>> {
    localize(tz, date.and_time(NaiveTime::MIN))
}

/// 23:59:59 local time of `date`.
pub fn end_of_day(date: NaiveDate, tz: Tz) -> Option<DateTime<Tz>> {
    localize(tz, date.and_hms_opt(23, 59, 59)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use chrono_tz::America::New_York;
    use chrono_tz::Europe::Berlin;

    fn naive(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_utc_time_converts_to_local() {
        let t = EventTime::DateTimeUtc(Utc.with_ymd_and_hms(2024, 3, 28, 14, 0, 0).unwrap());
        let local = t.to_zoned(New_York).unwrap();
        assert_eq!(local.hour(), 10);
        assert_eq!(local.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 28).unwrap());
    }

    #[test]
    fn test_zoned_time_converts_between_zones() {
        let t = EventTime::DateTimeZoned {
            datetime: naive(2024, 3, 28, 16, 0),
            tzid: "Europe/Berlin".to_string(),
        };
        let local = t.to_zoned(New_York).unwrap();
        assert_eq!(local.hour(), 11);
    }

    #[test]
    fn test_unknown_tzid_reads_as_local() {
        let t = EventTime::DateTimeZoned {
            datetime: naive(2024, 3, 28, 9, 30),
            tzid: "W. Europe Standard Time".to_string(),
        };
        let local = t.to_zoned(Berlin).unwrap();
        assert_eq!((local.hour(), local.minute()), (9, 30));
    }

    #[test]
    fn test_local_date_of_late_utc_time_is_previous_day() {
        let t = EventTime::DateTimeUtc(Utc.with_ymd_and_hms(2024, 3, 29, 2, 0, 0).unwrap());
        assert_eq!(
            t.local_date(New_York),
            Some(NaiveDate::from_ymd_opt(2024, 3, 28).unwrap())
        );
    }

    #[test]
    fn test_localize_skips_dst_gap() {
        // 02:30 does not exist in New York on 2024-03-10
        let dt = localize(New_York, naive(2024, 3, 10, 2, 30)).unwrap();
        assert_eq!(dt.hour(), 3);
    }

    #[test]
    fn test_anchor_duration_prefers_dtend() {
        let entry = RawCalendarEntry {
            summary: "Standup".to_string(),
            start: Some(EventTime::DateTimeFloating(naive(2024, 1, 1, 9, 0))),
            end: Some(EventTime::DateTimeFloating(naive(2024, 1, 1, 9, 15))),
            duration: Some(Duration::hours(2)),
            recurrence: None,
        };
        assert_eq!(entry.anchor_duration(Berlin), Duration::minutes(15));
    }

    #[test]
    fn test_anchor_duration_falls_back_to_duration_then_zero() {
        let mut entry = RawCalendarEntry {
            summary: "Focus".to_string(),
            start: Some(EventTime::DateTimeFloating(naive(2024, 1, 1, 9, 0))),
            end: None,
            duration: Some(Duration::minutes(90)),
            recurrence: None,
        };
        assert_eq!(entry.anchor_duration(Berlin), Duration::minutes(90));

        entry.duration = None;
        assert_eq!(entry.anchor_duration(Berlin), Duration::zero());
    }

    #[test]
    fn test_timed_event_clamps_end() {
        let start = Berlin.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let end = Berlin.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let event = ResolvedEvent::timed("Backwards", start, end);
        assert_eq!(event.end, event.start);
    }

    #[test]
    fn test_in_progress_is_strict() {
        let start = Berlin.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let end = Berlin.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap();
        let event = ResolvedEvent::timed("Review", start, end);
        assert!(!event.is_in_progress(start));
        assert!(event.is_in_progress(start + Duration::minutes(1)));
        assert!(!event.is_in_progress(end));
    }
}
