//! Per-day agenda extraction.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use chrono_tz::Tz;

use crate::error::{InkdayError, InkdayResult};
use crate::event::{Agenda, EventTime, RawCalendarEntry, ResolvedEvent, start_of_day};
use crate::recurrence;

/// Build the agenda of `target` from raw feed entries.
///
/// Entries that fail to resolve are logged and skipped. Events sharing a title
/// with an already accepted event are dropped, first seen wins. The result is
/// stably sorted by start.
pub fn extract(entries: &[RawCalendarEntry], target: NaiveDate, tz: Tz) -> Agenda {
    let mut seen_titles: HashSet<String> = HashSet::new();
    let mut events: Vec<ResolvedEvent> = Vec::new();

    for entry in entries {
        let event = match resolve_entry(entry, target, tz) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(summary = %entry.summary, error = %e, "skipping calendar entry");
                continue;
            }
        };

        if !seen_titles.insert(event.title.clone()) {
            tracing::debug!(title = %event.title, %target, "dropping duplicate title");
            continue;
        }
        events.push(event);
    }

    events.sort_by_key(|e| e.start);
    Agenda::new(target, events)
}

/// Resolve one entry against `target`. `Ok(None)` means nothing happens that day.
fn resolve_entry(
    entry: &RawCalendarEntry,
    target: NaiveDate,
    tz: Tz,
) -> InkdayResult<Option<ResolvedEvent>> {
    match (&entry.recurrence, &entry.start) {
        (Some(recurrence), Some(anchor)) => {
            let midnight = start_of_day(target, tz).ok_or_else(|| missing_local_time(target, tz))?;
            // Date-anchored rules land exactly on midnight; step back so that one counts
            let reference = if anchor.is_date() {
                midnight - Duration::seconds(1)
            } else {
                midnight
            };

            let Some(occurrence) = recurrence::resolve(recurrence, anchor, reference, tz)? else {
                return Ok(None);
            };
            if occurrence.date_naive() != target {
                return Ok(None);
            }

            if anchor.is_date() {
                return all_day(entry, target, tz).map(Some);
            }

            let end = occurrence + entry.anchor_duration(tz);
            Ok(Some(ResolvedEvent::timed(&entry.summary, occurrence, end)))
        }
        (None, Some(start)) => resolve_single(entry, start, target, tz),
        (_, None) => Ok(None),
    }
}

fn resolve_single(
    entry: &RawCalendarEntry,
    start: &EventTime,
    target: NaiveDate,
    tz: Tz,
) -> InkdayResult<Option<ResolvedEvent>> {
    if let EventTime::Date(date) = start {
        if *date != target {
            return Ok(None);
        }
        return all_day(entry, *date, tz).map(Some);
    }

    let start_local = start.to_zoned(tz).ok_or_else(|| {
        InkdayError::Time(format!("start {} of '{}' has no local time", start, entry.summary))
    })?;
    if start_local.date_naive() != target {
        return Ok(None);
    }

    let end_local = match &entry.end {
        Some(EventTime::Date(end_date)) => crate::event::end_of_day(*end_date, tz),
        Some(end) => end.to_zoned(tz),
        None => Some(start_local + entry.duration.unwrap_or_else(Duration::zero)),
    }
    .unwrap_or(start_local);

    Ok(Some(ResolvedEvent::timed(&entry.summary, start_local, end_local)))
}

fn all_day(entry: &RawCalendarEntry, date: NaiveDate, tz: Tz) -> InkdayResult<ResolvedEvent> {
    ResolvedEvent::all_day(&entry.summary, date, tz).ok_or_else(|| missing_local_time(date, tz))
}

fn missing_local_time(date: NaiveDate, tz: Tz) -> InkdayError {
    InkdayError::Time(format!("{} has no local midnight in {}", date, tz.name()))
}
