//! RRULE resolution for recurring events.
//!
//! The display only ever asks one question of a recurring event: does it have
//! an instance on this day, and when does it start. Rules are evaluated in the
//! configured timezone so an event keeps its wall-clock time across DST.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;

use crate::error::{InkdayError, InkdayResult};
use crate::event::{EventTime, Recurrence, end_of_day, localize};

const UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Build an iCalendar-format rule string for the rrule crate parser.
///
/// DTSTART and every EXDATE are expressed in `tz` so that excluded
/// occurrences line up exactly with generated ones.
fn build_rrule_string(anchor: &EventTime, recurrence: &Recurrence, tz: Tz) -> InkdayResult<String> {
    let mut lines = Vec::new();

    let dtstart = anchor.to_zoned(tz).ok_or_else(|| {
        InkdayError::Recurrence(format!("anchor {} does not exist in {}", anchor, tz.name()))
    })?;
    lines.push(format!(
        "DTSTART;TZID={}:{}",
        tz.name(),
        dtstart.format("%Y%m%dT%H%M%S")
    ));

    let rrule = recurrence.rrule.trim();
    let rrule = rrule.strip_prefix("RRULE:").unwrap_or(rrule);
    lines.push(format!("RRULE:{}", until_in_utc(rrule, tz)?));

    for exdate in &recurrence.exdates {
        match exdate.to_zoned(tz) {
            Some(dt) => lines.push(format!(
                "EXDATE;TZID={}:{}",
                tz.name(),
                dt.format("%Y%m%dT%H%M%S")
            )),
            None => tracing::debug!(exdate = %exdate, "dropping EXDATE outside local time"),
        }
    }

    Ok(lines.join("\n"))
}

/// Rewrite a date or floating `UNTIL` as a UTC instant.
///
/// With a zoned DTSTART the rrule crate only accepts UTC bounds. A date bound
/// covers the whole day, so it becomes 23:59:59 local time on that day.
fn until_in_utc(rrule: &str, tz: Tz) -> InkdayResult<String> {
    let parts = rrule
        .split(';')
        .map(|part| match part.split_once('=') {
            Some((key, value)) if key.eq_ignore_ascii_case("UNTIL") => {
                Ok(format!("{key}={}", utc_bound(value, tz)?))
            }
            _ => Ok(part.to_string()),
        })
        .collect::<InkdayResult<Vec<_>>>()?;

    Ok(parts.join(";"))
}

fn utc_bound(value: &str, tz: Tz) -> InkdayResult<String> {
    let value = value.trim();
    if value.ends_with(['Z', 'z']) {
        return Ok(value.to_string());
    }

    let local = if value.len() == 8 {
        NaiveDate::parse_from_str(value, "%Y%m%d")
            .ok()
            .and_then(|date| end_of_day(date, tz))
    } else {
        NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
            .ok()
            .and_then(|naive| localize(tz, naive))
    };

    local
        .map(|dt| dt.with_timezone(&Utc).format(UTC_FORMAT).to_string())
        .ok_or_else(|| InkdayError::Recurrence(format!("invalid UNTIL '{value}'")))
}

/// Find the first occurrence strictly after `reference`.
///
/// `reference` is normally local midnight of the day being asked about. The
/// caller decides whether the returned occurrence lands on that day.
pub fn resolve(
    recurrence: &Recurrence,
    anchor: &EventTime,
    reference: DateTime<Tz>,
    tz: Tz,
) -> InkdayResult<Option<DateTime<Tz>>> {
    let rule_text = build_rrule_string(anchor, recurrence, tz)?;

    let rrule_set: RRuleSet = rule_text.parse().map_err(|e| {
        InkdayError::Recurrence(format!("failed to parse RRULE '{}': {}", recurrence.rrule, e))
    })?;

    // Ask for two so an occurrence sitting exactly on `reference` can be stepped over
    let utc: rrule::Tz = Utc.into();
    let after = reference.with_timezone(&utc);
    let result = rrule_set.after(after).all(2);

    Ok(result
        .dates
        .iter()
        .map(|dt| dt.with_timezone(&tz))
        .find(|dt| *dt > reference))
}
