//! ICS parsing using the icalendar crate's parser.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{Component, Property, read_calendar, unfold},
};

use crate::error::{InkdayError, InkdayResult};
use crate::event::{EventTime, RawCalendarEntry, Recurrence};

/// Parse a whole feed into raw entries.
///
/// A document the parser cannot read at all is an error. A single VEVENT with a
/// broken DTSTART is logged and left out, the rest of the feed still comes
/// through.
pub fn parse_calendar(content: &str) -> InkdayResult<Vec<RawCalendarEntry>> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).map_err(|e| InkdayError::IcsParse(e.to_string()))?;

    let mut vevents = Vec::new();
    collect_vevents(&calendar.components, &mut vevents);

    let entries = vevents
        .into_iter()
        .filter_map(|vevent| match parse_vevent(vevent) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "skipping calendar entry");
                None
            }
        })
        .collect();

    Ok(entries)
}

/// Parse the first VEVENT of a document.
pub fn parse_entry_text(content: &str) -> Option<RawCalendarEntry> {
    parse_calendar(content).ok()?.into_iter().next()
}

/// VEVENTs may sit at the top level or inside VCALENDAR.
fn collect_vevents<'a>(components: &'a [Component<'a>], out: &mut Vec<&'a Component<'a>>) {
    for component in components {
        if component.name == "VEVENT" {
            out.push(component);
        } else {
            collect_vevents(&component.components, out);
        }
    }
}

fn parse_vevent(vevent: &Component) -> InkdayResult<RawCalendarEntry> {
    let summary = vevent
        .find_prop("SUMMARY")
        .map(|p| p.val.to_string())
        .unwrap_or_default();

    let start = vevent
        .find_prop("DTSTART")
        .map(|p| parse_time_property(p, &summary))
        .transpose()?;

    // A broken DTEND or DURATION only costs us the end, not the entry
    let end = vevent
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_event_time);

    let duration = vevent
        .find_prop("DURATION")
        .and_then(|p| parse_duration(p.val.as_ref()));

    let rrule = vevent.find_prop("RRULE").map(|p| p.val.to_string());
    let exdates: Vec<EventTime> = vevent
        .properties
        .iter()
        .filter(|p| p.name == "EXDATE")
        .flat_map(parse_exdate_property)
        .collect();
    let recurrence = rrule.map(|rrule| Recurrence { rrule, exdates });

    Ok(RawCalendarEntry {
        summary,
        start,
        end,
        duration,
        recurrence,
    })
}

fn parse_time_property(prop: &Property, summary: &str) -> InkdayResult<EventTime> {
    DatePerhapsTime::try_from(prop).map(to_event_time).map_err(|_| {
        InkdayError::IcsParse(format!(
            "unreadable {} '{}' on '{}'",
            prop.name.as_ref(),
            prop.val.as_ref(),
            summary
        ))
    })
}

/// Convert icalendar's DatePerhapsTime to our EventTime, preserving timezone info
fn to_event_time(dpt: DatePerhapsTime) -> EventTime {
    match dpt {
        DatePerhapsTime::Date(d) => EventTime::Date(d),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            CalendarDateTime::Utc(dt) => EventTime::DateTimeUtc(dt),
            CalendarDateTime::Floating(naive) => EventTime::DateTimeFloating(naive),
            CalendarDateTime::WithTimezone { date_time, tzid } => EventTime::DateTimeZoned {
                datetime: date_time,
                tzid,
            },
        },
    }
}

/// Parse a DURATION value (`PT1H30M`, `P1D`). Negative durations are ignored.
fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim().trim_start_matches('+');
    if value.starts_with('-') {
        return None;
    }

    let duration = iso8601::duration(value).ok()?;
    let std_duration: std::time::Duration = duration.into();
    Duration::from_std(std_duration).ok()
}

/// Parse an EXDATE property into a list of EventTime values.
///
/// Handles `TZID=`, `VALUE=DATE`, UTC and floating values, and comma-separated
/// lists.
fn parse_exdate_property(prop: &Property) -> Vec<EventTime> {
    let tzid = prop
        .params
        .iter()
        .find(|p| p.key == "TZID")
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()));

    let is_date = prop
        .params
        .iter()
        .any(|p| p.key == "VALUE" && p.val.as_ref().map(|v| v.as_ref()) == Some("DATE"));

    prop.val
        .as_ref()
        .split(',')
        .filter_map(|s| {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if is_date || s.len() == 8 {
                NaiveDate::parse_from_str(s, "%Y%m%d")
                    .ok()
                    .map(EventTime::Date)
            } else if let Some(tz) = &tzid {
                NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| EventTime::DateTimeZoned {
                        datetime: dt,
                        tzid: tz.clone(),
                    })
            } else if let Some(utc) = s.strip_suffix('Z') {
                NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| EventTime::DateTimeUtc(dt.and_utc()))
            } else {
                NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(EventTime::DateTimeFloating)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn wrap(body: &str) -> String {
        format!("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:TEST\r\n{body}END:VCALENDAR\r\n")
    }

    #[test]
    fn test_parse_utc_event() {
        let ics = wrap(
            "BEGIN:VEVENT\r\nUID:a\r\nSUMMARY:Dentist\r\nDTSTART:20240328T140000Z\r\nDTEND:20240328T150000Z\r\nEND:VEVENT\r\n",
        );

        let entries = parse_calendar(&ics).expect("Should parse");
        assert_eq!(entries.len(), 1);

        let entry = &entries[0];
        assert_eq!(entry.summary, "Dentist");
        assert_eq!(
            entry.start,
            Some(EventTime::DateTimeUtc(
                Utc.with_ymd_and_hms(2024, 3, 28, 14, 0, 0).unwrap()
            ))
        );
        assert!(entry.recurrence.is_none());
    }

    #[test]
    fn test_parse_all_day_event() {
        let ics = wrap(
            "BEGIN:VEVENT\r\nUID:b\r\nSUMMARY:Holiday\r\nDTSTART;VALUE=DATE:20240328\r\nDTEND;VALUE=DATE:20240329\r\nEND:VEVENT\r\n",
        );

        let entry = parse_entry_text(&ics).expect("Should parse");
        assert_eq!(
            entry.start,
            Some(EventTime::Date(NaiveDate::from_ymd_opt(2024, 3, 28).unwrap()))
        );
        assert!(entry.start.as_ref().unwrap().is_date());
    }

    #[test]
    fn test_parse_zoned_start_keeps_tzid() {
        let ics = wrap(
            "BEGIN:VEVENT\r\nUID:c\r\nSUMMARY:Call\r\nDTSTART;TZID=Europe/Berlin:20240328T090000\r\nEND:VEVENT\r\n",
        );

        let entry = parse_entry_text(&ics).expect("Should parse");
        match entry.start {
            Some(EventTime::DateTimeZoned { tzid, .. }) => assert_eq!(tzid, "Europe/Berlin"),
            other => panic!("Expected DateTimeZoned, got {:?}", other),
        }
        assert!(entry.end.is_none());
    }

    #[test]
    fn test_parse_duration_property() {
        let ics = wrap(
            "BEGIN:VEVENT\r\nUID:d\r\nSUMMARY:Run\r\nDTSTART:20240328T060000Z\r\nDURATION:PT1H30M\r\nEND:VEVENT\r\n",
        );

        let entry = parse_entry_text(&ics).expect("Should parse");
        assert_eq!(entry.duration, Some(Duration::minutes(90)));
    }

    #[test]
    fn test_parse_recurrence_with_exdates() {
        let ics = wrap(
            "BEGIN:VEVENT\r\nUID:e\r\nSUMMARY:Weekly\r\nDTSTART:20240101T100000Z\r\nDTEND:20240101T110000Z\r\nRRULE:FREQ=WEEKLY;BYDAY=MO\r\nEXDATE;TZID=America/New_York:20240108T100000,20240115T100000\r\nEXDATE:20240122T100000Z\r\nEND:VEVENT\r\n",
        );

        let entry = parse_entry_text(&ics).expect("Should parse");
        let recurrence = entry.recurrence.expect("Should have recurrence");
        assert_eq!(recurrence.rrule, "FREQ=WEEKLY;BYDAY=MO");
        assert_eq!(recurrence.exdates.len(), 3);
        assert!(matches!(recurrence.exdates[2], EventTime::DateTimeUtc(_)));
    }

    #[test]
    fn test_missing_summary_is_empty_title() {
        let ics = wrap("BEGIN:VEVENT\r\nUID:f\r\nDTSTART:20240328T140000Z\r\nEND:VEVENT\r\n");
        let entry = parse_entry_text(&ics).expect("Should parse");
        assert_eq!(entry.summary, "");
    }

    #[test]
    fn test_broken_dtstart_skips_only_that_entry() {
        let ics = wrap(
            "BEGIN:VEVENT\r\nUID:g\r\nSUMMARY:Broken\r\nDTSTART:not-a-date\r\nEND:VEVENT\r\nBEGIN:VEVENT\r\nUID:h\r\nSUMMARY:Fine\r\nDTSTART:20240328T140000Z\r\nEND:VEVENT\r\n",
        );

        let entries = parse_calendar(&ics).expect("Should parse");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].summary, "Fine");
    }

    #[test]
    fn test_negative_duration_is_ignored() {
        assert_eq!(parse_duration("-PT15M"), None);
        assert_eq!(parse_duration("P1D"), Some(Duration::days(1)));
    }
}
