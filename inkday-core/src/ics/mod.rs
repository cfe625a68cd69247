//! ICS feed parsing.
//!
//! Only the parts of RFC 5545 needed to answer "what happens on this day" are
//! read: SUMMARY, DTSTART, DTEND, DURATION, RRULE and EXDATE.

mod parse;

pub use parse::{parse_calendar, parse_entry_text};
