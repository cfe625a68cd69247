//! What the display shows from the agenda right now.

use chrono::DateTime;
use chrono_tz::Tz;

use crate::event::{Agenda, ResolvedEvent};

/// Number of event rows the display has room for.
pub const MAX_RENDERED_EVENTS: usize = 3;

/// Which day the displayed events belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgendaDay {
    Today,
    Tomorrow,
    /// Nothing left today and nothing tomorrow
    Empty,
}

/// The selection handed to the renderer and the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaView {
    pub day: AgendaDay,
    /// At most `MAX_RENDERED_EVENTS` events, in agenda order
    pub rendered: Vec<ResolvedEvent>,
    /// Displayed events that did not fit
    pub overflow: usize,
    /// Size of the whole agenda of `day`, past events included
    pub total_count: usize,
    /// Events of `day` that have not ended yet
    pub remaining_count: usize,
}

impl AgendaView {
    /// Pick today's unfinished events, or tomorrow's agenda once today is done.
    pub fn select(today: &Agenda, tomorrow: &Agenda, now: DateTime<Tz>) -> Self {
        let remaining_today: Vec<&ResolvedEvent> = today.iter().filter(|e| e.end > now).collect();

        let (day, displayed, total_count) = if !remaining_today.is_empty() {
            (AgendaDay::Today, remaining_today, today.len())
        } else if !tomorrow.is_empty() {
            (AgendaDay::Tomorrow, tomorrow.iter().collect(), tomorrow.len())
        } else {
            (AgendaDay::Empty, Vec::new(), 0)
        };

        let remaining_count = displayed.len();
        let overflow = displayed.len().saturating_sub(MAX_RENDERED_EVENTS);
        let rendered = displayed
            .into_iter()
            .take(MAX_RENDERED_EVENTS)
            .cloned()
            .collect();

        AgendaView {
            day,
            rendered,
            overflow,
            total_count,
            remaining_count,
        }
    }

    /// Status line shown under the event rows.
    pub fn footer(&self) -> String {
        match self.day {
            AgendaDay::Today => format!(
                "Today: {} total, {} left",
                self.total_count, self.remaining_count
            ),
            AgendaDay::Tomorrow => format!("Tomorrow: {} events", self.total_count),
            AgendaDay::Empty => "No upcoming events today or tomorrow".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};
    use chrono_tz::Europe::Berlin;

    fn at(day: u32, h: u32) -> DateTime<Tz> {
        Berlin.with_ymd_and_hms(2024, 3, day, h, 0, 0).unwrap()
    }

    fn event(title: &str, day: u32, h: u32) -> ResolvedEvent {
        ResolvedEvent::timed(title, at(day, h), at(day, h) + Duration::hours(1))
    }

    fn agenda(day: u32, events: Vec<ResolvedEvent>) -> Agenda {
        Agenda::new(NaiveDate::from_ymd_opt(2024, 3, day).unwrap(), events)
    }

    #[test]
    fn test_shows_remaining_today_with_full_count() {
        let today = agenda(28, vec![event("Past", 28, 8), event("Next", 28, 14)]);
        let tomorrow = agenda(29, vec![event("Tomorrow", 29, 9)]);

        let view = AgendaView::select(&today, &tomorrow, at(28, 12));
        assert_eq!(view.day, AgendaDay::Today);
        assert_eq!(view.rendered.len(), 1);
        assert_eq!(view.rendered[0].title, "Next");
        assert_eq!(view.total_count, 2);
        assert_eq!(view.footer(), "Today: 2 total, 1 left");
    }

    #[test]
    fn test_in_progress_event_still_counts_as_remaining() {
        let today = agenda(28, vec![event("Now", 28, 12)]);
        let view = AgendaView::select(&today, &agenda(29, vec![]), at(28, 12) + Duration::minutes(30));
        assert_eq!(view.day, AgendaDay::Today);
        assert_eq!(view.rendered.len(), 1);
    }

    #[test]
    fn test_falls_back_to_tomorrow_when_today_is_over() {
        let today = agenda(28, vec![event("Morning", 28, 8), event("Noon", 28, 12)]);
        let tomorrow = agenda(
            29,
            vec![event("A", 29, 9), event("B", 29, 10), event("C", 29, 11)],
        );

        let view = AgendaView::select(&today, &tomorrow, at(28, 20));
        assert_eq!(view.day, AgendaDay::Tomorrow);
        assert_eq!(view.total_count, 3);
        assert_eq!(view.rendered.len(), 3);
        assert_eq!(view.footer(), "Tomorrow: 3 events");
    }

    #[test]
    fn test_no_events_at_all() {
        let view = AgendaView::select(&agenda(28, vec![]), &agenda(29, vec![]), at(28, 9));
        assert_eq!(view.day, AgendaDay::Empty);
        assert!(view.rendered.is_empty());
        assert_eq!(view.total_count, 0);
        assert_eq!(view.overflow, 0);
        assert_eq!(view.footer(), "No upcoming events today or tomorrow");
    }

    #[test]
    fn test_overflow_beyond_three_rows() {
        let today = agenda(
            28,
            (0..5).map(|i| event(&format!("E{i}"), 28, 10 + i)).collect(),
        );

        let view = AgendaView::select(&today, &agenda(29, vec![]), at(28, 9));
        assert_eq!(MAX_RENDERED_EVENTS, 3);
        assert_eq!(view.rendered.len(), 3);
        assert_eq!(view.overflow, 2);
        let titles: Vec<&str> = view.rendered.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["E0", "E1", "E2"]);
    }

    #[test]
    fn test_event_ending_exactly_now_is_past() {
        let today = agenda(28, vec![event("Done", 28, 11)]);
        let tomorrow = agenda(29, vec![event("Later", 29, 9)]);
        let view = AgendaView::select(&today, &tomorrow, at(28, 12));
        assert_eq!(view.day, AgendaDay::Tomorrow);
    }
}
