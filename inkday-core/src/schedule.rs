//! Refresh scheduling.
//!
//! Each cycle produces a set of candidate wake times: the next poll, plus a
//! point just after every rendered event starts and ends so the display flips
//! an event to "in progress" and drops it once it is over. Quiet hours replace
//! the whole set with the first hour the display is allowed to be awake.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Timelike};
use chrono_tz::Tz;

use crate::error::{InkdayError, InkdayResult};
use crate::event::ResolvedEvent;

/// Delay after an event boundary before refreshing.
pub const BOUNDARY_DELAY: Duration = Duration::seconds(15);

/// Two wakes closer than this are merged into the later one.
pub const MIN_WAKE_SEPARATION: Duration = Duration::minutes(2);

/// Hours of the day (0-23) during which the display stays blank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffHours(BTreeSet<u32>);

impl OffHours {
    pub fn new(hours: impl IntoIterator<Item = u32>) -> InkdayResult<Self> {
        let mut set = BTreeSet::new();
        for hour in hours {
            if hour > 23 {
                return Err(InkdayError::Config(format!(
                    "off-hour {hour} is outside 0-23"
                )));
            }
            set.insert(hour);
        }
        Ok(OffHours(set))
    }

    pub fn contains(&self, hour: u32) -> bool {
        self.0.contains(&hour)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Start of the first hour after `now` that is not an off-hour.
    ///
    /// When every hour is off, the start of the next hour is returned.
    pub fn next_awake_hour(&self, now: DateTime<Tz>) -> DateTime<Tz> {
        let hour_start = truncate_to_hour(now);

        (1..=24)
            .map(|step| hour_start + Duration::hours(step))
            .find(|candidate| !self.contains(candidate.hour()))
            .unwrap_or(hour_start + Duration::hours(1))
    }
}

impl FromStr for OffHours {
    type Err = InkdayError;

    /// Parse a comma-separated list such as `23,0,1,2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hours = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<u32>()
                    .map_err(|_| InkdayError::Config(format!("invalid off-hour '{part}'")))
            })
            .collect::<InkdayResult<Vec<u32>>>()?;

        OffHours::new(hours)
    }
}

impl fmt::Display for OffHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours: Vec<String> = self.0.iter().map(u32::to_string).collect();
        write!(f, "{}", hours.join(","))
    }
}

/// Drop minutes, seconds and sub-seconds. Done by subtraction so zones with
/// non-hour offsets still land on a local hour boundary.
fn truncate_to_hour(dt: DateTime<Tz>) -> DateTime<Tz> {
    dt - Duration::minutes(i64::from(dt.minute()))
        - Duration::seconds(i64::from(dt.second()))
        - Duration::nanoseconds(i64::from(dt.nanosecond()))
}

/// The wake decision of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakePlan {
    /// Normal operation: refresh at `wake_at`.
    Refresh { wake_at: DateTime<Tz> },
    /// Inside quiet hours: blank the display and sleep until `wake_at`.
    OffHours { wake_at: DateTime<Tz> },
}

impl WakePlan {
    pub fn wake_at(&self) -> DateTime<Tz> {
        match self {
            WakePlan::Refresh { wake_at } | WakePlan::OffHours { wake_at } => *wake_at,
        }
    }

    pub fn is_off_hours(&self) -> bool {
        matches!(self, WakePlan::OffHours { .. })
    }
}

/// Future instants the process may resume at, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakeSet(Vec<DateTime<Tz>>);

impl WakeSet {
    pub fn instants(&self) -> &[DateTime<Tz>] {
        &self.0
    }

    pub fn earliest(&self) -> Option<DateTime<Tz>> {
        self.0.first().copied()
    }
}

/// Computes wake times from the poll interval, rendered events and quiet hours.
#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    poll_interval: Duration,
    off_hours: OffHours,
}

impl RefreshScheduler {
    pub fn new(poll_interval: Duration, off_hours: OffHours) -> Self {
        RefreshScheduler {
            poll_interval,
            off_hours,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Raw candidates generated at the start of a cycle.
    ///
    /// All-day rows look the same all day, so only timed events add boundaries.
    pub fn candidates(
        &self,
        generated_at: DateTime<Tz>,
        rendered: &[ResolvedEvent],
    ) -> Vec<DateTime<Tz>> {
        let mut candidates = vec![generated_at + self.poll_interval];
        for event in rendered.iter().filter(|e| !e.is_all_day) {
            candidates.push(event.start + BOUNDARY_DELAY);
            candidates.push(event.end + BOUNDARY_DELAY);
        }
        candidates
    }

    /// Filter, override and debounce `candidates` against a fresh `now`.
    pub fn wake_set(&self, candidates: Vec<DateTime<Tz>>, now: DateTime<Tz>) -> WakeSet {
        if self.off_hours.contains(now.hour()) {
            return WakeSet(vec![self.off_hours.next_awake_hour(now)]);
        }

        let mut future: Vec<DateTime<Tz>> = candidates.into_iter().filter(|t| *t > now).collect();
        future.sort();

        // Only the head pair is merged
        if future.len() > 1 && future[1] - future[0] < MIN_WAKE_SEPARATION {
            future.remove(0);
        }

        WakeSet(future)
    }

    /// Decide the next wake from candidates generated earlier in the cycle.
    pub fn plan(&self, candidates: Vec<DateTime<Tz>>, now: DateTime<Tz>) -> InkdayResult<WakePlan> {
        let off_hours = self.off_hours.contains(now.hour());
        let wake_at = self
            .wake_set(candidates, now)
            .earliest()
            .ok_or(InkdayError::EmptyWakeSet)?;

        Ok(if off_hours {
            WakePlan::OffHours { wake_at }
        } else {
            WakePlan::Refresh { wake_at }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Kolkata;
    use chrono_tz::Europe::Berlin;

    fn at(day: u32, h: u32, m: u32, s: u32) -> DateTime<Tz> {
        Berlin.with_ymd_and_hms(2024, 3, day, h, m, s).unwrap()
    }

    fn scheduler(off_hours: &str) -> RefreshScheduler {
        RefreshScheduler::new(Duration::minutes(5), off_hours.parse().unwrap())
    }

    #[test]
    fn test_all_day_events_add_no_candidates() {
        let now = at(28, 10, 0, 0);
        let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 28).unwrap();
        let holiday = ResolvedEvent::all_day("Holiday", date, Berlin).unwrap();
        let review = ResolvedEvent::timed("Review", at(28, 11, 0, 0), at(28, 12, 0, 0));

        let candidates = scheduler("").candidates(now, &[holiday, review]);
        assert_eq!(
            candidates,
            vec![at(28, 10, 5, 0), at(28, 11, 0, 15), at(28, 12, 0, 15)]
        );
    }

    #[test]
    fn test_candidates_include_poll_and_event_boundaries() {
        let now = at(28, 10, 0, 0);
        let event = ResolvedEvent::timed("Review", at(28, 11, 0, 0), at(28, 12, 0, 0));

        let candidates = scheduler("").candidates(now, &[event]);
        assert_eq!(
            candidates,
            vec![
                at(28, 10, 5, 0),
                at(28, 11, 0, 15),
                at(28, 12, 0, 15),
            ]
        );
    }

    #[test]
    fn test_past_candidates_are_dropped() {
        let generated = at(28, 10, 0, 0);
        let event = ResolvedEvent::timed("Started", at(28, 9, 0, 0), at(28, 10, 30, 0));
        let s = scheduler("");

        let set = s.wake_set(s.candidates(generated, &[event]), at(28, 10, 1, 0));
        assert_eq!(set.instants(), &[at(28, 10, 5, 0), at(28, 10, 30, 15)]);
    }

    #[test]
    fn test_candidate_equal_to_now_is_dropped() {
        let s = scheduler("");
        let set = s.wake_set(vec![at(28, 10, 0, 0), at(28, 10, 5, 0)], at(28, 10, 0, 0));
        assert_eq!(set.instants(), &[at(28, 10, 5, 0)]);
    }

    #[test]
    fn test_debounce_merges_close_head_pair() {
        let s = scheduler("");
        let now = at(28, 10, 0, 0);

        let set = s.wake_set(vec![at(28, 10, 11, 30), at(28, 10, 10, 0)], now);
        assert_eq!(set.instants(), &[at(28, 10, 11, 30)]);

        let set = s.wake_set(vec![at(28, 10, 13, 0), at(28, 10, 10, 0)], now);
        assert_eq!(set.instants(), &[at(28, 10, 10, 0), at(28, 10, 13, 0)]);
    }

    #[test]
    fn test_debounce_only_touches_head() {
        let s = scheduler("");
        let set = s.wake_set(
            vec![at(28, 10, 10, 0), at(28, 10, 10, 30), at(28, 10, 11, 0)],
            at(28, 10, 0, 0),
        );
        assert_eq!(set.instants(), &[at(28, 10, 10, 30), at(28, 10, 11, 0)]);
    }

    #[test]
    fn test_off_hours_override_wakes_at_six() {
        let s = scheduler("23,0,1,2,3,4,5");
        let now = at(27, 23, 10, 0);
        let event = ResolvedEvent::timed("Late", at(27, 23, 30, 0), at(28, 0, 30, 0));

        let plan = s.plan(s.candidates(now, &[event]), now).unwrap();
        assert_eq!(plan, WakePlan::OffHours { wake_at: at(28, 6, 0, 0) });
        assert!(plan.is_off_hours());
    }

    #[test]
    fn test_off_hours_wrap_within_same_day() {
        let s = scheduler("1,2");
        let now = at(28, 1, 45, 12);
        assert_eq!(
            s.plan(vec![now + Duration::minutes(5)], now).unwrap().wake_at(),
            at(28, 3, 0, 0)
        );
    }

    #[test]
    fn test_all_hours_off_wakes_next_hour() {
        let all = (0..24).map(|h| h.to_string()).collect::<Vec<_>>().join(",");
        let s = scheduler(&all);
        let now = at(28, 14, 20, 0);
        assert_eq!(s.plan(vec![], now).unwrap().wake_at(), at(28, 15, 0, 0));
    }

    #[test]
    fn test_plan_outside_off_hours_refreshes_at_earliest() {
        let s = scheduler("0,1");
        let now = at(28, 10, 0, 0);
        let plan = s.plan(s.candidates(now, &[]), now).unwrap();
        assert_eq!(plan, WakePlan::Refresh { wake_at: at(28, 10, 5, 0) });
    }

    #[test]
    fn test_empty_wake_set_is_an_error() {
        let s = scheduler("");
        let now = at(28, 10, 0, 0);
        let result = s.plan(vec![at(28, 9, 0, 0)], now);
        assert!(matches!(result, Err(InkdayError::EmptyWakeSet)));
    }

    #[test]
    fn test_next_awake_hour_with_half_hour_offset() {
        let off: OffHours = "22".parse().unwrap();
        let now = Kolkata.with_ymd_and_hms(2024, 3, 28, 22, 40, 0).unwrap();
        assert_eq!(
            off.next_awake_hour(now),
            Kolkata.with_ymd_and_hms(2024, 3, 28, 23, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_off_hours_parse() {
        let off: OffHours = " 23, 0 ,1,".parse().unwrap();
        assert!(off.contains(23) && off.contains(0) && off.contains(1));
        assert_eq!(off.to_string(), "0,1,23");

        assert!("24".parse::<OffHours>().is_err());
        assert!("night".parse::<OffHours>().is_err());
        assert!("".parse::<OffHours>().unwrap().is_empty());
    }
}
