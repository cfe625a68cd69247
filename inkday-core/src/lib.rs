//! Core of the inkday status display.
//!
//! This crate holds everything the daemon needs apart from process bootstrap:
//! - `ics` and `extract` turn a calendar feed into a per-day `Agenda`
//! - `agenda` picks what is worth showing right now
//! - `schedule` decides when to wake up next
//! - `state` and `render` produce the frame and the change signal for it
//! - `display` pushes frames to a driver binary or to disk
//! - `feed`, `weather` and `config` cover the outside world

pub mod agenda;
pub mod config;
pub mod display;
pub mod error;
pub mod event;
pub mod extract;
pub mod feed;
pub mod ics;
pub mod recurrence;
pub mod render;
pub mod schedule;
pub mod state;
pub mod weather;

pub use error::{InkdayError, InkdayResult};
pub use event::{Agenda, EventTime, RawCalendarEntry, Recurrence, ResolvedEvent};
