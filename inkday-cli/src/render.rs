//! Colored terminal rendering for inkday-core types.

use inkday_core::ResolvedEvent;
use inkday_core::schedule::WakePlan;
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for ResolvedEvent {
    fn render(&self) -> String {
        let time = if self.is_all_day {
            "all day".to_string()
        } else {
            format!("{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
        };
        format!("{:<11} {}", time.cyan(), self.title)
    }
}

impl Render for WakePlan {
    fn render(&self) -> String {
        let at = self.wake_at().format("%Y-%m-%d %H:%M:%S %Z").to_string();
        match self {
            WakePlan::Refresh { .. } => at.green().to_string(),
            WakePlan::OffHours { .. } => format!("{} {}", at.yellow(), "(off-hours)".dimmed()),
        }
    }
}
