use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use inkday_core::config::Settings;
use inkday_core::extract::extract;
use inkday_core::{feed, ics};
use owo_colors::OwoColorize;

use crate::render::Render;

pub async fn run(settings: Settings, date: Option<&str>) -> Result<()> {
    let tz = settings.timezone;
    let now = Utc::now().with_timezone(&tz);

    let date = match date {
        Some(date) => NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .with_context(|| format!("invalid date '{date}', expected YYYY-MM-DD"))?,
        None => now.date_naive(),
    };

    let client = feed::http_client()?;
    let ics = feed::fetch_calendar(&client, &settings.calendar_url)
        .await
        .context("failed to fetch calendar")?;
    let entries = ics::parse_calendar(&ics).context("failed to parse calendar")?;
    let agenda = extract(&entries, date, tz);

    println!("{}", date.format("%A, %b %-d").bold());

    if agenda.is_empty() {
        println!("   {}", "No events".dimmed());
        return Ok(());
    }

    for event in &agenda {
        let line = format!("   {}", event.render());
        if event.end <= now {
            println!("{}", line.dimmed());
        } else {
            println!("{line}");
        }
    }

    Ok(())
}
