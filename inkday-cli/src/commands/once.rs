use anyhow::Result;
use inkday_core::config::Settings;
use inkday_core::display::Display;
use owo_colors::OwoColorize;

use crate::cycle::Cycle;
use crate::render::Render;

pub async fn run(settings: Settings) -> Result<()> {
    let mut display = Display::new(settings.display_driver.as_deref(), &settings.output_path);
    let mut cycle = Cycle::new(settings)?;

    let candidates = cycle.run_once(&mut display).await;
    let plan = cycle.plan(candidates, cycle.now());

    println!("{} {}", "Frame:".dimmed(), display.output_path().display());
    println!("{} {}", "Next:".dimmed(), plan.render());

    Ok(())
}
