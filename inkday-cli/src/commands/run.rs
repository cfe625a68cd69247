use anyhow::Result;
use inkday_core::config::Settings;
use inkday_core::display::Display;
use tokio::signal::unix::{SignalKind, signal};

use crate::cycle::Cycle;

pub async fn run(settings: Settings) -> Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let mut display = Display::new(settings.display_driver.as_deref(), &settings.output_path);
    let mut cycle = Cycle::new(settings)?;

    loop {
        let candidates = cycle.run_once(&mut display).await;
        let plan = cycle.plan(candidates, cycle.now());

        if plan.is_off_hours() {
            tracing::info!(wake_at = %plan.wake_at(), "entering off-hours");
            display.power_down().await;
            cycle.forget_display_state();
        } else {
            tracing::info!(wake_at = %plan.wake_at(), "next refresh planned");
        }

        let wait = (plan.wake_at() - cycle.now()).to_std().unwrap_or_default();

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, shutting down");
                break;
            }
        }
    }

    display.shutdown().await;
    Ok(())
}
