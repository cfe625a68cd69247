//! One refresh cycle: fetch, extract, select, render, gate, push.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use inkday_core::agenda::AgendaView;
use inkday_core::config::Settings;
use inkday_core::display::Display;
use inkday_core::extract::extract;
use inkday_core::render::Renderer;
use inkday_core::schedule::{RefreshScheduler, WakePlan};
use inkday_core::state::{DisplayState, should_push};
use inkday_core::weather::WeatherState;
use inkday_core::{ResolvedEvent, feed, ics};

pub struct Cycle {
    settings: Settings,
    client: reqwest::Client,
    renderer: Renderer,
    scheduler: RefreshScheduler,
    /// What the display currently shows
    previous: Option<DisplayState>,
}

impl Cycle {
    pub fn new(settings: Settings) -> Result<Self> {
        let client = feed::http_client()?;
        let renderer = Renderer::new(settings.font_path.as_deref())
            .context("failed to load font")?;
        let scheduler = RefreshScheduler::new(settings.poll_interval, settings.off_hours.clone());

        Ok(Cycle {
            settings,
            client,
            renderer,
            scheduler,
            previous: None,
        })
    }

    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.settings.timezone)
    }

    /// Refresh the display and return the wake candidates of this cycle.
    ///
    /// A failed refresh leaves the display alone and only the poll interval
    /// is scheduled.
    pub async fn run_once(&mut self, display: &mut Display) -> Vec<DateTime<Tz>> {
        let generated_at = self.now();

        match self.refresh(generated_at, display).await {
            Ok(rendered) => self.scheduler.candidates(generated_at, &rendered),
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "refresh failed");
                self.scheduler.candidates(generated_at, &[])
            }
        }
    }

    /// The next wake, planned against a fresh `now`.
    pub fn plan(&self, candidates: Vec<DateTime<Tz>>, now: DateTime<Tz>) -> WakePlan {
        match self.scheduler.plan(candidates, now) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::error!(error = %e, "falling back to the poll interval");
                WakePlan::Refresh {
                    wake_at: now + self.scheduler.poll_interval(),
                }
            }
        }
    }

    /// Drop the remembered state so the next frame is pushed whatever it shows.
    pub fn forget_display_state(&mut self) {
        self.previous = None;
    }

    async fn refresh(
        &mut self,
        now: DateTime<Tz>,
        display: &mut Display,
    ) -> Result<Vec<ResolvedEvent>> {
        let tz = self.settings.timezone;

        let ics = feed::fetch_calendar(&self.client, &self.settings.calendar_url)
            .await
            .context("failed to fetch calendar")?;
        let entries = ics::parse_calendar(&ics).context("failed to parse calendar")?;

        let today = now.date_naive();
        let tomorrow = today.succ_opt().context("date out of range")?;
        let view = AgendaView::select(
            &extract(&entries, today, tz),
            &extract(&entries, tomorrow, tz),
            now,
        );
        tracing::debug!(
            day = ?view.day,
            rendered = view.rendered.len(),
            overflow = view.overflow,
            "selected events"
        );

        let weather = match &self.settings.weather {
            Some(weather_settings) => {
                let weather = feed::fetch_weather(&self.client, weather_settings)
                    .await
                    .context("failed to fetch weather")?;
                Some(WeatherState::from_weather(&weather, now)?)
            }
            None => None,
        };

        let (state, frame) = self.renderer.compose(now, &view, weather.as_ref());
        if should_push(self.previous.as_ref(), &state) {
            display.push(&frame).await.context("failed to push frame")?;
            self.previous = Some(state);
        } else {
            tracing::debug!("display state unchanged, not pushing");
        }

        Ok(view.rendered)
    }
}
