//! Display sinks.
//!
//! A frame always lands on disk. When a driver is configured and installed it
//! is also shown on the panel, in one init, render, sleep session per push.

mod driver;
mod file;
pub mod protocol;

use std::path::Path;

pub use driver::Driver;
pub use file::FileSink;

use crate::error::InkdayResult;
use crate::render::Frame;

/// Something that can show a frame.
#[allow(async_fn_in_trait)]
pub trait DisplaySink {
    async fn init(&mut self) -> InkdayResult<()>;
    async fn clear(&mut self) -> InkdayResult<()>;
    async fn render(&mut self, frame: &Frame) -> InkdayResult<()>;
    async fn sleep(&mut self) -> InkdayResult<()>;
}

/// Whether a panel can be driven this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Present,
    Absent,
}

/// Run one device session. The sink is put to sleep even when drawing failed.
async fn session<S: DisplaySink>(sink: &mut S, frame: Option<&Frame>) -> InkdayResult<()> {
    sink.init().await?;
    let drawn = match frame {
        Some(frame) => sink.render(frame).await,
        None => sink.clear().await,
    };
    let slept = sink.sleep().await;
    drawn.and(slept)
}

pub struct Display {
    driver: Option<Driver>,
    file: FileSink,
}

impl Display {
    pub fn new(driver_name: Option<&str>, output_path: &Path) -> Self {
        Display {
            driver: driver_name.map(|name| Driver::new(name, output_path)),
            file: FileSink::new(output_path),
        }
    }

    pub fn output_path(&self) -> &Path {
        self.file.path()
    }

    pub fn detect(&self) -> DeviceStatus {
        match &self.driver {
            Some(driver) if driver.is_installed() => DeviceStatus::Present,
            Some(driver) => {
                tracing::warn!(driver = %driver.binary_name(), "display driver not found in PATH");
                DeviceStatus::Absent
            }
            None => DeviceStatus::Absent,
        }
    }

    /// Show `frame` on the panel if there is one, and always write it to disk.
    pub async fn push(&mut self, frame: &Frame) -> InkdayResult<DeviceStatus> {
        if let (DeviceStatus::Present, Some(driver)) = (self.detect(), self.driver.as_mut()) {
            match session(driver, Some(frame)).await {
                Ok(()) => {
                    tracing::info!(driver = %driver.name(), "frame pushed to display");
                    return Ok(DeviceStatus::Present);
                }
                Err(e) => {
                    tracing::error!(driver = %driver.name(), error = %e, "display failed, writing frame only");
                }
            }
        }

        session(&mut self.file, Some(frame)).await?;
        tracing::info!(path = %self.file.path().display(), "frame written");
        Ok(DeviceStatus::Absent)
    }

    /// Blank the panel for quiet hours.
    pub async fn power_down(&mut self) {
        if let (DeviceStatus::Present, Some(driver)) = (self.detect(), self.driver.as_mut()) {
            if let Err(e) = session(driver, None).await {
                tracing::error!(driver = %driver.name(), error = %e, "failed to blank display");
            }
        }
    }

    /// Leave the panel asleep before exit.
    pub async fn shutdown(&mut self) {
        if let (DeviceStatus::Present, Some(driver)) = (self.detect(), self.driver.as_mut()) {
            if let Err(e) = driver.sleep().await {
                tracing::error!(driver = %driver.name(), error = %e, "failed to put display to sleep");
            }
        }
    }
}
