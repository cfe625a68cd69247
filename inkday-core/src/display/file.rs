//! File-only sink used when no panel is attached.

use std::path::{Path, PathBuf};

use crate::display::DisplaySink;
use crate::error::InkdayResult;
use crate::render::Frame;

#[derive(Clone, Debug)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: &Path) -> Self {
        FileSink {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DisplaySink for FileSink {
    async fn init(&mut self) -> InkdayResult<()> {
        Ok(())
    }

    async fn clear(&mut self) -> InkdayResult<()> {
        Frame::blank().save(&self.path)
    }

    async fn render(&mut self, frame: &Frame) -> InkdayResult<()> {
        frame.save(&self.path)?;
        tracing::debug!(path = %self.path.display(), "frame written");
        Ok(())
    }

    async fn sleep(&mut self) -> InkdayResult<()> {
        Ok(())
    }
}
