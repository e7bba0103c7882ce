use crate::{composer::FrameOutcome, Result};

/// Rendering backend abstraction. The composer calls [`Renderer::render`]
/// once per tick, whether or not anything was posed.
pub trait Renderer {
    fn render(&mut self, frame: &FrameOutcome) -> Result<()>;
}

/// Renderer that draws nothing. It keeps a frame count and the most recent
/// outcome so headless runs and tests can inspect what would have been drawn.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    frames: u64,
    last: Option<FrameOutcome>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last(&self) -> Option<&FrameOutcome> {
        self.last.as_ref()
    }
}

impl Renderer for HeadlessRenderer {
    fn render(&mut self, frame: &FrameOutcome) -> Result<()> {
        self.frames += 1;
        self.last = Some(*frame);
        Ok(())
    }
}
