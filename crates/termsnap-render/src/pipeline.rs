//! Captured text to canvases in one step

use crate::canvas::Canvas;
use crate::raster::{rasterize, GlyphPainter, RasterConfig};
use crate::reduce::{FrameReducer, Reduced};
use termsnap_terminal::render_lines;
use tracing::debug;

/// Emulates captured output and rasterizes it with one painter and layout
pub struct Renderer<P> {
    painter: P,
    config: RasterConfig,
}

impl<P: GlyphPainter> Renderer<P> {
    pub fn new(painter: P, config: RasterConfig) -> Self {
        Self { painter, config }
    }

    pub fn config(&self) -> &RasterConfig {
        &self.config
    }

    pub fn painter(&self) -> &P {
        &self.painter
    }

    /// Render one complete output buffer
    pub fn render_text(&mut self, text: &str) -> Canvas {
        let lines = render_lines(text);
        rasterize(&lines, &self.config, &mut self.painter)
    }

    /// Render each snapshot independently, in order
    pub fn render_snapshots<'a, I>(&mut self, snapshots: I) -> Vec<Canvas>
    where
        I: IntoIterator<Item = &'a str>,
    {
        snapshots
            .into_iter()
            .map(|text| self.render_text(text))
            .collect()
    }

    /// Render snapshots and reduce them to an animation
    pub fn animate<'a, I>(&mut self, snapshots: I, reducer: &FrameReducer) -> Reduced
    where
        I: IntoIterator<Item = &'a str>,
    {
        let canvases = self.render_snapshots(snapshots);
        debug!("Rendered {} snapshots", canvases.len());
        reducer.reduce(canvases)
    }
}
