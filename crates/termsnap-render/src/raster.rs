//! Line-to-pixel rasterization

use crate::canvas::{Canvas, Rect, Surface};
use crate::font::FontVariant;
use termsnap_terminal::{Line, Rgb, DEFAULT_BACKGROUND};
use tracing::trace;

/// Glyph measurement and drawing, injected into [`rasterize`]
pub trait GlyphPainter {
    /// Horizontal advance of `c` in pixels
    fn measure(&self, c: char) -> u32;

    /// Height of one text row in pixels
    fn line_height(&self) -> u32;

    /// Draw `text` with its top-left corner at `(x, y)`, one glyph per cell
    fn draw_text(
        &mut self,
        surface: &mut Surface<'_>,
        x: u32,
        y: u32,
        text: &str,
        variant: FontVariant,
        color: Rgb,
    );

    fn fill_rect(&mut self, surface: &mut Surface<'_>, rect: Rect, color: Rgb) {
        surface.fill_rect(rect, color);
    }

    fn draw_line(
        &mut self,
        surface: &mut Surface<'_>,
        from: (u32, u32),
        to: (u32, u32),
        color: Rgb,
    ) {
        surface.line(from, to, color);
    }
}

impl<P: GlyphPainter + ?Sized> GlyphPainter for Box<P> {
    fn measure(&self, c: char) -> u32 {
        (**self).measure(c)
    }

    fn line_height(&self) -> u32 {
        (**self).line_height()
    }

    fn draw_text(
        &mut self,
        surface: &mut Surface<'_>,
        x: u32,
        y: u32,
        text: &str,
        variant: FontVariant,
        color: Rgb,
    ) {
        (**self).draw_text(surface, x, y, text, variant, color);
    }

    fn fill_rect(&mut self, surface: &mut Surface<'_>, rect: Rect, color: Rgb) {
        (**self).fill_rect(surface, rect, color);
    }

    fn draw_line(
        &mut self,
        surface: &mut Surface<'_>,
        from: (u32, u32),
        to: (u32, u32),
        color: Rgb,
    ) {
        (**self).draw_line(surface, from, to, color);
    }
}

/// Layout parameters for [`rasterize`]
#[derive(Debug, Clone, PartialEq)]
pub struct RasterConfig {
    /// Margin on the left, right and top
    pub padding: u32,

    /// Margin below the last line; `None` uses `padding`
    pub bottom_padding: Option<u32>,

    /// Lower bound on the canvas width
    pub min_width: u32,

    /// Canvas fill; segments with this background get no rectangle
    pub background: Rgb,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            padding: 20,
            bottom_padding: None,
            min_width: 0,
            background: DEFAULT_BACKGROUND,
        }
    }
}

impl RasterConfig {
    pub fn bottom_padding(&self) -> u32 {
        self.bottom_padding.unwrap_or(self.padding)
    }
}

/// Draw `lines` onto a new canvas sized to fit them
pub fn rasterize(lines: &[Line], config: &RasterConfig, painter: &mut dyn GlyphPainter) -> Canvas {
    let cell_width = painter.measure('M').max(1);
    let line_height = painter.line_height().max(1);

    let longest = lines.iter().map(Line::char_count).max().unwrap_or(0) as u32;
    let width = config
        .min_width
        .max(longest.saturating_mul(cell_width) + 2 * config.padding);
    let height = (lines.len() as u32).saturating_mul(line_height)
        + config.padding
        + config.bottom_padding();

    trace!(
        "Rasterizing {} lines into {}x{} (cell {}x{})",
        lines.len(),
        width,
        height,
        cell_width,
        line_height
    );
    let mut canvas = Canvas::new(width, height, config.background);
    let mut surface = Surface::new(&mut canvas);

    for (row, line) in lines.iter().enumerate() {
        let y = config.padding + row as u32 * line_height;
        let mut x = config.padding;

        for segment in &line.segments {
            let span = segment.char_count() as u32 * cell_width;
            let style = &segment.style;
            let color = style.effective_foreground();

            if style.background != config.background {
                painter.fill_rect(&mut surface, Rect::new(x, y, span, line_height), style.background);
            }

            let variant = if style.bold {
                FontVariant::Bold
            } else {
                FontVariant::Regular
            };
            painter.draw_text(&mut surface, x, y, &segment.text, variant, color);

            if style.underline && span > 0 {
                let underline_y = y + line_height.saturating_sub(2);
                painter.draw_line(&mut surface, (x, underline_y), (x + span, underline_y), color);
            }

            x += span;
        }
    }

    canvas
}
