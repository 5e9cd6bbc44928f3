use termsnap_render::{FontVariant, GlyphPainter, Rect, Surface};
use termsnap_terminal::Rgb;

/// Every drawing request the rasterizer makes, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Text {
        x: u32,
        y: u32,
        text: String,
        variant: FontVariant,
        color: Rgb,
    },
    Rect {
        rect: Rect,
        color: Rgb,
    },
    Line {
        from: (u32, u32),
        to: (u32, u32),
        color: Rgb,
    },
}

/// Painter with fixed 8x16 cells that records every call.
///
/// Rectangles and lines are also painted; text is only recorded.
#[derive(Debug, Default)]
pub struct RecordingPainter {
    pub calls: Vec<Call>,
}

impl RecordingPainter {
    pub const CELL_WIDTH: u32 = 8;
    pub const LINE_HEIGHT: u32 = 16;

    pub fn texts(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl GlyphPainter for RecordingPainter {
    fn measure(&self, _c: char) -> u32 {
        Self::CELL_WIDTH
    }

    fn line_height(&self) -> u32 {
        Self::LINE_HEIGHT
    }

    fn draw_text(
        &mut self,
        _surface: &mut Surface<'_>,
        x: u32,
        y: u32,
        text: &str,
        variant: FontVariant,
        color: Rgb,
    ) {
        self.calls.push(Call::Text {
            x,
            y,
            text: text.to_string(),
            variant,
            color,
        });
    }

    fn fill_rect(&mut self, surface: &mut Surface<'_>, rect: Rect, color: Rgb) {
        self.calls.push(Call::Rect { rect, color });
        surface.fill_rect(rect, color);
    }

    fn draw_line(
        &mut self,
        surface: &mut Surface<'_>,
        from: (u32, u32),
        to: (u32, u32),
        color: Rgb,
    ) {
        self.calls.push(Call::Line { from, to, color });
        surface.line(from, to, color);
    }
}
