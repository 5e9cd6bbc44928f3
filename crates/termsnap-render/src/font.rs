//! Monospace text drawing with fontdue

use crate::canvas::{Rect, Surface};
use crate::raster::GlyphPainter;
use crate::RenderError;
use fontdue::{Font, FontSettings, Metrics};
use std::collections::HashMap;
use std::path::Path;
use termsnap_terminal::Rgb;
use tracing::{debug, warn};

pub const DEFAULT_REGULAR_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf";
pub const DEFAULT_BOLD_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSansMono-Bold.ttf";
pub const DEFAULT_FONT_SIZE: f32 = 14.0;

/// Row height as a multiple of the font size
const LINE_HEIGHT_FACTOR: f32 = 1.5;

/// Face used for a run of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontVariant {
    Regular,
    Bold,
}

/// Regular face plus an optional bold face
pub struct FontSet {
    regular: Font,
    bold: Option<Font>,
}

impl FontSet {
    pub fn from_bytes(regular: Vec<u8>, bold: Option<Vec<u8>>) -> Result<Self, RenderError> {
        let regular = parse(regular)?;
        let bold = bold.map(parse).transpose()?;
        Ok(Self { regular, bold })
    }

    /// Load both faces; a missing or unreadable bold face falls back to the
    /// regular one
    pub fn load(regular: &Path, bold: &Path) -> Result<Self, RenderError> {
        let regular_bytes = std::fs::read(regular).map_err(|source| RenderError::FontLoad {
            path: regular.to_path_buf(),
            source,
        })?;

        let bold_bytes = match std::fs::read(bold) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Bold font {} unavailable ({}), using regular", bold.display(), e);
                None
            }
        };

        debug!("Loaded fonts {} and {}", regular.display(), bold.display());
        Self::from_bytes(regular_bytes, bold_bytes)
    }

    pub fn load_default() -> Result<Self, RenderError> {
        Self::load(Path::new(DEFAULT_REGULAR_FONT), Path::new(DEFAULT_BOLD_FONT))
    }

    pub fn face(&self, variant: FontVariant) -> &Font {
        match variant {
            FontVariant::Bold => self.bold.as_ref().unwrap_or(&self.regular),
            FontVariant::Regular => &self.regular,
        }
    }
}

fn parse(bytes: Vec<u8>) -> Result<Font, RenderError> {
    Font::from_bytes(bytes, FontSettings::default())
        .map_err(|e| RenderError::FontParse(e.to_string()))
}

struct GlyphBitmap {
    metrics: Metrics,
    coverage: Vec<u8>,
}

/// [`GlyphPainter`] backed by real font files.
///
/// Every glyph occupies one cell as wide as `M`, so wide or missing glyphs
/// never shift the grid.
pub struct FontPainter {
    fonts: FontSet,
    size: f32,
    cell_width: u32,
    line_height: u32,
    ascent: f32,
    glyph_cache: HashMap<(FontVariant, char), GlyphBitmap>,
}

impl FontPainter {
    pub fn new(fonts: FontSet, size: f32) -> Self {
        let regular = fonts.face(FontVariant::Regular);
        let cell_width = regular.metrics('M', size).advance_width.ceil().max(1.0) as u32;
        let line_height = (size * LINE_HEIGHT_FACTOR).max(1.0) as u32;
        let ascent = regular
            .horizontal_line_metrics(size)
            .map_or(size, |m| m.ascent);

        Self {
            fonts,
            size,
            cell_width,
            line_height,
            ascent,
            glyph_cache: HashMap::new(),
        }
    }

    pub fn size(&self) -> f32 {
        self.size
    }
}

impl GlyphPainter for FontPainter {
    fn measure(&self, c: char) -> u32 {
        if c == 'M' {
            return self.cell_width;
        }
        let advance = self
            .fonts
            .face(FontVariant::Regular)
            .metrics(c, self.size)
            .advance_width;
        advance.ceil().max(0.0) as u32
    }

    fn line_height(&self) -> u32 {
        self.line_height
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
        let baseline = f64::from(y) + f64::from(self.ascent.round());

        for (i, c) in text.chars().enumerate() {
            if c.is_whitespace() {
                continue;
            }

            let fonts = &self.fonts;
            let size = self.size;
            let glyph = self.glyph_cache.entry((variant, c)).or_insert_with(|| {
                let (metrics, coverage) = fonts.face(variant).rasterize(c, size);
                GlyphBitmap { metrics, coverage }
            });

            let metrics = glyph.metrics;
            if metrics.width == 0 || metrics.height == 0 {
                continue;
            }

            let cell_x = i64::from(x) + i as i64 * i64::from(self.cell_width);
            let left = cell_x + i64::from(metrics.xmin);
            let top = baseline as i64 - i64::from(metrics.ymin) - metrics.height as i64;

            for row in 0..metrics.height {
                for col in 0..metrics.width {
                    let coverage = glyph.coverage[row * metrics.width + col];
                    surface.blend(left + col as i64, top + row as i64, color, coverage);
                }
            }
        }
    }
}

/// Painter for when no font file can be loaded.
///
/// Keeps the layout of a real monospace face at `size` but draws each visible
/// glyph as a solid block.
#[derive(Debug, Clone)]
pub struct FallbackPainter {
    cell_width: u32,
    line_height: u32,
}

impl FallbackPainter {
    pub fn new(size: f32) -> Self {
        Self {
            cell_width: (size * 0.6).ceil().max(1.0) as u32,
            line_height: (size * LINE_HEIGHT_FACTOR).max(1.0) as u32,
        }
    }
}

impl GlyphPainter for FallbackPainter {
    fn measure(&self, _c: char) -> u32 {
        self.cell_width
    }

    fn line_height(&self) -> u32 {
        self.line_height
    }

    fn draw_text(
        &mut self,
        surface: &mut Surface<'_>,
        x: u32,
        y: u32,
        text: &str,
        _variant: FontVariant,
        color: Rgb,
    ) {
        let inset = (self.line_height / 5).max(1);
        let block = Rect::new(
            0,
            y + inset,
            self.cell_width.saturating_sub(1).max(1),
            self.line_height.saturating_sub(2 * inset).max(1),
        );

        for (i, c) in text.chars().enumerate() {
            if !c.is_whitespace() {
                let cell_x = x + i as u32 * self.cell_width;
                surface.fill_rect(Rect { x: cell_x, ..block }, color);
            }
        }
    }
}
