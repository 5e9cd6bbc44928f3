//! Fixed-size RGB pixel grid

use image::{Rgb as Pixel, RgbImage};
use termsnap_terminal::Rgb;

/// Axis-aligned rectangle in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// A rendered frame.
///
/// Dimensions are fixed at creation. Drawing goes through a [`Surface`] that
/// only exists during rasterization, so a canvas handed to a caller is final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    image: RgbImage,
    background: Rgb,
}

impl Canvas {
    /// Create a canvas filled with `background`; zero dimensions become one
    pub fn new(width: u32, height: u32, background: Rgb) -> Self {
        let image = RgbImage::from_pixel(
            width.max(1),
            height.max(1),
            Pixel(background.to_array()),
        );
        Self { image, background }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn background(&self) -> Rgb {
        self.background
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Color at `(x, y)`, or `None` outside the canvas
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        (x < self.width() && y < self.height()).then(|| Rgb::from(self.image.get_pixel(x, y).0))
    }

    /// Iterate every pixel color, row by row
    pub fn pixels(&self) -> impl Iterator<Item = Rgb> + '_ {
        self.image.pixels().map(|p| Rgb::from(p.0))
    }

    /// True when every pixel has the same color
    pub fn is_solid(&self) -> bool {
        let mut pixels = self.image.pixels();
        match pixels.next() {
            Some(first) => pixels.all(|p| p == first),
            None => true,
        }
    }

    /// Copy of this canvas cropped or padded to `width` x `height`, anchored
    /// top-left, with new area filled by `fill`
    pub fn resized(&self, width: u32, height: u32, fill: Rgb) -> Self {
        if width == self.width() && height == self.height() {
            return self.clone();
        }

        let mut out = Self::new(width, height, fill);
        let copy_w = self.width().min(out.width());
        let copy_h = self.height().min(out.height());
        for y in 0..copy_h {
            for x in 0..copy_w {
                out.image.put_pixel(x, y, *self.image.get_pixel(x, y));
            }
        }
        out
    }

    /// Fill a rectangle, clipped to the canvas
    pub(crate) fn fill_rect(&mut self, rect: Rect, color: Rgb) {
        let x_end = rect.x.saturating_add(rect.width).min(self.width());
        let y_end = rect.y.saturating_add(rect.height).min(self.height());
        let pixel = Pixel(color.to_array());
        for y in rect.y..y_end {
            for x in rect.x..x_end {
                self.image.put_pixel(x, y, pixel);
            }
        }
    }

    /// One-pixel line between two points, inclusive, clipped to the canvas
    pub(crate) fn line(&mut self, from: (u32, u32), to: (u32, u32), color: Rgb) {
        let (x0, y0) = (i64::from(from.0), i64::from(from.1));
        let (x1, y1) = (i64::from(to.0), i64::from(to.1));
        let steps = (x1 - x0).abs().max((y1 - y0).abs());

        for i in 0..=steps {
            let (x, y) = if steps == 0 {
                (x0, y0)
            } else {
                (x0 + (x1 - x0) * i / steps, y0 + (y1 - y0) * i / steps)
            };
            self.set(x, y, color);
        }
    }

    /// Blend `color` over the existing pixel with the given coverage
    pub(crate) fn blend(&mut self, x: i64, y: i64, color: Rgb, coverage: u8) {
        if coverage == 0 || !self.contains(x, y) {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        let dst = self.image.get_pixel(x, y).0;
        let alpha = u16::from(coverage);
        let inv = 255 - alpha;
        let mix = |src: u8, dst: u8| ((u16::from(src) * alpha + u16::from(dst) * inv + 127) / 255) as u8;
        self.image.put_pixel(
            x,
            y,
            Pixel([
                mix(color.r, dst[0]),
                mix(color.g, dst[1]),
                mix(color.b, dst[2]),
            ]),
        );
    }

    fn set(&mut self, x: i64, y: i64, color: Rgb) {
        if self.contains(x, y) {
            self.image.put_pixel(x as u32, y as u32, Pixel(color.to_array()));
        }
    }

    fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < i64::from(self.width()) && y < i64::from(self.height())
    }
}

/// Drawing access to a canvas while it is being rasterized.
///
/// Handed to [`GlyphPainter`](crate::GlyphPainter) implementations; only the
/// rasterizer can create one.
pub struct Surface<'a> {
    canvas: &'a mut Canvas,
}

impl<'a> Surface<'a> {
    pub(crate) fn new(canvas: &'a mut Canvas) -> Self {
        Self { canvas }
    }

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        self.canvas.pixel(x, y)
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Rgb) {
        self.canvas.fill_rect(rect, color);
    }

    pub fn line(&mut self, from: (u32, u32), to: (u32, u32), color: Rgb) {
        self.canvas.line(from, to, color);
    }

    /// Blend `color` over the pixel at `(x, y)`; out-of-bounds is a no-op
    pub fn blend(&mut self, x: i64, y: i64, color: Rgb, coverage: u8) {
        self.canvas.blend(x, y, color, coverage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BG: Rgb = Rgb::new(30, 30, 46);
    const RED: Rgb = Rgb::new(255, 0, 0);

    #[test]
    fn new_canvas_is_solid_background() {
        let canvas = Canvas::new(4, 3, BG);
        assert_eq!((canvas.width(), canvas.height()), (4, 3));
        assert!(canvas.is_solid());
        assert_eq!(canvas.pixel(3, 2), Some(BG));
        assert_eq!(canvas.pixel(4, 0), None);
    }

    #[test]
    fn zero_dimensions_are_clamped() {
        let canvas = Canvas::new(0, 0, BG);
        assert_eq!((canvas.width(), canvas.height()), (1, 1));
    }

    #[test]
    fn fill_rect_is_clipped() {
        let mut canvas = Canvas::new(4, 4, BG);
        canvas.fill_rect(Rect::new(2, 2, 10, 10), RED);
        assert_eq!(canvas.pixel(1, 1), Some(BG));
        assert_eq!(canvas.pixel(3, 3), Some(RED));
        assert!(!canvas.is_solid());
    }

    #[test]
    fn horizontal_line_is_inclusive() {
        let mut canvas = Canvas::new(6, 2, BG);
        canvas.line((1, 1), (4, 1), RED);
        let row: Vec<Rgb> = (0..6).map(|x| canvas.pixel(x, 1).unwrap()).collect();
        assert_eq!(row, vec![BG, RED, RED, RED, RED, BG]);
    }

    #[test]
    fn blend_mixes_by_coverage() {
        let mut canvas = Canvas::new(1, 1, Rgb::new(0, 0, 0));
        canvas.blend(0, 0, Rgb::new(255, 255, 255), 255);
        assert_eq!(canvas.pixel(0, 0), Some(Rgb::new(255, 255, 255)));

        let mut canvas = Canvas::new(1, 1, Rgb::new(0, 0, 0));
        canvas.blend(0, 0, Rgb::new(200, 100, 0), 128);
        assert_eq!(canvas.pixel(0, 0), Some(Rgb::new(100, 50, 0)));

        canvas.blend(-1, 0, RED, 255);
        canvas.blend(0, 5, RED, 255);
    }

    #[test]
    fn resize_pads_and_crops_top_left() {
        let mut canvas = Canvas::new(2, 2, RED);
        canvas.fill_rect(Rect::new(0, 0, 1, 1), Rgb::new(1, 2, 3));

        let padded = canvas.resized(3, 1, BG);
        assert_eq!((padded.width(), padded.height()), (3, 1));
        assert_eq!(padded.pixel(0, 0), Some(Rgb::new(1, 2, 3)));
        assert_eq!(padded.pixel(1, 0), Some(RED));
        assert_eq!(padded.pixel(2, 0), Some(BG));
    }
}
