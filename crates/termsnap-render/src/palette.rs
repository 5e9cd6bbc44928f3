//! Shared color palette and indexed frames

use crate::canvas::Canvas;
use std::collections::{HashMap, HashSet};
use termsnap_terminal::Rgb;

/// Colors in a palette-indexed frame
pub const MAX_COLORS: usize = 256;

/// Up to 256 colors shared by every frame of an animation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    /// Build from explicit colors, keeping at most [`MAX_COLORS`]
    pub fn new(mut colors: Vec<Rgb>) -> Self {
        colors.truncate(MAX_COLORS);
        Self { colors }
    }

    /// The most frequent colors of `canvas`, most frequent first, with
    /// `background` always present
    pub fn from_canvas(canvas: &Canvas, background: Rgb) -> Self {
        let mut counts: HashMap<Rgb, usize> = HashMap::new();
        for color in canvas.pixels() {
            *counts.entry(color).or_default() += 1;
        }

        let mut ranked: Vec<(Rgb, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut colors: Vec<Rgb> = ranked
            .into_iter()
            .take(MAX_COLORS)
            .map(|(color, _)| color)
            .collect();
        if !colors.contains(&background) {
            if colors.len() == MAX_COLORS {
                colors.pop();
            }
            colors.push(background);
        }

        Self { colors }
    }

    /// Palette of whichever candidate has the most distinct colors; ties go
    /// to the earliest
    pub fn from_richest<'a>(
        candidates: impl IntoIterator<Item = &'a Canvas>,
        background: Rgb,
    ) -> Self {
        let mut best: Option<(&Canvas, usize)> = None;
        for canvas in candidates {
            let distinct = canvas.pixels().collect::<HashSet<_>>().len();
            if best.map_or(true, |(_, n)| distinct > n) {
                best = Some((canvas, distinct));
            }
        }

        match best {
            Some((canvas, _)) => Self::from_canvas(canvas, background),
            None => Self::new(vec![background]),
        }
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Flattened `r, g, b` triples in palette order
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.colors.iter().flat_map(|c| c.to_array()).collect()
    }

    /// Index of the closest color by squared RGB distance; ties go to the
    /// lower index
    pub fn nearest(&self, color: Rgb) -> u8 {
        let distance = |c: &Rgb| {
            let d = |a: u8, b: u8| (i32::from(a) - i32::from(b)).pow(2);
            d(c.r, color.r) + d(c.g, color.g) + d(c.b, color.b)
        };

        self.colors
            .iter()
            .enumerate()
            .min_by_key(|(i, c)| (distance(c), *i))
            .map_or(0, |(i, _)| i as u8)
    }

    /// A quantizer that remembers every lookup
    pub fn quantizer(&self) -> Quantizer<'_> {
        Quantizer {
            palette: self,
            cache: HashMap::new(),
        }
    }
}

/// Memoized nearest-color lookup against one palette
pub struct Quantizer<'a> {
    palette: &'a Palette,
    cache: HashMap<Rgb, u8>,
}

impl Quantizer<'_> {
    pub fn index_of(&mut self, color: Rgb) -> u8 {
        let palette = self.palette;
        *self
            .cache
            .entry(color)
            .or_insert_with(|| palette.nearest(color))
    }

    pub fn quantize(&mut self, canvas: &Canvas) -> IndexedFrame {
        let pixels = canvas.pixels().map(|c| self.index_of(c)).collect();
        IndexedFrame {
            width: canvas.width(),
            height: canvas.height(),
            pixels,
        }
    }
}

/// A frame expressed as palette indices, row by row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}
