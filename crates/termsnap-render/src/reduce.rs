//! Frame reduction
//!
//! Brings a run of rasterized snapshots to a common size, drops blank and
//! repeated frames, bounds the frame count and maps everything onto a single
//! shared palette.

use crate::canvas::Canvas;
use crate::palette::{IndexedFrame, Palette};
use termsnap_terminal::{Rgb, DEFAULT_BACKGROUND};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct ReduceConfig {
    /// Output height; `None` picks the median frame height
    pub fixed_height: Option<u32>,

    /// Upper bound on the median-derived height
    pub height_ceiling: u32,

    /// Below this many distinct frames, fall back to uniform sampling
    pub min_frames: usize,

    /// Approximate frame count produced by the fallback sampling
    pub fallback_samples: usize,

    /// Hard cap on the output frame count
    pub max_frames: usize,

    /// How many leading frames compete to supply the palette
    pub palette_window: usize,

    /// Fill for padded areas, always part of the palette
    pub background: Rgb,
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self {
            fixed_height: None,
            height_ceiling: 300,
            min_frames: 5,
            fallback_samples: 20,
            max_frames: 200,
            palette_window: 10,
            background: DEFAULT_BACKGROUND,
        }
    }
}

/// Outcome of a reduction
#[derive(Debug, Clone, PartialEq)]
pub enum Reduced {
    /// Nothing visible was captured
    Empty,
    Animation(Animation),
}

/// Equally sized frames ready for encoding
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub width: u32,
    pub height: u32,
    pub frames: Vec<Canvas>,
    pub palette: Palette,
    pub indexed: Vec<IndexedFrame>,
}

#[derive(Debug, Clone, Default)]
pub struct FrameReducer {
    config: ReduceConfig,
}

impl FrameReducer {
    pub fn new(config: ReduceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReduceConfig {
        &self.config
    }

    pub fn reduce(&self, canvases: Vec<Canvas>) -> Reduced {
        if canvases.is_empty() {
            return Reduced::Empty;
        }
        let input_count = canvases.len();

        let (width, height) = self.target_size(&canvases);
        let background = self.config.background;
        let normalized: Vec<Canvas> = canvases
            .iter()
            .map(|c| c.resized(width, height, background))
            .collect();

        let trimmed: Vec<Canvas> = normalized.into_iter().skip_while(Canvas::is_solid).collect();
        if trimmed.is_empty() {
            debug!("All {} frames are blank", input_count);
            return Reduced::Empty;
        }

        let mut frames = self.dedup(trimmed);
        if frames.len() > self.config.max_frames {
            let max = self.config.max_frames.max(1);
            let stride = (frames.len() + max - 1) / max;
            frames = frames.into_iter().step_by(stride).collect();
        }

        let window = self.config.palette_window.max(1).min(frames.len());
        let palette = Palette::from_richest(&frames[..window], background);
        let mut quantizer = palette.quantizer();
        let indexed = frames.iter().map(|f| quantizer.quantize(f)).collect();

        debug!(
            "Reduced {} frames to {} at {}x{} with {} colors",
            input_count,
            frames.len(),
            width,
            height,
            palette.len()
        );

        Reduced::Animation(Animation {
            width,
            height,
            frames,
            palette,
            indexed,
        })
    }

    fn target_size(&self, canvases: &[Canvas]) -> (u32, u32) {
        let width = canvases.iter().map(Canvas::width).max().unwrap_or(1);
        let height = match self.config.fixed_height {
            Some(h) => h,
            None => {
                let mut heights: Vec<u32> = canvases.iter().map(Canvas::height).collect();
                heights.sort_unstable();
                heights[heights.len() / 2].min(self.config.height_ceiling)
            }
        };
        (width, height.max(1))
    }

    /// Collapse consecutive identical frames, sampling uniformly instead when
    /// that leaves too few to animate
    fn dedup(&self, frames: Vec<Canvas>) -> Vec<Canvas> {
        let mut unique: Vec<Canvas> = Vec::with_capacity(frames.len());
        for frame in &frames {
            if unique.last() != Some(frame) {
                unique.push(frame.clone());
            }
        }

        if unique.len() < self.config.min_frames && frames.len() >= self.config.min_frames {
            let stride = (frames.len() / self.config.fallback_samples.max(1)).max(1);
            debug!(
                "Only {} distinct frames, sampling every {} of {}",
                unique.len(),
                stride,
                frames.len()
            );
            return frames.into_iter().step_by(stride).collect();
        }
        unique
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Rect;

    const BG: Rgb = DEFAULT_BACKGROUND;

    fn frame(marker: u32) -> Canvas {
        let mut canvas = Canvas::new(8, 4, BG);
        canvas.fill_rect(Rect::new(marker % 8, 0, 1, 1), Rgb::new(200, 200, 200));
        canvas
    }

    fn reducer(min_frames: usize) -> FrameReducer {
        FrameReducer::new(ReduceConfig {
            min_frames,
            ..ReduceConfig::default()
        })
    }

    fn animation(reduced: Reduced) -> Animation {
        match reduced {
            Reduced::Animation(a) => a,
            Reduced::Empty => panic!("expected an animation"),
        }
    }

    #[test]
    fn consecutive_duplicates_collapse() {
        let (f, g, h) = (frame(0), frame(1), frame(2));
        let input = vec![f.clone(), f.clone(), g.clone(), g.clone(), g.clone(), h.clone()];

        let out = animation(reducer(3).reduce(input));
        assert_eq!(out.frames, vec![f, g, h]);
        assert_eq!(out.indexed.len(), 3);
    }

    #[test]
    fn too_few_distinct_frames_falls_back_to_sampling() {
        let input = vec![frame(0); 4].into_iter().chain(vec![frame(1); 4]).collect();

        let out = animation(reducer(5).reduce(input));
        // 8 frames, stride max(1, 8 / 20) = 1
        assert_eq!(out.frames.len(), 8);
    }

    #[test]
    fn blank_prefix_is_trimmed() {
        let blank = Canvas::new(8, 4, BG);
        let f = frame(3);

        let out = animation(reducer(1).reduce(vec![blank.clone(), blank, f.clone()]));
        assert_eq!(out.frames, vec![f]);
    }

    #[test]
    fn nothing_visible_is_empty() {
        assert_eq!(reducer(1).reduce(Vec::new()), Reduced::Empty);
        let blank = Canvas::new(8, 4, BG);
        assert_eq!(reducer(1).reduce(vec![blank.clone(), blank]), Reduced::Empty);
    }

    #[test]
    fn frames_are_normalized_to_max_width_and_median_height() {
        let sizes = [(10, 5), (20, 9), (15, 7)];
        let input = sizes
            .iter()
            .enumerate()
            .map(|(i, &(w, h))| {
                let mut c = Canvas::new(w, h, BG);
                c.fill_rect(Rect::new(i as u32, 0, 1, 1), Rgb::new(255, 255, 255));
                c
            })
            .collect();

        let out = animation(reducer(1).reduce(input));
        assert_eq!((out.width, out.height), (20, 7));
        assert!(out
            .frames
            .iter()
            .all(|f| f.width() == 20 && f.height() == 7));
    }

    #[test]
    fn median_height_is_capped_and_fixed_height_wins() {
        let tall = || {
            let mut c = Canvas::new(4, 500, BG);
            c.fill_rect(Rect::new(0, 0, 1, 1), Rgb::new(255, 255, 255));
            c
        };

        let out = animation(reducer(1).reduce(vec![tall()]));
        assert_eq!(out.height, 300);

        let fixed = FrameReducer::new(ReduceConfig {
            fixed_height: Some(40),
            ..ReduceConfig::default()
        });
        assert_eq!(animation(fixed.reduce(vec![tall()])).height, 40);
    }

    #[test]
    fn frame_count_is_capped() {
        let input: Vec<Canvas> = (0..450).map(frame).collect();
        let config = ReduceConfig {
            max_frames: 200,
            ..ReduceConfig::default()
        };

        let out = animation(FrameReducer::new(config).reduce(input));
        // stride ceil(450 / 200) = 3
        assert_eq!(out.frames.len(), 150);
    }

    #[test]
    fn palette_contains_background() {
        let out = animation(reducer(1).reduce(vec![frame(0)]));
        assert!(out.palette.colors().contains(&BG));
        assert!(out.indexed[0]
            .pixels
            .iter()
            .all(|&i| (i as usize) < out.palette.len()));
    }
}
