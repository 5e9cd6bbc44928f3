//! Styled text model produced by the emulator

use crate::color::{basic_color, resolve_indexed, resolve_truecolor, Rgb, ANSI_PALETTE};
use crate::TerminalError;

/// Foreground used after a reset
pub const DEFAULT_FOREGROUND: Rgb = Rgb::new(229, 229, 229);

/// Background used after a reset, also the canvas fill
pub const DEFAULT_BACKGROUND: Rgb = Rgb::new(30, 30, 46);

/// Channel multiplier applied to the foreground of dim text
pub const DIM_FACTOR: f32 = 0.6;

/// Text attributes in effect for a run of characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StyleAttributes {
    pub foreground: Rgb,
    pub background: Rgb,
    pub bold: bool,
    pub dim: bool,
    pub italic: bool,
    pub underline: bool,
}

impl Default for StyleAttributes {
    fn default() -> Self {
        Self {
            foreground: DEFAULT_FOREGROUND,
            background: DEFAULT_BACKGROUND,
            bold: false,
            dim: false,
            italic: false,
            underline: false,
        }
    }
}

impl StyleAttributes {
    /// Foreground as it should be painted, with dimming applied once
    pub fn effective_foreground(&self) -> Rgb {
        if self.dim {
            self.foreground.scaled(DIM_FACTOR)
        } else {
            self.foreground
        }
    }

    /// Apply the parameters of one SGR sequence, left to right.
    ///
    /// Returns the resulting attributes without touching `self`, so a
    /// rejected sequence leaves the caller's state exactly as it was.
    pub fn apply_sgr(&self, params: &[Option<u32>]) -> Result<Self, TerminalError> {
        let mut next = *self;

        if params.is_empty() {
            return Ok(Self::default());
        }

        let mut i = 0;
        while i < params.len() {
            let Some(code) = params[i] else {
                i += 1;
                continue;
            };

            match code {
                0 => next = Self::default(),
                1 => next.bold = true,
                2 => next.dim = true,
                3 => next.italic = true,
                4 => next.underline = true,
                7 => std::mem::swap(&mut next.foreground, &mut next.background),
                22 => {
                    next.bold = false;
                    next.dim = false;
                }
                23 => next.italic = false,
                24 => next.underline = false,
                30..=37 | 90..=97 => {
                    if let Some(color) = basic_color(code) {
                        next.foreground = color;
                    }
                }
                39 => next.foreground = DEFAULT_FOREGROUND,
                40..=47 => {
                    if let Some(color) = basic_color(code - 10) {
                        next.background = color;
                    }
                }
                49 => next.background = DEFAULT_BACKGROUND,
                100..=107 => next.background = ANSI_PALETTE[(code - 100 + 8) as usize],
                38 | 48 => {
                    let (color, consumed) = extended_color(code, &params[i + 1..])?;
                    if code == 38 {
                        next.foreground = color;
                    } else {
                        next.background = color;
                    }
                    i += consumed;
                }
                _ => {}
            }
            i += 1;
        }

        Ok(next)
    }
}

/// Decode the `5;<idx>` or `2;<r>;<g>;<b>` tail of a 38/48 parameter.
///
/// Returns the color and how many parameters after the code were consumed.
fn extended_color(code: u32, rest: &[Option<u32>]) -> Result<(Rgb, usize), TerminalError> {
    let missing = || TerminalError::MissingColorParameters(code);
    let arg = |n: usize| rest.get(n).copied().flatten().ok_or_else(missing);

    match rest.first().copied().flatten() {
        Some(5) => Ok((resolve_indexed(arg(1)?)?, 2)),
        Some(2) => Ok((resolve_truecolor(arg(1)?, arg(2)?, arg(3)?)?, 4)),
        _ => Err(missing()),
    }
}

/// A maximal run of characters sharing one style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub style: StyleAttributes,
}

impl Segment {
    pub fn new(text: impl Into<String>, style: StyleAttributes) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// One finalized terminal row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    pub segments: Vec<Segment>,
}

impl Line {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Concatenated text of every segment, styles dropped
    pub fn plain_text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn char_count(&self) -> usize {
        self.segments.iter().map(Segment::char_count).sum()
    }

    /// True when the line holds nothing but whitespace
    pub fn is_blank(&self) -> bool {
        self.segments
            .iter()
            .all(|s| s.text.chars().all(char::is_whitespace))
    }
}
